//! Transform a single image file and save the result, as the
//! `deghiblify_image` binary does.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::cli::OpenAiOptions;
use crate::error::DeghiblifyError;
use crate::imaging::{DownloadedImage, download_image, is_supported_extension};
use crate::naming::output_filename;
use crate::pipeline::GeneratedImageReference;

/// Where a one-shot transform ended up.
#[derive(Debug)]
pub struct SavedPortrait {
    /// File the portrait was written to
    pub path: PathBuf,
    /// Provider URL the portrait was downloaded from
    pub reference: GeneratedImageReference,
}

/// Fails unless `path` is an existing regular file.
pub fn check_input(path: &Path) -> Result<(), DeghiblifyError> {
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(DeghiblifyError::BadRequest(format!(
            "Not a file: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Output filename for `image` under `out_dir`.
///
/// The saved format follows the extension, so a source without a usable one
/// is written as JPEG.
pub fn output_path(image: &Path, out_dir: &Path, prefix: &str) -> PathBuf {
    let name = image
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .map(|name| {
            if is_supported_extension(&name) {
                name
            } else {
                let stem = Path::new(&name)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or(name);
                format!("{stem}.jpg")
            }
        });
    out_dir.join(output_filename(name.as_deref(), prefix))
}

/// Transforms `image`, then downloads the result into `out_dir`.
///
/// The output path is settled before either provider call is made.
pub async fn deghiblify_file(
    options: &OpenAiOptions,
    image: &Path,
    out_dir: &Path,
) -> Result<SavedPortrait, DeghiblifyError> {
    check_input(image)?;
    let (client, pipeline) = options.build_pipeline()?;
    let output = output_path(image, out_dir, &options.output_prefix);

    let reference = pipeline.transform(image).await?;
    let path = match download_image(client.http_client(), reference.url(), Some(&output)).await? {
        DownloadedImage::Saved(path) => path,
        DownloadedImage::InMemory(_) => output,
    };
    info!("Saved {}", path.display());
    Ok(SavedPortrait { path, reference })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_keeps_supported_extension() {
        let path = output_path(Path::new("art/kiki.PNG"), Path::new("out"), "deghiblified");
        let name = path.file_name().expect("name").to_string_lossy().into_owned();
        assert!(path.starts_with("out"));
        assert!(name.starts_with("deghiblified_kiki_"));
        assert!(name.ends_with(".PNG"));
    }

    #[test]
    fn output_path_falls_back_to_jpeg() {
        for source in ["./totoro", "notes.txt", "archive.tar.gz"] {
            let path = output_path(Path::new(source), Path::new("out"), "deghiblified");
            let name = path.file_name().expect("name").to_string_lossy().into_owned();
            assert!(name.ends_with(".jpg"), "{source} -> {name}");
            assert!(image::ImageFormat::from_path(&path).is_ok());
        }
        let name = output_path(Path::new("./totoro"), Path::new("out"), "deghiblified");
        assert!(
            name.to_string_lossy().contains("deghiblified_totoro_"),
            "{}",
            name.display()
        );
    }

    #[test]
    fn check_input_rejects_directories_and_missing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            check_input(dir.path()),
            Err(DeghiblifyError::BadRequest(_))
        ));
        assert!(matches!(
            check_input(&dir.path().join("missing.png")),
            Err(DeghiblifyError::Io(_))
        ));
    }
}
