//! Image load/save/encode helpers and remote image download.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use tracing::{debug, instrument};
use url::Url;

use crate::constants::SUPPORTED_EXTENSIONS;
use crate::error::DeghiblifyError;

/// Raw bytes of a caller-supplied image, checked to be decodable.
#[derive(Clone, Debug)]
pub struct SourceImage {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl SourceImage {
    /// Sniffs and decodes `bytes`, failing on anything that isn't a raster image.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DeghiblifyError> {
        let format = sniff_and_check(&bytes)?;
        Ok(Self { bytes, format })
    }

    /// Reads and checks an image file.
    pub async fn read(path: &Path) -> Result<Self, DeghiblifyError> {
        let bytes = tokio::fs::read(path).await?;
        Self::from_bytes(bytes)
    }

    /// The original file bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Detected container format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// MIME type for the detected format, used in data URLs.
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Base64 of the original bytes, without re-encoding.
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// The downloaded result of the generation stage.
#[derive(Clone, Debug)]
pub struct ResultImage {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl ResultImage {
    /// Bytes exactly as served.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Detected container format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Decodes the bytes.
    pub fn to_image(&self) -> Result<DynamicImage, DeghiblifyError> {
        Ok(image::load_from_memory_with_format(
            &self.bytes,
            self.format,
        )?)
    }
}

/// A `WIDTHxHEIGHT` target size.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OutputSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl FromStr for OutputSize {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (width, height) = value
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("Expected WIDTHxHEIGHT, got {value:?}"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .ok()
                .filter(|px| *px > 0)
                .ok_or_else(|| format!("Invalid dimension {part:?} in {value:?}"))
        };
        Ok(Self {
            width: parse(width)?,
            height: parse(height)?,
        })
    }
}

impl std::fmt::Display for OutputSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Outcome of [`download_image`].
#[derive(Debug)]
pub enum DownloadedImage {
    /// Decoded image kept in memory
    InMemory(DynamicImage),
    /// Image written to this path
    Saved(PathBuf),
}

fn sniff_and_check(bytes: &[u8]) -> Result<ImageFormat, DeghiblifyError> {
    let format = image::guess_format(bytes)?;
    image::load_from_memory_with_format(bytes, format)?;
    Ok(format)
}

/// Opens a local image file, guessing its format from the content.
pub fn load_image(path: &Path) -> Result<DynamicImage, DeghiblifyError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    Ok(reader.decode()?)
}

/// Stretches an image to exactly `size`.
pub fn resize_image(image: &DynamicImage, size: OutputSize) -> DynamicImage {
    image.resize_exact(size.width, size.height, FilterType::CatmullRom)
}

/// Writes an image, creating parent directories. Existing files are overwritten.
pub fn save_image(image: &DynamicImage, path: &Path) -> Result<PathBuf, DeghiblifyError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let format = ImageFormat::from_path(path)?;
    if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(image.to_rgb8()).save_with_format(path, format)?;
    } else {
        image.save_with_format(path, format)?;
    }
    Ok(path.to_path_buf())
}

/// Fetches the image behind `url` and checks that it decodes.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch_result_image(
    client: &reqwest::Client,
    url: &Url,
) -> Result<ResultImage, DeghiblifyError> {
    let bytes = client
        .get(url.as_str())
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?
        .to_vec();
    let format = sniff_and_check(&bytes)?;
    debug!("Downloaded {} bytes of {:?}", bytes.len(), format);
    Ok(ResultImage { bytes, format })
}

/// Downloads an image; saves it when `output_path` is given, otherwise
/// returns it decoded.
pub async fn download_image(
    client: &reqwest::Client,
    url: &Url,
    output_path: Option<&Path>,
) -> Result<DownloadedImage, DeghiblifyError> {
    let image = fetch_result_image(client, url).await?.to_image()?;
    match output_path {
        Some(path) => save_image(&image, path).map(DownloadedImage::Saved),
        None => Ok(DownloadedImage::InMemory(image)),
    }
}

/// Encodes an image as base64 JPEG. Lossy, and drops any alpha channel.
pub fn image_to_base64(image: &DynamicImage) -> Result<String, DeghiblifyError> {
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)?;
    Ok(general_purpose::STANDARD.encode(buffer))
}

/// Decodes base64 text into an image, inferring the format from the bytes.
pub fn base64_to_image(encoded: &str) -> Result<DynamicImage, DeghiblifyError> {
    let bytes = general_purpose::STANDARD.decode(encoded.trim())?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Encodes an image as PNG.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, DeghiblifyError> {
    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(buffer)
}

/// True when the filename carries an extension the front end accepts.
pub fn is_supported_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7) as u8, (y * 11) as u8, 128, 200])
        });
        encode_png(&DynamicImage::ImageRgba8(img)).expect("encode png")
    }

    #[test]
    fn source_image_sniffs_format() {
        let source = SourceImage::from_bytes(sample_png(4, 3)).expect("valid png");
        assert_eq!(source.format(), ImageFormat::Png);
        assert_eq!(source.mime_type(), "image/png");
        assert!(!source.to_base64().is_empty());
    }

    #[test]
    fn source_image_rejects_garbage() {
        assert!(matches!(
            SourceImage::from_bytes(b"This is not an image.".to_vec()),
            Err(DeghiblifyError::Image(_))
        ));
        // PNG magic followed by nothing useful
        let truncated = sample_png(4, 4)[..16].to_vec();
        assert!(SourceImage::from_bytes(truncated).is_err());
    }

    #[test]
    fn base64_round_trip_goes_through_jpeg() {
        let image = image::load_from_memory(&sample_png(8, 6)).expect("decode");
        let encoded = image_to_base64(&image).expect("encode");
        let decoded = base64_to_image(&encoded).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn base64_to_image_rejects_bad_input() {
        assert!(matches!(
            base64_to_image("!!!not base64"),
            Err(DeghiblifyError::Base64(_))
        ));
        assert!(matches!(
            base64_to_image(&general_purpose::STANDARD.encode(b"plain text")),
            Err(DeghiblifyError::Image(_))
        ));
    }

    #[test]
    fn resize_stretches() {
        let image = image::load_from_memory(&sample_png(10, 4)).expect("decode");
        let resized = resize_image(
            &image,
            OutputSize {
                width: 6,
                height: 6,
            },
        );
        assert_eq!((resized.width(), resized.height()), (6, 6));
    }

    #[test]
    fn save_creates_parents_and_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("deeper").join("out.jpg");
        let image = image::load_from_memory(&sample_png(5, 5)).expect("decode");

        let saved = save_image(&image, &path).expect("save jpeg with alpha source");
        assert_eq!(saved, path);
        let small = resize_image(
            &image,
            OutputSize {
                width: 2,
                height: 3,
            },
        );
        save_image(&small, &path).expect("overwrite");

        let reloaded = load_image(&path).expect("load");
        assert_eq!((reloaded.width(), reloaded.height()), (2, 3));
    }

    #[test]
    fn load_image_fails_on_non_images() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fake.png");
        std::fs::write(&path, b"definitely not a png").expect("write");
        assert!(load_image(&path).is_err());
    }

    #[test]
    fn output_size_parsing() {
        assert_eq!(
            "1024x768".parse::<OutputSize>(),
            Ok(OutputSize {
                width: 1024,
                height: 768
            })
        );
        assert!("1024".parse::<OutputSize>().is_err());
        assert!("0x10".parse::<OutputSize>().is_err());
        assert_eq!(
            OutputSize {
                width: 3,
                height: 4
            }
            .to_string(),
            "3x4"
        );
    }

    #[test]
    fn extension_check() {
        assert!(is_supported_extension("totoro.PNG"));
        assert!(is_supported_extension("dir/a.jpeg"));
        assert!(!is_supported_extension("notes.txt"));
        assert!(!is_supported_extension("no_extension"));
    }
}
