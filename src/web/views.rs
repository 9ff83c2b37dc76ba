use super::prelude::*;
use crate::constants::SUPPORTED_EXTENSIONS;
use crate::imaging::{
    SourceImage, encode_png, fetch_result_image, is_supported_extension, resize_image,
};
use crate::naming::output_filename;
use axum::extract::Multipart;
use base64::Engine;
use base64::engine::general_purpose;
use tracing::instrument;

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub(crate) struct IndexTemplate {
    pub(crate) accept: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "result.html")]
pub(crate) struct ResultTemplate {
    pub(crate) original_src: String,
    pub(crate) result_src: String,
    pub(crate) result_url: String,
    pub(crate) download_name: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub(crate) struct ErrorTemplate {
    pub(crate) message: String,
}

/// An upload pulled out of the multipart body.
struct Upload {
    filename: Option<String>,
    bytes: Vec<u8>,
}

fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        general_purpose::STANDARD.encode(bytes)
    )
}

/// handles the / GET
pub(crate) async fn index_handler() -> IndexTemplate {
    let accept = SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",");
    IndexTemplate { accept }
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, DeghiblifyError> {
    let mut upload: Option<Upload> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| DeghiblifyError::BadRequest(err.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.is_empty());
        let bytes = field
            .bytes()
            .await
            .map_err(|err| DeghiblifyError::BadRequest(err.body_text()))?;
        upload = Some(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    let upload = upload
        .filter(|upload| !upload.bytes.is_empty())
        .ok_or_else(|| DeghiblifyError::BadRequest("Please choose an image to upload.".to_string()))?;
    if let Some(name) = upload.filename.as_deref()
        && !is_supported_extension(name)
    {
        return Err(DeghiblifyError::BadRequest(format!(
            "Unsupported file type: {name}. Upload one of {}.",
            SUPPORTED_EXTENSIONS.join(", ")
        )));
    }
    Ok(upload)
}

/// handles the /transform POST
#[instrument(skip_all)]
pub(crate) async fn transform_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<ResultTemplate, DeghiblifyError> {
    let upload = read_upload(&mut multipart).await?;
    let source = SourceImage::from_bytes(upload.bytes)?;
    info!(
        "Received {:?} upload ({} bytes)",
        source.format(),
        source.bytes().len()
    );

    // removed when dropped, including on every early return below
    let suffix = format!(".{}", source.format().extensions_str().first().unwrap_or(&"img"));
    let temp = tempfile::Builder::new()
        .prefix("deghiblify-")
        .suffix(&suffix)
        .tempfile()?;
    tokio::fs::write(temp.path(), source.bytes()).await?;

    let reference = state.pipeline.transform(temp.path()).await?;
    let result = fetch_result_image(&state.http, reference.url()).await?;

    let mut image = result.to_image()?;
    if let Some(size) = state.output_size {
        debug!("Resizing result to {}", size);
        image = resize_image(&image, size);
    }
    let png = encode_png(&image)?;

    Ok(ResultTemplate {
        original_src: data_url(source.mime_type(), source.bytes()),
        result_src: data_url("image/png", &png),
        result_url: reference.to_string(),
        download_name: output_filename(upload.filename.as_deref(), &state.output_prefix),
    })
}

pub(crate) async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}
