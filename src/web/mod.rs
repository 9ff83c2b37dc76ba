//! Browser front end: upload an image, get the transformed portrait back.

use std::num::NonZeroU16;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::response::{Html, Response};

use crate::constants::MAX_UPLOAD_BYTES;
use crate::imaging::OutputSize;
use crate::openai::OpenAiClient;
use crate::pipeline::Pipeline;

mod prelude;
mod views;

use prelude::*;
use views::{ErrorTemplate, index_handler, styles_handler, transform_handler};

/// Application context, built once per process and cloned into handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pipeline: Arc<Pipeline<OpenAiClient, OpenAiClient>>,
    http: reqwest::Client,
    output_size: Option<OutputSize>,
    output_prefix: String,
}

impl AppState {
    /// Bundles the pipeline with the display settings.
    pub fn new(
        client: &OpenAiClient,
        pipeline: Pipeline<OpenAiClient, OpenAiClient>,
        output_size: Option<OutputSize>,
        output_prefix: &str,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            http: client.http_client().clone(),
            output_size,
            output_prefix: output_prefix.to_string(),
        }
    }
}

/// Renders the error page with a given status.
pub(crate) fn error_page(status: StatusCode, message: String) -> Response {
    match (ErrorTemplate { message }).render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(err) => {
            error!("Failed to render error page: {}", err);
            status.into_response()
        }
    }
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::get(index_handler))
        .route("/static/styles.css", axum::routing::get(styles_handler))
        .route("/transform", axum::routing::post(transform_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Serves the front end until the listener fails.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    state: AppState,
) -> Result<(), anyhow::Error> {
    let app = create_router().with_state(state);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {}", err);
    }
    Ok(())
}
