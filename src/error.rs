//! Error handling

use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::{error, info};

use crate::classify::ErrorCategory;

/// Errors raised by the pipeline and its helpers.
///
/// Nothing here is retried or swallowed; every failure carries the original
/// message so the caller can classify it for display.
#[derive(Debug)]
pub enum DeghiblifyError {
    /// No credential was supplied and `OPENAI_API_KEY` was not set
    MissingApiKey,
    /// The HTTP request could not be sent or its body could not be read
    Transport(reqwest::Error),
    /// The provider answered with a non-success status
    Api {
        /// HTTP status returned by the provider
        status: u16,
        /// Provider error text, verbatim
        message: String,
    },
    /// The provider answered successfully but without usable content
    EmptyResponse(&'static str),
    /// The provider body could not be parsed
    InvalidResponse(String),
    /// Image bytes could not be decoded or encoded
    Image(image::ImageError),
    /// Base64 text could not be decoded
    Base64(base64::DecodeError),
    /// Local filesystem failure
    Io(std::io::Error),
    /// A URL could not be parsed
    InvalidUrl(url::ParseError),
    /// Invalid configuration input
    Config(String),
    /// The caller sent something unusable
    BadRequest(String),
}

impl std::fmt::Display for DeghiblifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingApiKey => write!(
                f,
                "No API key provided and OPENAI_API_KEY environment variable not set"
            ),
            Self::Transport(err) => write!(f, "Request failed: {err}"),
            Self::Api { status, message } => write!(f, "OpenAI API error {status}: {message}"),
            Self::EmptyResponse(what) => write!(f, "OpenAI response contained no {what}"),
            Self::InvalidResponse(message) => write!(f, "Unreadable OpenAI response: {message}"),
            Self::Image(err) => write!(f, "Image error: {err}"),
            Self::Base64(err) => write!(f, "Invalid base64 image data: {err}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::InvalidUrl(err) => write!(f, "Invalid URL: {err}"),
            Self::Config(message) => write!(f, "Configuration error: {message}"),
            Self::BadRequest(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for DeghiblifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::Image(err) => Some(err),
            Self::Base64(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::InvalidUrl(err) => Some(err),
            _ => None,
        }
    }
}

impl DeghiblifyError {
    /// True for failures reported by, or on the way to, a remote provider.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::Api { .. }
                | Self::EmptyResponse(_)
                | Self::InvalidResponse(_)
        )
    }
}

impl From<reqwest::Error> for DeghiblifyError {
    fn from(err: reqwest::Error) -> Self {
        DeghiblifyError::Transport(err)
    }
}

impl From<std::io::Error> for DeghiblifyError {
    fn from(err: std::io::Error) -> Self {
        DeghiblifyError::Io(err)
    }
}

impl From<image::ImageError> for DeghiblifyError {
    fn from(err: image::ImageError) -> Self {
        DeghiblifyError::Image(err)
    }
}

impl From<base64::DecodeError> for DeghiblifyError {
    fn from(err: base64::DecodeError) -> Self {
        DeghiblifyError::Base64(err)
    }
}

impl From<url::ParseError> for DeghiblifyError {
    fn from(err: url::ParseError) -> Self {
        DeghiblifyError::InvalidUrl(err)
    }
}

impl From<serde_json::Error> for DeghiblifyError {
    fn from(err: serde_json::Error) -> Self {
        DeghiblifyError::Config(err.to_string())
    }
}

impl IntoResponse for DeghiblifyError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            DeghiblifyError::Image(_)
            | DeghiblifyError::Base64(_)
            | DeghiblifyError::BadRequest(_) => {
                info!("Rejected upload: {}", self);
                StatusCode::BAD_REQUEST
            }
            err if err.is_upstream() => {
                error!("Upstream failure: {}", err);
                StatusCode::BAD_GATEWAY
            }
            err => {
                error!("Internal server error: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let message = ErrorCategory::classify(&self).user_message();
        crate::web::error_page(status, message)
    }
}
