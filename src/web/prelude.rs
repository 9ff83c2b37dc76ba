pub(crate) use crate::error::DeghiblifyError;
pub(crate) use crate::web::AppState;
pub(crate) use askama::Template;
pub(crate) use askama_web::WebTemplate;
pub(crate) use axum::extract::State;
pub(crate) use axum::http::{StatusCode, header::CONTENT_TYPE};
pub(crate) use axum::response::IntoResponse;
pub(crate) use std::sync::Arc;
pub(crate) use tracing::{debug, error, info};
