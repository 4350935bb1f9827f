use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::agent_modules::metrics::SamplingError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Sampling failed: {0}")]
    SamplingUnavailable(#[from] SamplingError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::SamplingUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
