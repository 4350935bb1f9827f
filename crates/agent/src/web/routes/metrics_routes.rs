use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;
use tracing::error;

use crate::agent_modules::snapshot::to_json_payload;
use crate::web::{AppError, AppState};

pub const LOAD_AVG_PATH: &str = "/api/v1/cpu/load/avg";
pub const DISK_USAGE_PATH: &str = "/api/v1/disk/usage/stat";
pub const DISK_IO_PATH: &str = "/api/v1/disk/io/stat";

fn json_response(payload: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        payload,
    )
        .into_response()
}

async fn load_avg_handler(State(app_state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let sample = match app_state.load_sampler.sample() {
        Ok(sample) => Some(sample),
        Err(e) => {
            error!(error = %e, "Failed to sample load average.");
            if app_state.config.strict_sampling {
                return Err(e.into());
            }
            // Lenient mode answers 200 with a `null` body.
            None
        }
    };
    Ok(json_response(to_json_payload(&sample)))
}

async fn disk_usage_handler(State(app_state): State<Arc<AppState>>) -> Response {
    json_response(to_json_payload(&app_state.disk_sampler.sample()))
}

async fn disk_io_handler(State(app_state): State<Arc<AppState>>) -> Response {
    json_response(to_json_payload(&app_state.disk_io_sampler.sample()))
}

pub fn load_router() -> Router<Arc<AppState>> {
    Router::new().route(LOAD_AVG_PATH, get(load_avg_handler))
}

pub fn disk_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(DISK_USAGE_PATH, get(disk_usage_handler))
        .route(DISK_IO_PATH, get(disk_io_handler))
}
