use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::agent_modules::config::AgentConfig;
use crate::web::AppState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Not authorized")]
    MissingHeader,
    #[error("Not authorized")]
    MalformedHeader,
    #[error("{0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    #[error("Not authorized")]
    MalformedCredentials,
    #[error("Not authorized")]
    CredentialMismatch,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}

/// Checks an `Authorization` header value against the configured Basic credentials.
pub fn verify_basic_auth(header: Option<&str>, config: &AgentConfig) -> Result<(), AuthError> {
    let header = header.ok_or(AuthError::MissingHeader)?;
    let (_scheme, token) = header.split_once(' ').ok_or(AuthError::MalformedHeader)?;

    let decoded = STANDARD.decode(token)?;
    let colon = decoded
        .iter()
        .position(|b| *b == b':')
        .ok_or(AuthError::MalformedCredentials)?;
    let (username, password) = (&decoded[..colon], &decoded[colon + 1..]);

    // Both halves are compared unconditionally.
    let username_ok = constant_time_eq(username, config.username.as_bytes());
    let password_ok = constant_time_eq(password, config.password.as_bytes());
    if username_ok & password_ok {
        Ok(())
    } else {
        Err(AuthError::CredentialMismatch)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

pub async fn basic_auth(
    State(state): State<Arc<AppState>>,
    req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AuthError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if let Err(e) = verify_basic_auth(header, &state.config) {
        warn!(uri = %req.uri(), reason = ?e, "Rejected request with invalid basic auth.");
        return Err(e);
    }
    Ok(next.run(req).await)
}
