use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Handler-level failure. Each variant maps to one HTTP status and carries the message sent
/// back to the caller, so nothing from the remote API or database leaks through.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    ClientInput(String),
    #[error("{0}")]
    Upstream(&'static str),
    #[error("{0}")]
    Store(&'static str),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ClientInput(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Failure talking to the helpdesk API.
#[derive(Debug, Error)]
pub enum ZendeskError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("helpdesk returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("helpdesk response carried no ticket")]
    EmptyResponse,
    #[error("failed to decode helpdesk response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub fn handle_error(e: &impl std::error::Error) {
    error!("ERROR: {e}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_input_is_a_bad_request() {
        let e = AppError::ClientInput("Missing required field: call_id".into());
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.to_string(), "Missing required field: call_id");
    }

    #[test]
    fn upstream_and_store_are_server_errors() {
        assert_eq!(
            AppError::Upstream("Failed to create Zendesk ticket").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Store("Failed to check call processing state").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
