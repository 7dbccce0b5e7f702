use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OraculoError {
    #[error("Mensaje vacío")]
    EmptyInput,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("LLM rate limit exceeded, retry after {retry_after:?} seconds")]
    LlmRateLimit { retry_after: Option<u64> },

    #[error("Ephemeris error: {0}")]
    Ephemeris(String),

    #[error("{operation} timed out after {secs} seconds")]
    Timeout { operation: &'static str, secs: u64 },
}

impl OraculoError {
    pub fn status(&self) -> StatusCode {
        match self {
            OraculoError::EmptyInput | OraculoError::Validation(_) | OraculoError::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            OraculoError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            OraculoError::Http(_) | OraculoError::Llm(_) | OraculoError::Ephemeris(_) => {
                StatusCode::BAD_GATEWAY
            }
            OraculoError::LlmRateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
            OraculoError::LlmUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            OraculoError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            OraculoError::Database(_) | OraculoError::Io(_) | OraculoError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for OraculoError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed with internal error");
            "An internal error occurred".to_string()
        } else {
            match &self {
                OraculoError::Validation(msg) | OraculoError::Unauthenticated(msg) => msg.clone(),
                other => other.to_string(),
            }
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, OraculoError>;
