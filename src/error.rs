use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::assistant::types::RunStatus;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Assistant API error: {0}")]
    Assistant(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Run {run_id} ended with status {status}: {message}")]
    TerminalRun {
        run_id: String,
        status: RunStatus,
        message: String,
    },

    #[error("Run {run_id} exceeded the {timeout_secs}s poll budget")]
    RunTimeout { run_id: String, timeout_secs: u64 },

    #[error("Run {run_id} ended in unexpected state {status}")]
    UnexpectedRunState { run_id: String, status: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Classify a reqwest failure: transport-level problems (unreachable
    /// host, timeouts) are service-unavailable conditions; everything else
    /// is a remote-protocol failure attributed via `protocol`.
    pub fn from_reqwest(e: reqwest::Error, protocol: fn(String) -> Error) -> Error {
        if e.is_connect() || e.is_timeout() {
            Error::Connection(e.to_string())
        } else {
            protocol(e.to_string())
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            Error::Json(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::Toml(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::Config(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::Connection(_) => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            Error::Assistant(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            Error::Store(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            Error::TerminalRun { .. } => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            Error::RunTimeout { .. } => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            Error::UnexpectedRunState { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
