use axum::{http::StatusCode, response::IntoResponse};

/// Errors raised while talking to the chat directory or the CRM.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{service} unreachable: {message}")]
    Upstream { service: String, message: String },

    #[error("{service} returned {status}: {body}")]
    UpstreamStatus {
        service: String,
        status: u16,
        body: String,
    },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn upstream(service: &str, err: impl std::fmt::Display) -> Self {
        Self::Upstream {
            service: service.to_string(),
            message: err.to_string(),
        }
    }
}

/// Endpoint-boundary error. Every failure kind collapses to a bare 500.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!(error = %self.0, "request failed");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}
