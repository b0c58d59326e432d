use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Upstream provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Route {id} already exists for {user}")]
    DuplicateRoute { user: String, id: i64 },

    #[error("Too many requests")]
    RateLimited,

    #[error("Internal server error: {0}")]
    Internal(String),
}

// Convert AppError into the `{success: false, error}` envelope
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal database error".to_string(),
                )
            }
            AppError::Provider(ref e) => {
                tracing::error!("Upstream provider error: {}", e);
                (StatusCode::BAD_GATEWAY, "Upstream service error".to_string())
            }
            AppError::Cache(ref e) => {
                tracing::warn!("Cache error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Cache error".to_string())
            }
            AppError::InvalidRequest(ref e) => (StatusCode::BAD_REQUEST, e.clone()),
            AppError::NotFound(ref e) => (StatusCode::NOT_FOUND, e.clone()),
            AppError::DuplicateRoute { ref user, id } => {
                tracing::error!("Duplicate saved route {} for {}", id, user);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to save route".to_string(),
                )
            }
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, please try again later".to_string(),
            ),
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failure of an external collaborator (text generator, router, geocoder,
/// places lookup). Callers pick their fallback from [`ProviderError::kind`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("empty response")]
    EmptyResponse,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("provider not configured: {0}")]
    NotConfigured(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Network,
    Timeout,
    Status,
    EmptyResponse,
    Malformed,
    NotConfigured,
}

impl ProviderError {
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            ProviderError::Network(_) => ProviderErrorKind::Network,
            ProviderError::Timeout => ProviderErrorKind::Timeout,
            ProviderError::Status { .. } => ProviderErrorKind::Status,
            ProviderError::EmptyResponse => ProviderErrorKind::EmptyResponse,
            ProviderError::Malformed(_) => ProviderErrorKind::Malformed,
            ProviderError::NotConfigured(_) => ProviderErrorKind::NotConfigured,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// Read a non-success response into a `Status` error, logging it first.
pub(crate) async fn status_error(provider: &str, response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    tracing::warn!(
        status = %status,
        provider,
        "{} HTTP error {}: {}",
        provider, status, body
    );
    ProviderError::Status {
        status: status.as_u16(),
        body,
    }
}
