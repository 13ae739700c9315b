use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Upstream returned {status} for {url}")]
    Upstream { status: u16, url: String },

    #[error("Malformed upstream response: {0}")]
    Malformed(String),

    #[error("All {0} enrichment batches failed")]
    AllBatchesFailed(usize),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Map a reqwest failure, splitting timeouts out so they read as such in diagnostics.
    pub fn from_request(e: reqwest::Error, url: &str) -> Self {
        if e.is_timeout() {
            AppError::Timeout(url.to_string())
        } else {
            AppError::Http(e)
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::Config(_) => StatusCode::BAD_REQUEST,
            AppError::Timeout(_) | AppError::Upstream { .. } | AppError::AllBatchesFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
