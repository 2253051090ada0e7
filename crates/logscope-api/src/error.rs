use thiserror::Error;

/// Errors surfaced by the backend client
///
/// Transport and status errors are recoverable from a stream's point of
/// view; `InvalidRequest` means the call was rejected before any request
/// was made.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
