//! Scripture library API client.
//!
//! Typed, read-only access to the remote library service: book catalog,
//! chapter index, verse queries, search, and the bulk export call the
//! offline sync is built on.

pub mod api;

/// Unified error type for the library-client crate.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Library API error (status {status}): {message}")]
    ApiError { status: u16, message: String },
}
