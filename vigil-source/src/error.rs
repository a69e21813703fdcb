//! Error types for vigil-source.

use thiserror::Error;

/// Provider-side failures, classified by how the poll loop should react.
///
/// `Transient` is retryable on the next tick; `NotFound` and `Unauthorized`
/// are fatal for the current cycle (logged, polling continues). Every variant
/// carries the response diagnostic body so the operator can reconstruct what
/// the remote actually said.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("remote reference not found: {0}")]
    NotFound(String),

    #[error("unauthorized against remote provider: {0}")]
    Unauthorized(String),

    #[error("transient provider failure: {0}")]
    Transient(String),
}

impl FetchError {
    /// Classify a non-2xx HTTP response.
    pub fn from_status(status: u16, body: String) -> Self {
        let diagnostic = format!("HTTP {status}: {body}");
        match status {
            404 => FetchError::NotFound(diagnostic),
            401 | 403 => FetchError::Unauthorized(diagnostic),
            _ => FetchError::Transient(diagnostic),
        }
    }

    /// `true` for failures that will not heal by re-polling the same way.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::NotFound(_) | FetchError::Unauthorized(_))
    }
}
