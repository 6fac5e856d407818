//! Unified error type for all observers.

use thiserror::Error;

/// Unified error type for report rendering.
///
/// Wraps the failures of every observer so callers can switch output format
/// without changing their error handling.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// The report could not be written out.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the JSON observer.
    #[cfg(feature = "json")]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for observer operations.
pub type Result<T> = std::result::Result<T, ObserverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: ObserverError = io.into();
        assert_eq!(err.to_string(), "io error: pipe closed");
    }
}
