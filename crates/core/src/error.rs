//! Unified error types for the offline engine.

use tokio_rusqlite::rusqlite;

/// Unified error type for the offline-support engine.
///
/// Store errors are never retried; they propagate to whoever triggered the
/// operation. Network errors are recovered per retrieval strategy and only
/// surface when no fallback exists.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying persistent-storage failure.
    #[error("store error: {0}")]
    Store(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("store migration failed: {0}")]
    MigrationFailed(String),

    /// Attempt to persist a response with a non-success status.
    #[error("status {0} is not cacheable")]
    NotCacheable(u16),

    /// URL that cannot be normalized or intercepted.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Fetch failed at the transport level (offline, DNS, client timeout).
    /// HTTP error statuses are responses, not this.
    #[error("network error: {0}")]
    Network(String),

    /// Install-time pre-cache failure, naming the offending asset.
    #[error("install failed: {0}")]
    InstallFailed(String),

    /// Lifecycle event received out of phase order.
    #[error("lifecycle error: {0}")]
    Lifecycle(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Store(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Store(tokio_rusqlite::Error::Close(c)),
            _ => Error::Store(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Store(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotCacheable(404);
        assert!(err.to_string().contains("404"));

        let err = Error::InstallFailed("/offline.html: network error".to_string());
        assert!(err.to_string().contains("install failed"));
        assert!(err.to_string().contains("/offline.html"));
    }

    #[test]
    fn test_rusqlite_error_wraps_as_store() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Store(_)));
    }
}
