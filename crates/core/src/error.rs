//! Unified error types for shellcache.

use tokio_rusqlite::rusqlite;

/// Unified error type shared across the workspace.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A logical resource key failed validation.
    #[error("invalid resource key: {0}")]
    InvalidKey(String),

    /// A content-hash version token failed validation.
    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    /// A deploy manifest could not be read or parsed.
    #[error("deploy manifest: {0}")]
    Manifest(String),

    /// An invalid URL was produced or supplied.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Network failure or non-success HTTP status.
    #[error("fetch failed: {0}")]
    Http(String),

    /// Response body exceeded the configured size cap.
    #[error("response too large: {0}")]
    FetchTooLarge(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidKey("/absolute".to_string());
        assert!(err.to_string().contains("invalid resource key"));
        assert!(err.to_string().contains("/absolute"));
    }

    #[test]
    fn test_rusqlite_error_conversion() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Database(_)));
    }
}
