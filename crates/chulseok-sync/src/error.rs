use chulseok_core::{FetchError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(String),
}

impl SyncError {
    /// Rate limiting, server-side failures, timeouts and dropped connections.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(err) => err.is_timeout() || err.is_connect(),
            Self::Server { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Json(_) | Self::Url(_) => false,
        }
    }
}

impl From<SyncError> for StoreError {
    fn from(err: SyncError) -> Self {
        if err.is_transient() {
            StoreError::Transient(err.to_string())
        } else {
            StoreError::Fatal(err.to_string())
        }
    }
}

impl From<SyncError> for FetchError {
    fn from(err: SyncError) -> Self {
        FetchError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(status: u16) -> SyncError {
        SyncError::Server {
            status,
            body: String::new(),
        }
    }

    #[test]
    fn rate_limit_and_server_errors_are_transient() {
        assert!(server(429).is_transient());
        assert!(server(500).is_transient());
        assert!(server(503).is_transient());
    }

    #[test]
    fn client_errors_are_fatal() {
        assert!(!server(400).is_transient());
        assert!(!server(403).is_transient());
        assert!(!server(404).is_transient());
    }

    #[test]
    fn converts_to_store_error_by_class() {
        assert!(StoreError::from(server(503)).is_transient());
        assert!(matches!(StoreError::from(server(401)), StoreError::Fatal(_)));
    }
}
