//! Error types for peoplehub.

use thiserror::Error;

/// Result type alias using peoplehub's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for peoplehub operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Remote call failed in transport or returned a non-success status
    #[error("Remote fetch failed ({endpoint}): {message}")]
    RemoteFetch { endpoint: String, message: String },

    /// Remote call succeeded but the body did not have the expected shape
    #[error("Malformed response ({endpoint}): {message}")]
    MalformedResponse { endpoint: String, message: String },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a [`Error::RemoteFetch`] for the given endpoint.
    pub fn remote(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::RemoteFetch {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Build a [`Error::MalformedResponse`] for the given endpoint.
    pub fn malformed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MalformedResponse {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// True for errors raised by a remote endpoint (fetch or shape).
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::RemoteFetch { .. } | Error::MalformedResponse { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let endpoint = e
            .url()
            .map(|u| u.path().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Error::RemoteFetch {
            endpoint,
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_remote_fetch() {
        let err = Error::remote("/_api/Web/roleassignments", "503 Service Unavailable");
        assert_eq!(
            err.to_string(),
            "Remote fetch failed (/_api/Web/roleassignments): 503 Service Unavailable"
        );
    }

    #[test]
    fn test_error_display_malformed() {
        let err = Error::malformed("/_api/search/query", "missing Table");
        assert_eq!(
            err.to_string(),
            "Malformed response (/_api/search/query): missing Table"
        );
    }

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("source people-1".to_string());
        assert_eq!(err.to_string(), "Not found: source people-1");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing site url".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing site url");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("empty group id".to_string());
        assert_eq!(err.to_string(), "Invalid input: empty group id");
    }

    #[test]
    fn test_is_remote() {
        assert!(Error::remote("a", "b").is_remote());
        assert!(Error::malformed("a", "b").is_remote());
        assert!(!Error::Internal("x".to_string()).is_remote());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => {
                assert!(!msg.is_empty());
            }
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_error_debug_format() {
        let err = Error::NotFound("test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("NotFound"));
    }
}
