//! Error types for postsync-core

use std::time::Duration;

use thiserror::Error;

use crate::models::PostId;

/// Result type alias using postsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in postsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Remote page fetch failed before a payload was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// Remote page payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Local store read or write failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Remote fetch did not complete in time
    #[error("Remote fetch timed out after {0:?}")]
    Timeout(Duration),

    /// A like toggle found no stored row to update
    #[error("Post {0} has no stored row; like kept in memory only")]
    NotPersisted(PostId),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or remote fetch failure (includes timeouts)
    Transport,
    /// Malformed page payload
    Decode,
    /// Local read/write failure
    Persistence,
    /// Bad configuration or input
    Config,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::Timeout(_) => ErrorKind::Transport,
            Self::Http(error) if error.is_decode() => ErrorKind::Decode,
            Self::Http(_) => ErrorKind::Transport,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Persistence(_)
            | Self::NotPersisted(_)
            | Self::LibSql(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorKind::Persistence,
            Self::InvalidConfig(_) => ErrorKind::Config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            Error::Transport("connection reset".into()).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            Error::Timeout(Duration::from_secs(1)).kind(),
            ErrorKind::Transport
        );
        assert_eq!(Error::Decode("bad json".into()).kind(), ErrorKind::Decode);
        assert_eq!(
            Error::NotPersisted(PostId::new(3)).kind(),
            ErrorKind::Persistence
        );
        assert_eq!(
            Error::InvalidConfig("page_size".into()).kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::NotPersisted(PostId::new(42));
        assert!(err.to_string().contains("42"));
    }
}
