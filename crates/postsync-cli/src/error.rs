use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] postsync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Post ID cannot be empty")]
    EmptyPostId,
    #[error("Invalid post ID: {0}")]
    InvalidPostId(String),
    #[error("Post {0} is not in the loaded feed")]
    PostNotFound(String),
    #[error("Configuration error: {0}")]
    Config(String),
}
