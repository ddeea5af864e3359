//! Error types for the document index client

use thiserror::Error;

/// Errors returned by a [`DocumentStore`](crate::DocumentStore)
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached (connection refused, timeout)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// HTTP transport error
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with a non-success status
    #[error("Store returned {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Scroll cursor unknown or expired
    #[error("Unknown scroll: {0}")]
    UnknownScroll(String),

    /// Index does not exist
    #[error("Index not found: {0}")]
    IndexNotFound(String),
}

impl StoreError {
    /// Classify a reqwest error: unreachable stores become `Unavailable`
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Transport(err)
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
