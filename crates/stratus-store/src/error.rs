//! Store client error types.

use stratus_common::StratusError;
use thiserror::Error;

/// Result type for store client operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by an object store client.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum StoreError {
    /// The object does not exist.
    #[error("object '{name}' not found in bucket '{bucket}'")]
    NotFound { bucket: String, name: String },

    /// The request reached the client but failed (network, auth, server).
    #[error("request for '{name}' failed: {message}")]
    Transport { name: String, message: String },

    /// A connection could not be established.
    #[error("cannot open store connection: {message}")]
    Connect { message: String },
}

impl StoreError {
    /// Creates a NotFound error.
    pub fn not_found(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            bucket: bucket.into(),
            name: name.into(),
        }
    }

    /// Creates a Transport error.
    pub fn transport(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a Connect error.
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<StoreError> for StratusError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { bucket, name } => StratusError::ObjectNotFound {
                bucket,
                object: name,
            },
            StoreError::Transport { name, message } => StratusError::Transport {
                object: name,
                message,
            },
            StoreError::Connect { message } => StratusError::Transport {
                object: String::new(),
                message,
            },
        }
    }
}
