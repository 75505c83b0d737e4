//! Bridge error types.
//!
//! Every operation exposed to the surrounding engine returns a
//! [`StratusError`] on failure. Callers branch on [`StratusError::kind`];
//! the variants themselves carry the object name, path or step needed for
//! manual cleanup after a failed migration.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{MigrationStep, TableId};

/// Error kinds for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorKind {
    /// Object or table absent.
    NotFound = 0x0100,
    /// Destination occupied and `force` not given.
    AlreadyExists = 0x0101,
    /// Local table is not eligible for migration.
    UnsupportedFormat = 0x0200,
    /// Invalid envelope, misaligned raw block, short descriptor.
    Corrupt = 0x0201,
    /// Store communication failure (auth, network, server).
    Transport = 0x0300,
    /// Local file read or write failure.
    LocalIo = 0x0301,
    /// Rejected parameter or configuration.
    InvalidArgument = 0x0400,
}

impl ErrorKind {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x01 => "Existence",
            0x02 => "Format",
            0x03 => "I/O",
            0x04 => "Usage",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            Self::Corrupt => "CORRUPT",
            Self::Transport => "TRANSPORT",
            Self::LocalIo => "LOCAL_IO",
            Self::InvalidArgument => "INVALID_ARGUMENT",
        };
        f.write_str(name)
    }
}

/// The main error type for Stratus.
///
/// # Example
///
/// ```rust
/// use stratus_common::error::{ErrorKind, StratusError, StratusResult};
///
/// fn lookup(bucket: &str, object: &str) -> StratusResult<Vec<u8>> {
///     Err(StratusError::object_not_found(bucket, object))
/// }
///
/// let err = lookup("tables", "shop/orders/aria").unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::NotFound);
/// ```
#[derive(Debug, Error)]
pub enum StratusError {
    // ==========================================================================
    // Existence Errors
    // ==========================================================================
    /// A named object does not exist.
    #[error("object '{object}' not found in bucket '{bucket}'")]
    ObjectNotFound {
        /// Bucket that was searched.
        bucket: String,
        /// Missing object name.
        object: String,
    },

    /// The table has no footprint in the store.
    #[error("table {table} doesn't exist in bucket '{bucket}'")]
    TableNotFound {
        /// Bucket that was searched.
        bucket: String,
        /// The missing table.
        table: TableId,
    },

    /// A store object is in the way.
    #[error("object '{object}' already exists in bucket '{bucket}'")]
    ObjectExists {
        /// Bucket holding the object.
        bucket: String,
        /// Existing object name.
        object: String,
    },

    /// A local file is in the way.
    #[error("local file {} already exists", path.display())]
    LocalFileExists {
        /// Existing file.
        path: PathBuf,
    },

    // ==========================================================================
    // Format Errors
    // ==========================================================================
    /// The local table cannot be stored in the object store.
    #[error("unsupported table format: {reason}")]
    UnsupportedFormat {
        /// Why the table was rejected.
        reason: String,
    },

    /// Data corruption detected.
    #[error("data corruption detected: {message}")]
    Corruption {
        /// Description of the corruption.
        message: String,
    },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// The object store could not be reached or rejected the request.
    #[error("store error on '{object}': {message}")]
    Transport {
        /// Object (or prefix) being accessed.
        object: String,
        /// Error reported by the store client.
        message: String,
    },

    /// A local file operation failed.
    #[error("local I/O error on {}: {source}", path.display())]
    LocalIo {
        /// File being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    // ==========================================================================
    // Usage Errors
    // ==========================================================================
    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Error message.
        message: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },

    // ==========================================================================
    // Orchestration Errors
    // ==========================================================================
    /// A migration step failed; earlier steps were not undone.
    #[error("{step} failed: {source}")]
    Step {
        /// The failing step.
        step: MigrationStep,
        /// What went wrong.
        #[source]
        source: Box<StratusError>,
    },

    /// A delete finished with objects left behind.
    #[error("delete of {table} left {failures} failure(s), first: {first}")]
    IncompleteDelete {
        /// Table being deleted.
        table: TableId,
        /// Number of non-tolerated failures.
        failures: usize,
        /// The first failure observed.
        #[source]
        first: Box<StratusError>,
    },
}

impl StratusError {
    /// Returns the kind of this error.
    ///
    /// Wrapping variants report the kind of the error they wrap.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ObjectNotFound { .. } | Self::TableNotFound { .. } => ErrorKind::NotFound,
            Self::ObjectExists { .. } | Self::LocalFileExists { .. } => ErrorKind::AlreadyExists,
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::Corruption { .. } => ErrorKind::Corrupt,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::LocalIo { .. } => ErrorKind::LocalIo,
            Self::InvalidArgument { .. } | Self::InvalidConfig { .. } => {
                ErrorKind::InvalidArgument
            }
            Self::Step { source, .. } => source.kind(),
            Self::IncompleteDelete { first, .. } => first.kind(),
        }
    }

    /// Returns true if this error means the object or table is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns the failing migration step, if any.
    #[must_use]
    pub fn step(&self) -> Option<MigrationStep> {
        match self {
            Self::Step { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Wraps this error with the migration step it happened in.
    #[must_use]
    pub fn in_step(self, step: MigrationStep) -> Self {
        Self::Step {
            step,
            source: Box::new(self),
        }
    }

    /// Creates an object-not-found error.
    #[must_use]
    pub fn object_not_found(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self::ObjectNotFound {
            bucket: bucket.into(),
            object: object.into(),
        }
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(object: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            object: object.into(),
            message: message.into(),
        }
    }

    /// Creates a local I/O error for `path`.
    #[must_use]
    pub fn local_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }

    /// Creates an unsupported format error.
    #[must_use]
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            reason: reason.into(),
        }
    }

    /// Creates a corruption error.
    #[must_use]
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        let err = StratusError::object_not_found("b", "db/t/aria");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.kind().category(), "Existence");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = StratusError::object_not_found("tables", "db/t/index/000001");
        assert_eq!(
            err.to_string(),
            "object 'db/t/index/000001' not found in bucket 'tables'"
        );
        assert_eq!(ErrorKind::UnsupportedFormat.to_string(), "UNSUPPORTED_FORMAT");
    }

    #[test]
    fn test_step_keeps_kind() {
        let err = StratusError::corruption("bad flag").in_step(MigrationStep::FetchIndex);
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert_eq!(err.step(), Some(MigrationStep::FetchIndex));
        assert!(err.to_string().starts_with("fetch index blocks failed"));
    }

    #[test]
    fn test_incomplete_delete_kind() {
        let err = StratusError::IncompleteDelete {
            table: TableId::new("db", "t").unwrap(),
            failures: 2,
            first: Box::new(StratusError::transport("db/t/data/000001", "timeout")),
        };
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_local_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = StratusError::local_io("/tmp/t.MAI", io_err);
        assert_eq!(err.kind(), ErrorKind::LocalIo);
        assert!(err.to_string().contains("/tmp/t.MAI"));
    }
}
