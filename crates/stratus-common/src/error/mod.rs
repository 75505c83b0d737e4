//! Error handling for Stratus.
//!
//! This module provides a unified error type and result alias used
//! across all Stratus components.

mod stratus;

pub use stratus::{ErrorKind, StratusError};

/// Result type alias for Stratus operations.
pub type StratusResult<T> = std::result::Result<T, StratusError>;
