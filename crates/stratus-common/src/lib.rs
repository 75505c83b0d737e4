//! # stratus-common
//!
//! Common types, errors, and utilities for Stratus.
//!
//! This crate provides the foundational types shared by the object-store
//! bridge, the store adapters and the command line tool:
//!
//! - **Types**: `TableId`, `FileKind`, `BlockNumber`, `PageNumber`, compression algorithms
//! - **Errors**: Unified error handling with `StratusError` and `ErrorKind`
//! - **Config**: Bridge and store backend configuration
//! - **Constants**: Object naming, envelope and header layout constants
//!
//! ## Example
//!
//! ```rust
//! use stratus_common::types::{BlockNumber, FileKind, TableId};
//! use stratus_common::error::StratusResult;
//!
//! fn example() -> StratusResult<()> {
//!     let table = TableId::new("shop", "orders")?;
//!     let block = BlockNumber::FIRST;
//!     assert_eq!(FileKind::Index.as_str(), "index");
//!     assert_eq!(block.as_u64(), 1);
//!     assert_eq!(table.to_string(), "shop.orders");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use error::{ErrorKind, StratusError, StratusResult};
pub use types::{BlockNumber, CompressionAlgorithm, FileKind, MigrationStep, PageNumber, TableId};
