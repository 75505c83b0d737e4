//! # stratus-test
//!
//! Integration tests for Stratus.
//!
//! This crate contains:
//! - Local table fixtures written into temporary directories
//! - Store wrappers that record or fail requests
//! - End-to-end migration, delete and fetch tests (under `tests/`)

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Local table fixtures
pub mod fixtures;

/// Instrumented object stores
pub mod stores;

pub use fixtures::{LocalFixture, TableBuilder};
pub use stores::{FaultOp, FaultyStore, RecordingStore, StoreOp};
