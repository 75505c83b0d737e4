//! Core types for Stratus.

mod ids;
mod table;

pub use ids::{BlockNumber, PageNumber};
pub use table::{CompressionAlgorithm, FileKind, MigrationStep, TableId};
