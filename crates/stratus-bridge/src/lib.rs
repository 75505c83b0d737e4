//! # stratus-bridge
//!
//! Object-store block bridge for Stratus.
//!
//! Stores a fixed-block paged table as a set of named objects in a bucket
//! and reads it back one block at a time on page cache misses.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        surrounding engine                       │
//! │        page cache miss                       DDL / CLI          │
//! └──────────────┬───────────────────────────────────┬──────────────┘
//!                ▼                                   ▼
//!        ┌──────────────┐                 ┌────────────────────┐
//!        │    fetch     │                 │      migrate       │
//!        │ BlockFetcher │                 │ copy_to / copy_from│
//!        └──────┬───────┘                 │ delete_footprint   │
//!               │                         └─────────┬──────────┘
//!               ▼                                   ▼
//!   ┌─────────┬──────────┬────────┐      ┌─────────────────────┐
//!   │ address │ envelope │ header │◄─────┤   local .MAI .MAD   │
//!   └─────────┴──────────┴────────┘      └─────────────────────┘
//!               │
//!               ▼
//!      ObjectStoreClient (stratus-store)
//! ```
//!
//! ## Modules
//!
//! - [`address`]: object names and page-to-block mapping
//! - [`envelope`]: per-block compression envelope
//! - [`header`]: header field patching and capability reading
//! - [`fetch`]: the cache-miss read hook
//! - [`migrate`]: bulk copy and delete of a table footprint
//!
//! ## Example
//!
//! ```rust
//! use stratus_bridge::address::{ObjectName, TableFootprint};
//! use stratus_common::types::{BlockNumber, FileKind, TableId};
//!
//! let table = TableId::new("shop", "orders").unwrap();
//! let name = ObjectName::block(&table, FileKind::Index, BlockNumber::new(12));
//! assert_eq!(name.as_str(), "shop/orders/index/000012");
//!
//! let footprint = TableFootprint::new("tables", table);
//! assert_eq!(footprint.descriptor().as_str(), "shop/orders/aria");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod envelope;
pub mod fetch;
pub mod header;
pub mod migrate;

pub use address::{ObjectName, TableFootprint};
pub use fetch::{BigBlockRead, BlockFetcher, FetchStats, TableGeometry};
pub use header::TableCapabilities;
pub use migrate::{
    copy_from_store, copy_to_store, delete_footprint, CopyOptions, CopyReport, DeleteReport,
    LocalTable,
};
