//! Configuration for Stratus.
//!
//! This module provides configuration structures for the bridge and the
//! object store backends.

mod bridge;

pub use bridge::{BridgeConfig, StoreBackend, StoreConfig};
