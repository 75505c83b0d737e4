//! Numeric identifier types for Stratus.
//!
//! These types provide type-safe wrappers around block and page numbers,
//! which are easy to mix up: block numbers count store objects (1-based),
//! page numbers count local cache pages (0-based, including head pages).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Store block number - addresses one index or data block object.
///
/// Block numbers are 1-based and gapless within a file.
///
/// # Example
///
/// ```rust
/// use stratus_common::types::BlockNumber;
///
/// let block = BlockNumber::new(42);
/// assert_eq!(block.as_u64(), 42);
/// assert_eq!(block.next().as_u64(), 43);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BlockNumber(u64);

impl BlockNumber {
    /// The first block of every file.
    pub const FIRST: Self = Self(1);

    /// Creates a new `BlockNumber` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(n: u64) -> Self {
        Self(n)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next block number.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Checks if this is a valid block number (block 0 does not exist).
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockNumber({})", self.0)
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for BlockNumber {
    #[inline]
    fn from(n: u64) -> Self {
        Self::new(n)
    }
}

impl From<BlockNumber> for u64 {
    #[inline]
    fn from(n: BlockNumber) -> Self {
        n.0
    }
}

/// Page number in the local page cache.
///
/// Page `n` covers bytes `n << page_shift .. (n + 1) << page_shift` of the
/// local file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PageNumber(u64);

impl PageNumber {
    /// Creates a new `PageNumber` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(n: u64) -> Self {
        Self(n)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the page `count` pages after this one.
    #[inline]
    #[must_use]
    pub const fn advance(self, count: u64) -> Self {
        Self(self.0.saturating_add(count))
    }
}

impl fmt::Debug for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageNumber({})", self.0)
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PageNumber {
    #[inline]
    fn from(n: u64) -> Self {
        Self::new(n)
    }
}
