//! Fetch statistics for monitoring and debugging.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for block fetches.
#[derive(Debug, Default)]
pub struct FetchStats {
    /// Fetch requests received from the page cache.
    requests: AtomicU64,
    /// Block objects read from the store.
    objects_read: AtomicU64,
    /// Decoded bytes returned to the page cache.
    bytes_returned: AtomicU64,
    /// Bytes read from the store before decoding.
    bytes_stored: AtomicU64,
    /// Failed fetches.
    failures: AtomicU64,
}

impl FetchStats {
    /// Creates new statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request.
    #[inline]
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a block read with its stored and decoded sizes.
    #[inline]
    pub fn record_read(&self, stored: usize, returned: usize) {
        self.objects_read.fetch_add(1, Ordering::Relaxed);
        self.bytes_stored.fetch_add(stored as u64, Ordering::Relaxed);
        self.bytes_returned.fetch_add(returned as u64, Ordering::Relaxed);
    }

    /// Records a failed fetch.
    #[inline]
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns total requests.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Returns block objects read.
    pub fn objects_read(&self) -> u64 {
        self.objects_read.load(Ordering::Relaxed)
    }

    /// Returns decoded bytes.
    pub fn bytes_returned(&self) -> u64 {
        self.bytes_returned.load(Ordering::Relaxed)
    }

    /// Returns stored bytes.
    pub fn bytes_stored(&self) -> u64 {
        self.bytes_stored.load(Ordering::Relaxed)
    }

    /// Returns failed fetches.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Returns stored bytes per decoded byte (1.0 when nothing was read).
    pub fn compression_ratio(&self) -> f64 {
        let returned = self.bytes_returned();
        if returned == 0 {
            1.0
        } else {
            self.bytes_stored() as f64 / returned as f64
        }
    }

    /// Resets all statistics.
    pub fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.objects_read.store(0, Ordering::Relaxed);
        self.bytes_returned.store(0, Ordering::Relaxed);
        self.bytes_stored.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
    }
}

impl Clone for FetchStats {
    fn clone(&self) -> Self {
        Self {
            requests: AtomicU64::new(self.requests()),
            objects_read: AtomicU64::new(self.objects_read()),
            bytes_returned: AtomicU64::new(self.bytes_returned()),
            bytes_stored: AtomicU64::new(self.bytes_stored()),
            failures: AtomicU64::new(self.failures()),
        }
    }
}

impl std::fmt::Display for FetchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FetchStats {{ requests: {}, objects: {}, bytes: {}, stored: {}, ratio: {:.2}, failures: {} }}",
            self.requests(),
            self.objects_read(),
            self.bytes_returned(),
            self.bytes_stored(),
            self.compression_ratio(),
            self.failures()
        )
    }
}
