//! Buffer pool statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by the buffer manager.
///
/// `pages_read` and `pages_written` are the block-access counts reported to
/// users; hits and evictions are kept for diagnostics. All counters are
/// cumulative until [`BufferPoolStats::take`] resets them.
///
/// # Example
/// ```
/// use tilestore::BufferPoolStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = BufferPoolStats::new();
/// stats.pages_read.fetch_add(2, Ordering::Relaxed);
/// assert_eq!(stats.take().pages_read, 2);
/// assert_eq!(stats.snapshot().pages_read, 0);
/// ```
#[derive(Debug)]
pub struct BufferPoolStats {
    /// Lookups served from the pool.
    pub cache_hits: AtomicU64,

    /// Lookups that had to fault a block in.
    pub cache_misses: AtomicU64,

    /// Pages pushed out to admit another.
    pub evictions: AtomicU64,

    /// Blocks read from disk.
    pub pages_read: AtomicU64,

    /// Blocks written to disk.
    pub pages_written: AtomicU64,
}

impl BufferPoolStats {
    pub fn new() -> Self {
        Self {
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            pages_read: AtomicU64::new(0),
            pages_written: AtomicU64::new(0),
        }
    }

    /// Copy the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            pages_read: self.pages_read.load(Ordering::Relaxed),
            pages_written: self.pages_written.load(Ordering::Relaxed),
        }
    }

    /// Copy the current counters and reset them to zero.
    pub fn take(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.swap(0, Ordering::Relaxed),
            cache_misses: self.cache_misses.swap(0, Ordering::Relaxed),
            evictions: self.evictions.swap(0, Ordering::Relaxed),
            pages_read: self.pages_read.swap(0, Ordering::Relaxed),
            pages_written: self.pages_written.swap(0, Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.take();
    }
}

impl Default for BufferPoolStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time copy of [`BufferPoolStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub pages_read: u64,
    pub pages_written: u64,
}

impl StatsSnapshot {
    /// Blocks read plus blocks written.
    pub fn pages_accessed(&self) -> u64 {
        self.pages_read + self.pages_written
    }

    /// Cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of blocks read: {}", self.pages_read)?;
        writeln!(f, "Number of blocks written: {}", self.pages_written)?;
        write!(f, "Number of blocks accessed: {}", self.pages_accessed())
    }
}
