//! Engine configuration.
//!
//! Every component that sizes a page, a run or a print window reads it from
//! an [`EngineConfig`] owned by the [`BufferManager`](crate::BufferManager).

use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

/// Default page size in kilobytes.
pub const DEFAULT_BLOCK_SIZE_KB: usize = 1;

const BYTES_PER_KB: usize = 1000;

/// Default number of frames in the buffer pool.
pub const DEFAULT_BLOCK_COUNT: usize = 2;

/// Default number of rows (and matrix columns) shown by `print`.
pub const DEFAULT_PRINT_COUNT: usize = 20;

/// Runtime configuration for one engine instance.
///
/// # Capacity
/// A page holds `block_size_bytes / size_of::<i32>()` integers. With the
/// default 1KB page that is 250 integers, so a matrix tile is 15×15 and a
/// 4-column table stores 62 rows per block.
///
/// # Example
/// ```
/// use tilestore::EngineConfig;
///
/// let config = EngineConfig::rooted_at("/tmp/tilestore")
///     .with_block_size_kb(2)
///     .with_block_count(4);
/// assert_eq!(config.integers_per_block(), 500);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Page size in bytes. Usually set in kilobytes via
    /// [`with_block_size_kb`](Self::with_block_size_kb).
    pub block_size_bytes: usize,
    /// Maximum number of pages resident in the buffer pool.
    pub block_count: usize,
    /// Rows (and matrix columns) shown by `print`.
    pub print_count: usize,
    /// Where permanent CSV files live.
    pub data_dir: PathBuf,
    /// Where block files and temporary CSV files live.
    pub temp_dir: PathBuf,
}

impl EngineConfig {
    /// Configuration with data in `root` and temporaries in `root/temp`.
    pub fn rooted_at<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            data_dir: root.to_path_buf(),
            temp_dir: root.join("temp"),
            ..Self::default()
        }
    }

    pub fn with_block_size_kb(mut self, block_size_kb: usize) -> Self {
        self.block_size_bytes = block_size_kb * BYTES_PER_KB;
        self
    }

    /// Page size below one kilobyte; mostly useful to force tiny tiles.
    pub fn with_block_size_bytes(mut self, block_size_bytes: usize) -> Self {
        self.block_size_bytes = block_size_bytes;
        self
    }

    pub fn with_block_count(mut self, block_count: usize) -> Self {
        self.block_count = block_count;
        self
    }

    pub fn with_print_count(mut self, print_count: usize) -> Self {
        self.print_count = print_count;
        self
    }

    /// Number of `i32` values one page can hold.
    #[inline]
    pub fn integers_per_block(&self) -> usize {
        self.block_size_bytes / std::mem::size_of::<i32>()
    }

    /// Path of the permanent CSV for an entity.
    pub fn data_source(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.csv"))
    }

    /// Path of the temporary CSV for an entity produced by an assignment.
    pub fn temp_source(&self, name: &str) -> PathBuf {
        self.temp_dir.join(format!("{name}.csv"))
    }

    /// Check the limits the block algorithms rely on.
    ///
    /// # Errors
    /// `Error::InvalidConfig` if the pool has fewer than two frames (tile
    /// pairs and two-way merges pin two pages at once) or a page cannot
    /// hold a single integer.
    pub fn validate(&self) -> Result<()> {
        if self.block_count < 2 {
            return Err(Error::InvalidConfig(format!(
                "block_count must be at least 2, got {}",
                self.block_count
            )));
        }
        if self.integers_per_block() == 0 {
            return Err(Error::InvalidConfig(format!(
                "a {}-byte block cannot hold an integer",
                self.block_size_bytes
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_size_bytes: DEFAULT_BLOCK_SIZE_KB * BYTES_PER_KB,
            block_count: DEFAULT_BLOCK_COUNT,
            print_count: DEFAULT_PRINT_COUNT,
            data_dir: PathBuf::from("../data"),
            temp_dir: PathBuf::from("../data/temp"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        let config = EngineConfig::default();
        assert_eq!(config.integers_per_block(), 250);
        assert_eq!(config.block_count, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rooted_paths() {
        let config = EngineConfig::rooted_at("/srv/db");
        assert_eq!(config.data_source("A"), PathBuf::from("/srv/db/A.csv"));
        assert_eq!(config.temp_source("A"), PathBuf::from("/srv/db/temp/A.csv"));
    }

    #[test]
    fn test_single_frame_rejected() {
        let config = EngineConfig::default().with_block_count(1);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_block_size_in_bytes() {
        let config = EngineConfig::default().with_block_size_bytes(24);
        assert_eq!(config.integers_per_block(), 6);
    }

    #[test]
    fn test_zero_sized_block_rejected() {
        let config = EngineConfig::default().with_block_size_kb(0);
        assert_eq!(config.integers_per_block(), 0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
