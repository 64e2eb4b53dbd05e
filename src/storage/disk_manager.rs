//! Disk Manager - low-level file I/O for block files.
//!
//! The [`DiskManager`] handles all direct block-file operations:
//! - Reading and writing blocks
//! - Deleting and renaming blocks
//! - Deleting and renaming arbitrary source files

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::trace;

use crate::common::{BlockKey, Error, Result};
use crate::storage::page::Page;

/// Manages the block files of every owner in one temp directory.
///
/// # File Layout
/// Each block is its own file, named after its [`BlockKey`]:
/// ```text
/// temp/
/// ├── A_Page0      (tile (0,0) of matrix A)
/// ├── A_Page1      (tile (0,1) of matrix A)
/// ├── T_Page0      (rows 0..k of table T)
/// └── ...
/// ```
///
/// # Thread Safety
/// `DiskManager` holds no mutable state; serializing access to a given block
/// is the [`BufferManager`](crate::BufferManager)'s job.
#[derive(Debug)]
pub struct DiskManager {
    temp_dir: PathBuf,
}

impl DiskManager {
    /// Create a disk manager rooted at `temp_dir`, creating it if missing.
    pub fn new<P: AsRef<Path>>(temp_dir: P) -> Result<Self> {
        let temp_dir = temp_dir.as_ref().to_path_buf();
        fs::create_dir_all(&temp_dir)?;
        Ok(Self { temp_dir })
    }

    #[inline]
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Path of a block's backing file.
    pub fn block_path(&self, key: &BlockKey) -> PathBuf {
        self.temp_dir.join(key.file_name())
    }

    /// Whether the block file exists.
    pub fn block_exists(&self, key: &BlockKey) -> bool {
        self.block_path(key).is_file()
    }

    /// Read a block from disk.
    ///
    /// # Errors
    /// - `Error::BlockNotFound` if the file doesn't exist
    /// - `Error::CorruptedBlock` if it fails validation
    pub fn read_block(&self, key: &BlockKey) -> Result<Page> {
        trace!("reading {}", key);
        let bytes = match fs::read(self.block_path(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::BlockNotFound(key.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        Page::from_bytes(&bytes).ok_or_else(|| Error::CorruptedBlock(key.clone()))
    }

    /// Write a block to disk, replacing any previous contents.
    pub fn write_block(&self, key: &BlockKey, page: &Page) -> Result<()> {
        trace!("writing {}", key);
        fs::write(self.block_path(key), page.to_bytes())?;
        Ok(())
    }

    /// Delete a block file.
    pub fn delete_block(&self, key: &BlockKey) -> Result<()> {
        self.delete_file(self.block_path(key))
    }

    /// Rename a block file to another owner, keeping its index.
    pub fn rename_block(&self, from: &BlockKey, to: &BlockKey) -> Result<()> {
        self.rename_file(self.block_path(from), self.block_path(to))
    }

    /// Delete any file (block or CSV source).
    pub fn delete_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::remove_file(path)?;
        Ok(())
    }

    /// Rename any file (block or CSV source).
    pub fn rename_file<P: AsRef<Path>, Q: AsRef<Path>>(&self, from: P, to: Q) -> Result<()> {
        fs::rename(from, to)?;
        Ok(())
    }
}
