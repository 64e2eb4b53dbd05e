//! Buffer Manager - the bounded page cache every relation reads through.
//!
//! The [`BufferManager`] provides:
//! - Page caching between block files and memory
//! - Pin-based reference counting
//! - FIFO eviction with dirty page write-back
//! - Block file management (write, delete, rename) that keeps the cache in
//!   step with disk

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::atomic::Ordering;

use log::{debug, info, trace, warn};
use parking_lot::Mutex;

use crate::buffer::replacer::FifoReplacer;
use crate::buffer::{BufferPoolStats, Frame, PageReadGuard, PageWriteGuard, StatsSnapshot};
use crate::common::{BlockKey, EngineConfig, Error, FrameId, Result};
use crate::storage::page::{Page, PageKind};
use crate::storage::DiskManager;

/// Mutable bookkeeping of the pool, guarded by one mutex so that
/// check-miss, evict, write-back and admit happen as a single step.
struct PoolState {
    /// Maps block keys to the frames holding them.
    page_table: HashMap<BlockKey, FrameId>,

    /// Frames holding no page.
    free_list: Vec<FrameId>,

    /// Admission order of occupied frames.
    replacer: FifoReplacer,
}

/// Manages a pool of `block_count` frames caching block files.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                       BufferManager                         │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ page_table   │  │        frames: Vec<Frame>         │   │
/// │  │BlockKey → Fid│─▶│  [Frame0] [Frame1] ...            │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │  free_list   │  │   replacer   │  │ disk_manager │      │
/// │  │ Vec<FrameId> │  │ FifoReplacer │  │  temp dir    │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `state`: one `Mutex` over page table, free list and replacer
/// - `frames`: No lock - fixed size, each Frame has internal locks
/// - `stats`: No lock - all atomic counters
///
/// # Usage
/// ```
/// use tilestore::{BufferManager, EngineConfig, PageKind};
///
/// let dir = tempfile::tempdir().unwrap();
/// let bm = BufferManager::new(EngineConfig::rooted_at(dir.path())).unwrap();
///
/// bm.write_page("A", 0, PageKind::Matrix, &[vec![1, 2], vec![3, 4]], 2, 2).unwrap();
///
/// let guard = bm.fetch_page_read("A", 0).unwrap();
/// assert_eq!(guard.cell(1, 0), Some(3));
/// ```
pub struct BufferManager {
    config: EngineConfig,

    /// Fixed pool of frames allocated at startup.
    frames: Vec<Frame>,

    state: Mutex<PoolState>,

    /// Handles all block file I/O.
    disk_manager: DiskManager,

    stats: BufferPoolStats,
}

impl BufferManager {
    /// Create a buffer manager with `config.block_count` frames.
    ///
    /// # Errors
    /// - `Error::InvalidConfig` if the configuration is unusable
    /// - I/O errors creating the temp directory
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let disk_manager = DiskManager::new(&config.temp_dir)?;

        let pool_size = config.block_count;
        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();

        // Reversed so that pop() hands out frame 0 first
        let free_list: Vec<FrameId> = (0..pool_size).rev().map(FrameId::new).collect();

        debug!(
            "buffer manager: {} frames of {} integers in {}",
            pool_size,
            config.integers_per_block(),
            config.temp_dir.display()
        );

        Ok(Self {
            config,
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::new(),
                free_list,
                replacer: FifoReplacer::new(),
            }),
            disk_manager,
            stats: BufferPoolStats::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn disk_manager(&self) -> &DiskManager {
        &self.disk_manager
    }

    // ========================================================================
    // Public API: Fetch pages
    // ========================================================================

    /// Fetch a block for reading (shared access).
    ///
    /// If the block is cached, returns immediately. Otherwise loads it from
    /// its block file, evicting the oldest unpinned page if the pool is full.
    ///
    /// # Errors
    /// - `Error::BlockNotFound` if the block file doesn't exist
    /// - `Error::NoFreeFrames` if all frames are pinned
    /// - `Error::PageLocked` if a write guard on the block is alive
    pub fn fetch_page_read(&self, owner: &str, index: usize) -> Result<PageReadGuard<'_>> {
        let key = BlockKey::new(owner, index);
        let frame_id = self.pin_block(&key)?;

        match self.frames[frame_id.0].try_page() {
            Some(lock) => Ok(PageReadGuard::new(self, frame_id, key, lock)),
            None => {
                self.unpin_page_internal(frame_id, false);
                Err(Error::PageLocked(key))
            }
        }
    }

    /// Fetch a block for writing (exclusive access).
    ///
    /// The page is marked dirty when the guard drops and written back when
    /// it is evicted or flushed.
    ///
    /// # Errors
    /// - `Error::BlockNotFound` if the block file doesn't exist
    /// - `Error::NoFreeFrames` if all frames are pinned
    /// - `Error::PageLocked` if any other guard on the block is alive
    pub fn fetch_page_write(&self, owner: &str, index: usize) -> Result<PageWriteGuard<'_>> {
        let key = BlockKey::new(owner, index);
        let frame_id = self.pin_block(&key)?;

        match self.frames[frame_id.0].try_page_mut() {
            Some(lock) => Ok(PageWriteGuard::new(self, frame_id, key, lock)),
            None => {
                self.unpin_page_internal(frame_id, false);
                Err(Error::PageLocked(key))
            }
        }
    }

    // ========================================================================
    // Public API: Write, delete and rename blocks
    // ========================================================================

    /// Write a block built wholesale from `rows`, bypassing the cache.
    ///
    /// Only the first `row_count` rows and `col_count` columns of `rows` are
    /// stored, so a caller can flush a partially filled staging buffer. A
    /// stale cached copy of the block is discarded.
    ///
    /// # Errors
    /// - `Error::CapacityExceeded` if the block would not fit in one page
    /// - `Error::PagePinned` if a guard on the block is alive
    pub fn write_page(
        &self,
        owner: &str,
        index: usize,
        kind: PageKind,
        rows: &[Vec<i32>],
        row_count: usize,
        col_count: usize,
    ) -> Result<()> {
        let capacity = self.config.integers_per_block();
        if row_count * col_count > capacity || row_count > rows.len() {
            return Err(Error::CapacityExceeded {
                rows: row_count,
                cols: col_count,
                capacity,
            });
        }
        if let Some((line, row)) = rows[..row_count]
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() < col_count)
        {
            return Err(Error::ShortRow {
                line,
                expected: col_count,
                found: row.len(),
            });
        }

        let key = BlockKey::new(owner, index);
        self.discard_cached(&key)?;

        let page = Page::new(kind, rows[..row_count].to_vec(), col_count);
        self.disk_manager.write_block(&key, &page)?;
        self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Write back and drop the cached copy of a block, leaving the file as
    /// the only copy. A block that isn't cached is left alone.
    ///
    /// # Errors
    /// - `Error::PagePinned` if a guard on the block is alive
    /// - I/O errors from the write-back
    pub fn release_block(&self, owner: &str, index: usize) -> Result<()> {
        self.uncache(&BlockKey::new(owner, index), true)
    }

    /// Delete a block file and any cached copy of it.
    ///
    /// # Errors
    /// - `Error::PagePinned` if a guard on the block is alive
    /// - I/O errors from the delete
    pub fn delete_block(&self, owner: &str, index: usize) -> Result<()> {
        let key = BlockKey::new(owner, index);
        self.discard_cached(&key)?;
        self.disk_manager.delete_block(&key)
    }

    /// Move a block from `old_owner` to `new_owner`, keeping its index.
    ///
    /// A cached copy follows the file, so a dirty page is later written back
    /// under its new name.
    pub fn rename_block(&self, old_owner: &str, new_owner: &str, index: usize) -> Result<()> {
        let from = BlockKey::new(old_owner, index);
        let to = BlockKey::new(new_owner, index);

        self.discard_cached(&to)?;
        self.disk_manager.rename_block(&from, &to)?;

        let mut state = self.state.lock();
        if let Some(frame_id) = state.page_table.remove(&from) {
            self.frames[frame_id.0].set_key(Some(to.clone()));
            state.page_table.insert(to, frame_id);
        }
        Ok(())
    }

    /// Delete a non-block file (a CSV source).
    pub fn delete_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.disk_manager.delete_file(path)
    }

    /// Delete a CSV source as cleanup: a file that is already gone is fine,
    /// any other failure is reported and ignored.
    pub fn discard_source<P: AsRef<Path>>(&self, path: P) {
        let path = path.as_ref();
        match self.disk_manager.delete_file(path) {
            Ok(()) => {}
            Err(Error::Io(e)) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("failed to delete {}: {}", path.display(), e),
        }
    }

    /// Rename a non-block file (a CSV source).
    pub fn rename_file<P: AsRef<Path>, Q: AsRef<Path>>(&self, from: P, to: Q) -> Result<()> {
        self.disk_manager.rename_file(from, to)
    }

    // ========================================================================
    // Public API: Flush
    // ========================================================================

    /// Write back every dirty cached page.
    ///
    /// # Errors
    /// - `Error::PageLocked` if a write guard is alive on a dirty page
    /// - I/O errors from disk write
    pub fn flush_all(&self) -> Result<()> {
        let state = self.state.lock();

        for (key, &frame_id) in &state.page_table {
            let frame = &self.frames[frame_id.0];
            if !frame.is_dirty() {
                continue;
            }
            let page = frame
                .try_page()
                .ok_or_else(|| Error::PageLocked(key.clone()))?;
            self.disk_manager.write_block(key, &page)?;
            frame.clear_dirty();
            self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
        }

        Ok(())
    }

    // ========================================================================
    // Public API: Statistics and inspection
    // ========================================================================

    #[inline]
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Log the block access counts and reset them.
    pub fn report_stats(&self) -> StatsSnapshot {
        let snapshot = self.stats.take();
        info!(
            "blocks read: {}, written: {}, accessed: {}",
            snapshot.pages_read,
            snapshot.pages_written,
            snapshot.pages_accessed()
        );
        snapshot
    }

    /// Number of frames in the pool.
    #[inline]
    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    /// Number of blocks currently cached.
    pub fn page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// Number of cached blocks with unflushed changes.
    pub fn dirty_page_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_dirty()).count()
    }

    pub fn is_cached(&self, owner: &str, index: usize) -> bool {
        self.state
            .lock()
            .page_table
            .contains_key(&BlockKey::new(owner, index))
    }

    /// Pin count of a cached block, or `None` if it isn't cached.
    pub fn pin_count(&self, owner: &str, index: usize) -> Option<u32> {
        let state = self.state.lock();
        state
            .page_table
            .get(&BlockKey::new(owner, index))
            .map(|fid| self.frames[fid.0].pin_count())
    }

    /// Whether any cached block belongs to `owner`.
    pub fn caches_owner(&self, owner: &str) -> bool {
        self.state.lock().page_table.keys().any(|k| k.owner == owner)
    }

    // ========================================================================
    // Internal: Called by page guards
    // ========================================================================

    /// Unpin a frame. Called by page guards on drop.
    pub(crate) fn unpin_page_internal(&self, frame_id: FrameId, is_dirty: bool) {
        let frame = &self.frames[frame_id.0];

        if is_dirty {
            frame.mark_dirty();
        }

        // Under the pool mutex, so a concurrent pin_block cannot re-pin the
        // frame between the decrement and the replacer update
        let mut state = self.state.lock();
        if frame.unpin() == 0 {
            state.replacer.set_evictable(frame_id, true);
        }
    }

    // ========================================================================
    // Internal: Frame management
    // ========================================================================

    /// Pin the frame holding `key`, faulting the block in on a miss.
    fn pin_block(&self, key: &BlockKey) -> Result<FrameId> {
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(key) {
            self.frames[frame_id.0].pin();
            state.replacer.set_evictable(frame_id, false);
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(frame_id);
        }

        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        if state.free_list.is_empty() && state.replacer.victim().is_none() {
            return Err(Error::NoFreeFrames);
        }

        // Read before evicting so a missing block costs no cached page
        let page = self.disk_manager.read_block(key)?;
        self.stats.pages_read.fetch_add(1, Ordering::Relaxed);
        trace!("page fault on {}", key);

        // A frame is known to be available and the state lock is held
        let frame_id = self.get_free_frame(&mut state)?;
        let frame = &self.frames[frame_id.0];

        // Unmapped and unpinned, so no guard can hold this lock
        *frame.page_mut() = page;
        frame.set_key(Some(key.clone()));
        frame.clear_dirty();
        frame.pin();

        state.page_table.insert(key.clone(), frame_id);
        state.replacer.record_admission(frame_id);
        state.replacer.set_evictable(frame_id, false);

        Ok(frame_id)
    }

    /// Get a free frame, evicting the oldest unpinned page if necessary.
    fn get_free_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop() {
            return Ok(frame_id);
        }

        let frame_id = state.replacer.victim().ok_or(Error::NoFreeFrames)?;
        let frame = &self.frames[frame_id.0];

        if let Some(old_key) = frame.key() {
            if frame.is_dirty() {
                self.disk_manager.write_block(&old_key, &frame.page())?;
                self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
            }
            trace!("evicting {}", old_key);
            state.page_table.remove(&old_key);
        }

        state.replacer.remove(frame_id);
        frame.set_key(None);
        frame.clear_dirty();
        self.stats.evictions.fetch_add(1, Ordering::Relaxed);

        Ok(frame_id)
    }

    /// Drop the cached copy of `key`, if any, without writing it back.
    fn discard_cached(&self, key: &BlockKey) -> Result<()> {
        self.uncache(key, false)
    }

    /// Remove `key` from the pool, writing it back first if `write_back` is
    /// set and the page is dirty.
    fn uncache(&self, key: &BlockKey, write_back: bool) -> Result<()> {
        let mut state = self.state.lock();

        let frame_id = match state.page_table.get(key) {
            Some(&fid) => fid,
            None => return Ok(()),
        };

        let frame = &self.frames[frame_id.0];
        if frame.is_pinned() {
            return Err(Error::PagePinned(key.clone()));
        }
        if write_back && frame.is_dirty() {
            self.disk_manager.write_block(key, &frame.page())?;
            self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
        }

        state.page_table.remove(key);
        state.replacer.remove(frame_id);
        frame.reset();
        state.free_list.push(frame_id);

        Ok(())
    }
}
