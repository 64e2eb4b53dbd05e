//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds a [`Page`] plus metadata needed for buffer management:
//! - Which block is loaded (if any)
//! - Pin count for reference counting
//! - Dirty flag for write-back tracking

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::BlockKey;
use crate::storage::page::Page;

/// A frame in the buffer pool.
///
/// The pool allocates `block_count` frames at startup; each holds at most
/// one page at a time.
///
/// # Thread Safety
/// All fields use interior mutability:
/// - `page`: `RwLock`, taken with `try_*` by guards so a conflicting access
///   fails instead of blocking
/// - `key`: `Mutex`
/// - `pin_count`: `AtomicU32`
/// - `is_dirty`: `AtomicBool`
pub struct Frame {
    page: RwLock<Page>,
    key: Mutex<Option<BlockKey>>,
    pin_count: AtomicU32,
    is_dirty: AtomicBool,
}

impl Frame {
    /// Create a new empty frame.
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::empty()),
            key: Mutex::new(None),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
        }
    }

    // ========================================================================
    // Page access
    // ========================================================================

    /// Acquire read lock on the page, blocking.
    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Acquire write lock on the page, blocking.
    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    /// Acquire read lock on the page unless a writer holds it.
    #[inline]
    pub fn try_page(&self) -> Option<RwLockReadGuard<'_, Page>> {
        self.page.try_read()
    }

    /// Acquire write lock on the page unless anyone holds it.
    #[inline]
    pub fn try_page_mut(&self) -> Option<RwLockWriteGuard<'_, Page>> {
        self.page.try_write()
    }

    // ========================================================================
    // Block key
    // ========================================================================

    /// The block currently loaded, if any.
    #[inline]
    pub fn key(&self) -> Option<BlockKey> {
        self.key.lock().clone()
    }

    #[inline]
    pub fn set_key(&self, key: Option<BlockKey>) {
        *self.key.lock() = key;
    }

    // ========================================================================
    // Pin count
    // ========================================================================

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrement the pin count. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if pin count is already 0.
    #[inline]
    pub fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::Relaxed);
        assert!(old > 0, "pin count underflow");
        old - 1
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    // ========================================================================
    // Dirty flag
    // ========================================================================

    #[inline]
    pub fn mark_dirty(&self) {
        self.is_dirty.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn clear_dirty(&self) {
        self.is_dirty.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Relaxed)
    }

    // ========================================================================
    // Frame state
    // ========================================================================

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.key.lock().is_none()
    }

    /// Drop the loaded page and return the frame to its initial state.
    ///
    /// Only valid on an unpinned frame.
    pub fn reset(&self) {
        *self.page_mut() = Page::empty();
        self.set_key(None);
        self.clear_dirty();
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}
