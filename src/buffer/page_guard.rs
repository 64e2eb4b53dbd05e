//! RAII guards for page access.
//!
//! These guards are the only way to reach a cached page:
//! - [`PageReadGuard`] - Shared read access (multiple allowed)
//! - [`PageWriteGuard`] - Exclusive write access (auto-marks dirty)
//!
//! A guard pins its frame, so the page cannot be evicted while the guard is
//! alive. Both guards unpin when dropped.
//!
//! Fields drop in declaration order: the page lock is released before the
//! pin, so a frame is never evictable while one of its locks is still held.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{BlockKey, FrameId};
use crate::storage::page::Page;

use super::buffer_manager::BufferManager;

/// The pin a guard holds on its frame, released on drop.
struct FramePin<'a> {
    bm: &'a BufferManager,
    frame_id: FrameId,
    key: BlockKey,
    is_dirty: bool,
}

impl Drop for FramePin<'_> {
    fn drop(&mut self) {
        self.bm.unpin_page_internal(self.frame_id, self.is_dirty);
    }
}

/// Guard for read-only page access.
///
/// # Example
/// ```ignore
/// let guard = bm.fetch_page_read("A", 0)?;
/// let first = guard.cell(0, 0);
/// // guard drops here, page unpinned
/// ```
pub struct PageReadGuard<'a> {
    lock: RwLockReadGuard<'a, Page>,
    pin: FramePin<'a>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(
        bm: &'a BufferManager,
        frame_id: FrameId,
        key: BlockKey,
        lock: RwLockReadGuard<'a, Page>,
    ) -> Self {
        Self {
            lock,
            pin: FramePin {
                bm,
                frame_id,
                key,
                is_dirty: false,
            },
        }
    }

    #[inline]
    pub fn key(&self) -> &BlockKey {
        &self.pin.key
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.pin.frame_id
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

/// Guard for exclusive write access to a page.
///
/// The page is marked dirty when the guard drops, so the next eviction of
/// this block writes it back.
pub struct PageWriteGuard<'a> {
    lock: RwLockWriteGuard<'a, Page>,
    pin: FramePin<'a>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(
        bm: &'a BufferManager,
        frame_id: FrameId,
        key: BlockKey,
        lock: RwLockWriteGuard<'a, Page>,
    ) -> Self {
        Self {
            lock,
            pin: FramePin {
                bm,
                frame_id,
                key,
                is_dirty: true,
            },
        }
    }

    #[inline]
    pub fn key(&self) -> &BlockKey {
        &self.pin.key
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.pin.frame_id
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        &mut self.lock
    }
}
