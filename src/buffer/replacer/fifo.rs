//! FIFO (First-In-First-Out) replacement policy.
//!
//! Victims are chosen by admission order alone; hits do not reorder the
//! queue, so there is no per-access bookkeeping.

use std::collections::{HashSet, VecDeque};

use crate::common::FrameId;

/// Evicts the oldest-admitted frame that is not pinned.
///
/// Pinned frames keep their place in the queue and become candidates again
/// once unpinned.
pub struct FifoReplacer {
    /// Frame IDs in admission order (front = oldest).
    queue: VecDeque<FrameId>,

    /// Frames that are currently evictable (pin_count == 0).
    evictable: HashSet<FrameId>,
}

impl FifoReplacer {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            evictable: HashSet::new(),
        }
    }

    /// Record that a page was admitted into `frame_id`.
    ///
    /// Re-admitting a frame already queued is a no-op.
    pub fn record_admission(&mut self, frame_id: FrameId) {
        if !self.queue.contains(&frame_id) {
            self.queue.push_back(frame_id);
        }
    }

    /// Mark a frame as evictable or not.
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        if evictable {
            self.evictable.insert(frame_id);
        } else {
            self.evictable.remove(&frame_id);
        }
    }

    /// The oldest evictable frame, without removing it.
    pub fn victim(&self) -> Option<FrameId> {
        self.queue
            .iter()
            .copied()
            .find(|frame_id| self.evictable.contains(frame_id))
    }

    /// Remove and return the oldest evictable frame.
    #[cfg(test)]
    fn evict(&mut self) -> Option<FrameId> {
        let frame_id = self.victim()?;
        self.remove(frame_id);
        Some(frame_id)
    }

    /// Forget a frame entirely (its page was discarded or evicted).
    pub fn remove(&mut self, frame_id: FrameId) {
        self.queue.retain(|&f| f != frame_id);
        self.evictable.remove(&frame_id);
    }

    /// Number of evictable frames.
    #[cfg(test)]
    fn size(&self) -> usize {
        self.evictable.len()
    }
}

impl Default for FifoReplacer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admitted(frames: &[usize]) -> FifoReplacer {
        let mut replacer = FifoReplacer::new();
        for &f in frames {
            replacer.record_admission(FrameId::new(f));
            replacer.set_evictable(FrameId::new(f), true);
        }
        replacer
    }

    #[test]
    fn test_fifo_basic() {
        let mut replacer = admitted(&[0, 1, 2]);
        assert_eq!(replacer.size(), 3);

        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(2)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_pinned_frame_keeps_its_place() {
        let mut replacer = admitted(&[0, 1, 2]);
        replacer.set_evictable(FrameId::new(0), false);

        assert_eq!(replacer.evict(), Some(FrameId::new(1)));

        // Once unpinned, frame 0 is again the oldest
        replacer.set_evictable(FrameId::new(0), true);
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), Some(FrameId::new(2)));
    }

    #[test]
    fn test_all_pinned() {
        let mut replacer = admitted(&[0, 1]);
        replacer.set_evictable(FrameId::new(0), false);
        replacer.set_evictable(FrameId::new(1), false);
        assert_eq!(replacer.victim(), None);
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_remove() {
        let mut replacer = admitted(&[0, 1]);
        replacer.remove(FrameId::new(0));
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_readmission_does_not_reorder() {
        let mut replacer = admitted(&[0, 1]);
        replacer.record_admission(FrameId::new(0));

        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    }

    #[test]
    fn test_victim_does_not_remove() {
        let mut replacer = admitted(&[3]);
        assert_eq!(replacer.victim(), Some(FrameId::new(3)));
        assert_eq!(replacer.evict(), Some(FrameId::new(3)));
    }
}
