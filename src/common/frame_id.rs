//! Frame identifier type.

use std::fmt;

/// Position of a frame in the buffer pool's frame vector.
///
/// Frames never move, so a `FrameId` stays valid for the pool's lifetime
/// even as the page held in that frame changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub usize);

impl FrameId {
    #[inline]
    pub fn new(id: usize) -> Self {
        FrameId(id)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}
