//! Eviction policy implementations (replacers).
//!
//! - [`FifoReplacer`] - evicts in admission order, skipping pinned frames

mod fifo;

pub use fifo::FifoReplacer;
