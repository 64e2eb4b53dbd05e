//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache layer between tables/matrices and
//! their block files. It manages a fixed pool of frames, each holding one
//! page.
//!
//! # Components
//! - [`BufferManager`] - The page cache and the only path to block files
//! - [`Frame`] - A slot in the buffer pool holding a page + metadata
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII guards for page access
//! - [`BufferPoolStats`] - Block access counters
//! - [`replacer`] - Eviction policy implementations

mod buffer_manager;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_manager::BufferManager;
pub use frame::Frame;
pub use page_guard::{PageReadGuard, PageWriteGuard};
pub use stats::{BufferPoolStats, StatsSnapshot};
