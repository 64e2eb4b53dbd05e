//! tilestore - a page-oriented storage engine for block-tiled matrices and
//! row tables.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           tilestore                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Relations (table/, matrix/)                 │   │
//! │  │   Table: blockify + external sort                        │   │
//! │  │   Matrix: tiling + symmetry / transpose / compute        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                 Cursor (cursor.rs)                       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Buffer Pool (buffer/)                       │   │
//! │  │   BufferManager + Frame + FIFO replacer + statistics     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Storage Layer (storage/)                    │   │
//! │  │     DiskManager + Page + PageHeader + CSV sources        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (BlockKey, FrameId, Error, config)
//! - [`buffer`] - Buffer pool management and eviction policy
//! - [`storage`] - Block files, page format and CSV sources
//! - [`cursor`] - Sequential reads over an owner's blocks
//! - [`table`] - Row tables and external sort
//! - [`matrix`] - Tiled square matrices
//! - [`catalog`] - Registry of loaded relations
//!
//! # Quick Start
//! ```no_run
//! use tilestore::{BufferManager, EngineConfig, Matrix};
//!
//! let bm = BufferManager::new(EngineConfig::rooted_at("data")).unwrap();
//!
//! // Tile data/A.csv into blocks under data/temp
//! let mut a = Matrix::new("A", bm.config());
//! a.load(&bm).unwrap();
//!
//! if !a.symmetry(&bm).unwrap() {
//!     a.transpose(&bm).unwrap();
//! }
//! println!("{}", bm.report_stats());
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod cursor;
pub mod matrix;
pub mod row;
pub mod storage;
pub mod table;

// Re-export commonly used items at crate root for convenience
pub use common::{BlockKey, EngineConfig, Error, FrameId, Result};

pub use buffer::{BufferManager, BufferPoolStats, Frame, PageReadGuard, PageWriteGuard, StatsSnapshot};
pub use catalog::Catalog;
pub use cursor::Cursor;
pub use matrix::{Matrix, Tiling};
pub use row::RowValue;
pub use storage::page::{Page, PageHeader, PageKind};
pub use storage::DiskManager;
pub use table::{IndexingStrategy, SortOrder, Table};
