//! Error types for tilestore.

use std::path::PathBuf;

use thiserror::Error;

use crate::common::BlockKey;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in tilestore.
///
/// Variants are grouped by where they come from: malformed CSV sources,
/// the filesystem, capacity configuration, cursor addressing and the
/// buffer pool itself.
#[derive(Debug, Error)]
pub enum Error {
    // --- source format ---
    /// A CSV row had fewer fields than the declared width.
    #[error("line {line}: expected {expected} fields, found {found}")]
    ShortRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A CSV field was not an integer.
    #[error("line {line}: invalid integer {value:?}")]
    InvalidValue { line: usize, value: String },

    /// The source produced no data rows.
    #[error("source {0} has no rows")]
    EmptySource(PathBuf),

    /// A matrix source is not N rows of N values.
    #[error("matrix source has {rows} rows but {dimension} columns")]
    NotSquare { rows: usize, dimension: usize },

    /// The header line names the same column twice.
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // --- filesystem ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The block file does not exist.
    #[error("{0} not found")]
    BlockNotFound(BlockKey),

    /// The block file failed its checksum or is truncated.
    #[error("{0} is corrupted")]
    CorruptedBlock(BlockKey),

    // --- capacity configuration ---
    /// Not even a 1×1 tile fits in one page.
    #[error("a page of {capacity} integers cannot hold a single tile element")]
    TileTooLarge { capacity: usize },

    /// Not even one row of the table fits in one page.
    #[error("a page of {capacity} integers cannot hold a row of {columns} columns")]
    RowTooWide { columns: usize, capacity: usize },

    /// A page was asked to hold more integers than a block allows.
    #[error("{rows}x{cols} block exceeds page capacity of {capacity} integers")]
    CapacityExceeded {
        rows: usize,
        cols: usize,
        capacity: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // --- cursor access ---
    /// A cell outside the populated extent of the current block.
    #[error("cell ({row}, {col}) is outside a {rows}x{cols} block")]
    InvalidAccess {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    // --- buffer pool ---
    /// Every frame is pinned, so nothing can be evicted.
    #[error("no free frames available in buffer pool")]
    NoFreeFrames,

    /// A conflicting guard on the same block is held.
    #[error("{0} is locked by another guard")]
    PageLocked(BlockKey),

    /// The block cannot be replaced or removed while a guard pins it.
    #[error("{0} is pinned")]
    PagePinned(BlockKey),

    // --- catalog / schema ---
    #[error("column {0} not found")]
    ColumnNotFound(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),
}
