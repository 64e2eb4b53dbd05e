//! Cursor - sequential reads over the blocks of one owner.

use crate::buffer::{BufferManager, PageReadGuard};
use crate::common::{Error, Result};
use crate::storage::page::{Page, PageKind};

/// A forward-seekable reader over the blocks of a table or matrix.
///
/// The cursor holds a read guard on its current block, so that block stays
/// pinned until the cursor moves on or is dropped. Other blocks of the same
/// owner are faulted in independently by other cursors.
///
/// `get_next` walks blocks in index order (`+1`), which is a table's row
/// order. Matrix traversals that need tile-grid order call
/// [`next_page`](Cursor::next_page) explicitly.
///
/// # Example
/// ```
/// use tilestore::{BufferManager, Cursor, EngineConfig, PageKind};
///
/// let dir = tempfile::tempdir().unwrap();
/// let bm = BufferManager::new(EngineConfig::rooted_at(dir.path())).unwrap();
/// bm.write_page("T", 0, PageKind::Table, &[vec![1, 2]], 1, 2).unwrap();
/// bm.write_page("T", 1, PageKind::Table, &[vec![3, 4]], 1, 2).unwrap();
///
/// let mut cursor = Cursor::new(&bm, "T", PageKind::Table, 2);
/// assert_eq!(cursor.get_next().unwrap(), Some(vec![1, 2]));
/// assert_eq!(cursor.get_next().unwrap(), Some(vec![3, 4]));
/// assert_eq!(cursor.get_next().unwrap(), None);
/// ```
pub struct Cursor<'a> {
    bm: &'a BufferManager,
    owner: String,
    kind: PageKind,
    block_count: usize,
    block_index: usize,
    row_offset: usize,
    page: Option<PageReadGuard<'a>>,
}

impl<'a> Cursor<'a> {
    /// Create a cursor positioned before the first row of block 0.
    ///
    /// No block is faulted in until the first read.
    pub fn new(bm: &'a BufferManager, owner: &str, kind: PageKind, block_count: usize) -> Self {
        Self {
            bm,
            owner: owner.to_string(),
            kind,
            block_count,
            block_index: 0,
            row_offset: 0,
            page: None,
        }
    }

    #[inline]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[inline]
    pub fn kind(&self) -> PageKind {
        self.kind
    }

    #[inline]
    pub fn block_index(&self) -> usize {
        self.block_index
    }

    /// Row within the current block that `get_next` returns next.
    #[inline]
    pub fn row_offset(&self) -> usize {
        self.row_offset
    }

    /// Reposition to the start of `index`, faulting it in if necessary.
    ///
    /// The current block is released first, so a cursor never pins more than
    /// one frame.
    pub fn next_page(&mut self, index: usize) -> Result<()> {
        self.page = None;
        self.block_index = index;
        self.row_offset = 0;
        self.load_current()
    }

    /// Return the next row, crossing into the following block when the
    /// current one is exhausted. `Ok(None)` once the last block is done.
    pub fn get_next(&mut self) -> Result<Option<Vec<i32>>> {
        loop {
            if self.page.is_none() {
                if self.block_index >= self.block_count {
                    return Ok(None);
                }
                self.load_current()?;
            }

            let row = self
                .page
                .as_ref()
                .and_then(|page| page.row(self.row_offset))
                .map(<[i32]>::to_vec);

            if let Some(row) = row {
                self.row_offset += 1;
                return Ok(Some(row));
            }

            self.page = None;
            self.block_index += 1;
            self.row_offset = 0;
        }
    }

    /// Random access to one cell of the current block.
    ///
    /// # Errors
    /// `Error::InvalidAccess` if `(row, col)` is outside the block's
    /// populated extent (never crosses into another block).
    pub fn get_cell(&mut self, row: usize, col: usize) -> Result<i32> {
        let page = self.current_page()?;
        page.cell(row, col).ok_or(Error::InvalidAccess {
            row,
            col,
            rows: page.row_count(),
            cols: page.col_count(),
        })
    }

    /// The current block, faulting it in if the cursor has not read yet.
    pub fn current_page(&mut self) -> Result<&Page> {
        if self.page.is_none() {
            self.load_current()?;
        }
        match self.page.as_deref() {
            Some(page) => Ok(page),
            None => Err(Error::InvalidAccess {
                row: self.row_offset,
                col: 0,
                rows: 0,
                cols: 0,
            }),
        }
    }

    fn load_current(&mut self) -> Result<()> {
        self.page = Some(self.bm.fetch_page_read(&self.owner, self.block_index)?);
        Ok(())
    }
}
