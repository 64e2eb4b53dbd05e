//! Square integer matrices stored as a grid of tiles.
//!
//! A [`Matrix`] is loaded from a CSV source whose first line fixes the
//! dimension N. Loading cuts the matrix into square tiles sized to one page
//! (see [`Tiling`]) and writes each tile as its own block. Whole-matrix
//! operations (see `ops.rs`) then run tile by tile through the
//! [`BufferManager`].

mod ops;
mod tiling;

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::buffer::BufferManager;
use crate::common::{EngineConfig, Error, Result};
use crate::cursor::Cursor;
use crate::row::write_int_row;
use crate::storage::page::PageKind;
use crate::storage::CsvSource;

pub use tiling::Tiling;

/// A square integer matrix persisted as tiles.
///
/// # Lifecycle
/// ```text
/// Matrix::new ──load──▶ tiles on disk ──unload──▶ gone
///                         │   ▲
///       symmetry/transpose│   │ compute (new matrix)
///                         ▼   │
///                      rename / make_permanent
/// ```
#[derive(Debug, Clone)]
pub struct Matrix {
    name: String,
    /// Name the source was loaded under; permanence is judged against it so
    /// a renamed matrix never deletes its permanent CSV.
    original_name: String,
    source_path: PathBuf,
    data_dir: PathBuf,
    dimension: usize,
    tiling: Option<Tiling>,
    block_count: usize,
    block_dims: Vec<(usize, usize)>,
    /// Cached result of [`Matrix::symmetry`].
    symmetric: Option<bool>,
}

impl Matrix {
    /// A matrix backed by `<data>/<name>.csv`, pending [`load`](Self::load).
    pub fn new(name: &str, config: &EngineConfig) -> Self {
        Self::with_source(name, config.data_source(name), config)
    }

    /// A matrix of known dimension produced by an assignment. Its source is
    /// the temporary `<temp>/<name>.csv`, filled with
    /// [`write_rows`](Self::write_rows) before loading.
    pub fn with_dimension(name: &str, dimension: usize, config: &EngineConfig) -> Self {
        let mut matrix = Self::with_source(name, config.temp_source(name), config);
        matrix.dimension = dimension;
        matrix
    }

    /// A matrix with the same tiling as `other`, whose tiles are about to be
    /// written block by block.
    pub fn with_layout_of(name: &str, other: &Matrix, config: &EngineConfig) -> Self {
        let mut matrix = Self::with_source(name, config.temp_source(name), config);
        matrix.dimension = other.dimension;
        matrix.tiling = other.tiling;
        matrix.block_count = other.block_count;
        matrix.block_dims = other.block_dims.clone();
        matrix
    }

    fn with_source(name: &str, source_path: PathBuf, config: &EngineConfig) -> Self {
        Self {
            name: name.to_string(),
            original_name: name.to_string(),
            source_path,
            data_dir: config.data_dir.clone(),
            dimension: 0,
            tiling: None,
            block_count: 0,
            block_dims: Vec::new(),
            symmetric: None,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn tiling(&self) -> Option<&Tiling> {
        self.tiling.as_ref()
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// `(rows, cols)` of every persisted tile, in block order.
    #[inline]
    pub fn block_dims(&self) -> &[(usize, usize)] {
        &self.block_dims
    }

    /// Cached symmetry, `None` until [`symmetry`](Self::symmetry) runs.
    #[inline]
    pub fn cached_symmetry(&self) -> Option<bool> {
        self.symmetric
    }

    /// Whether the source lives in the data directory (exported or loaded
    /// from there) rather than being a temporary.
    pub fn is_permanent(&self) -> bool {
        self.source_path == self.data_dir.join(format!("{}.csv", self.original_name))
    }

    fn loaded_tiling(&self) -> Result<Tiling> {
        self.tiling.ok_or_else(|| Error::NotFound(self.name.clone()))
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Read the source, fix the dimension from its first line and write the
    /// tiles.
    ///
    /// On failure every tile already written is deleted and the matrix is
    /// left empty.
    pub fn load(&mut self, bm: &BufferManager) -> Result<()> {
        debug!("loading matrix {} from {}", self.name, self.source_path.display());
        // A reload replaces the tiles of the previous load
        self.discard_blocks(bm);

        let result = self
            .extract_dimension()
            .and_then(|()| self.blockify(bm));

        if let Err(e) = result {
            self.discard_blocks(bm);
            self.dimension = 0;
            return Err(e);
        }
        Ok(())
    }

    fn extract_dimension(&mut self) -> Result<()> {
        let mut source = CsvSource::open(&self.source_path)?;
        match source.next_record()? {
            Some(record) if !record.is_empty() => {
                self.dimension = record.len();
                Ok(())
            }
            _ => Err(Error::EmptySource(self.source_path.clone())),
        }
    }

    /// Cut the source into tiles, flushing one tile row at a time.
    fn blockify(&mut self, bm: &BufferManager) -> Result<()> {
        let tiling = Tiling::for_capacity(bm.config().integers_per_block(), self.dimension)?;
        self.tiling = Some(tiling);
        self.symmetric = None;

        let m = tiling.edge();
        let mut grids = vec![vec![vec![0; m]; m]; tiling.per_side()];
        let mut source = CsvSource::open(&self.source_path)?;
        let mut row_index = 0;
        let mut rows_read = 0;

        while let Some(row) = source.next_row(self.dimension)? {
            if rows_read == self.dimension {
                return Err(Error::NotSquare {
                    rows: rows_read + 1,
                    dimension: self.dimension,
                });
            }
            for (col, value) in row.into_iter().enumerate() {
                grids[col / m][row_index][col % m] = value;
            }
            row_index += 1;
            rows_read += 1;
            if row_index == m {
                self.flush_tile_row(bm, &tiling, &grids, row_index)?;
                row_index = 0;
            }
        }
        if row_index > 0 {
            self.flush_tile_row(bm, &tiling, &grids, row_index)?;
        }

        if rows_read == 0 {
            return Err(Error::EmptySource(self.source_path.clone()));
        }
        if rows_read != self.dimension {
            return Err(Error::NotSquare {
                rows: rows_read,
                dimension: self.dimension,
            });
        }
        debug!(
            "matrix {}: {}x{} in {} tiles of edge {}",
            self.name,
            self.dimension,
            self.dimension,
            self.block_count,
            m
        );
        Ok(())
    }

    fn flush_tile_row(
        &mut self,
        bm: &BufferManager,
        tiling: &Tiling,
        grids: &[Vec<Vec<i32>>],
        row_count: usize,
    ) -> Result<()> {
        for (j, grid) in grids.iter().enumerate() {
            let col_count = tiling.tile_cols(j);
            bm.write_page(
                &self.name,
                self.block_count,
                PageKind::Matrix,
                grid,
                row_count,
                col_count,
            )?;
            self.block_count += 1;
            self.block_dims.push((row_count, col_count));
        }
        Ok(())
    }

    /// Append rows to the source before [`load`](Self::load).
    pub fn write_rows(&self, rows: &[Vec<i32>]) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.source_path)?;
        let mut out = BufWriter::new(file);
        for row in rows {
            write_int_row(&mut out, row)?;
        }
        out.flush()?;
        Ok(())
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// A cursor over this matrix's tiles, positioned at tile 0.
    pub fn cursor<'a>(&self, bm: &'a BufferManager) -> Cursor<'a> {
        Cursor::new(bm, &self.name, PageKind::Matrix, self.block_count)
    }

    /// The full matrix rows, assembled one tile row at a time.
    pub fn rows<'a>(&'a self, bm: &'a BufferManager) -> MatrixRows<'a> {
        MatrixRows {
            matrix: self,
            bm,
            next_tile_row: 0,
            buffered: VecDeque::new(),
        }
    }

    /// One cell, addressed in matrix coordinates.
    pub fn cell(&self, bm: &BufferManager, row: usize, col: usize) -> Result<i32> {
        let out_of_range = Error::InvalidAccess {
            row,
            col,
            rows: self.dimension,
            cols: self.dimension,
        };
        if row >= self.dimension || col >= self.dimension {
            return Err(out_of_range);
        }
        let tiling = self.loaded_tiling()?;
        let m = tiling.edge();
        let page = bm.fetch_page_read(&self.name, tiling.block_index(row / m, col / m))?;
        page.cell(row % m, col % m).ok_or(out_of_range)
    }

    /// Rows `i*m ..` of the matrix, restricted to the first `tile_cols` tile
    /// columns.
    fn assemble_tile_row(
        &self,
        bm: &BufferManager,
        tiling: &Tiling,
        i: usize,
        tile_cols: usize,
    ) -> Result<Vec<Vec<i32>>> {
        let mut rows = vec![Vec::with_capacity(self.dimension); tiling.tile_rows(i)];
        let mut cursor = self.cursor(bm);

        for j in 0..tile_cols {
            cursor.next_page(tiling.block_index(i, j))?;
            for row in rows.iter_mut() {
                match cursor.get_next()? {
                    Some(segment) => row.extend_from_slice(&segment),
                    None => break,
                }
            }
        }
        Ok(rows)
    }

    /// Print the top-left `min(print_count, N)` square followed by the row
    /// count.
    pub fn print<W: Write>(&self, bm: &BufferManager, out: &mut W) -> Result<()> {
        let count = bm.config().print_count.min(self.dimension);
        if let Some(tiling) = self.tiling {
            let tiles = count.div_ceil(tiling.edge());
            let mut printed = 0;
            for i in 0..tiles {
                for row in self.assemble_tile_row(bm, &tiling, i, tiles)? {
                    if printed == count {
                        break;
                    }
                    let shown: Vec<String> = row.iter().take(count).map(i32::to_string).collect();
                    writeln!(out, "{}", shown.join(" "))?;
                    printed += 1;
                }
            }
        }
        writeln!(out)?;
        writeln!(out, "Row Count: {}", self.dimension)?;
        Ok(())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Export every row to `<data>/<name>.csv` and make that the source.
    ///
    /// A temporary source is deleted once the export is written.
    pub fn make_permanent(&mut self, bm: &BufferManager) -> Result<()> {
        let dest = bm.config().data_source(&self.name);
        debug!("exporting matrix {} to {}", self.name, dest.display());

        let mut out = BufWriter::new(File::create(&dest)?);
        for row in self.rows(bm) {
            write_int_row(&mut out, &row?)?;
        }
        out.flush()?;

        if !self.is_permanent() && self.source_path != dest {
            bm.discard_source(&self.source_path);
        }
        self.source_path = dest;
        self.original_name = self.name.clone();
        Ok(())
    }

    /// Move every tile (and any cached copy) to `new_name`.
    ///
    /// A tile that fails to move is reported and skipped.
    pub fn rename(&mut self, bm: &BufferManager, new_name: &str) {
        debug!("renaming matrix {} to {}", self.name, new_name);
        for index in 0..self.block_count {
            if let Err(e) = bm.rename_block(&self.name, new_name, index) {
                warn!("failed to rename {}_Page{}: {}", self.name, index, e);
            }
        }
        self.name = new_name.to_string();
    }

    /// Delete every tile and, unless permanent, the source.
    ///
    /// Calling it again only retries the source deletion.
    pub fn unload(&mut self, bm: &BufferManager) {
        debug!("unloading matrix {}", self.name);
        self.discard_blocks(bm);
        if !self.is_permanent() {
            bm.discard_source(&self.source_path);
        }
    }

    fn discard_blocks(&mut self, bm: &BufferManager) {
        for index in 0..self.block_count {
            if let Err(e) = bm.delete_block(&self.name, index) {
                warn!("failed to delete {}_Page{}: {}", self.name, index, e);
            }
        }
        self.block_count = 0;
        self.block_dims.clear();
        self.tiling = None;
        self.symmetric = None;
    }
}

/// Iterator over full matrix rows, from [`Matrix::rows`].
pub struct MatrixRows<'a> {
    matrix: &'a Matrix,
    bm: &'a BufferManager,
    next_tile_row: usize,
    buffered: VecDeque<Vec<i32>>,
}

impl Iterator for MatrixRows<'_> {
    type Item = Result<Vec<i32>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(row) = self.buffered.pop_front() {
            return Some(Ok(row));
        }

        let tiling = self.matrix.tiling?;
        if self.next_tile_row >= tiling.per_side() {
            return None;
        }

        let i = self.next_tile_row;
        self.next_tile_row += 1;
        match self
            .matrix
            .assemble_tile_row(self.bm, &tiling, i, tiling.per_side())
        {
            Ok(rows) => {
                self.buffered.extend(rows);
                self.buffered.pop_front().map(Ok)
            }
            Err(e) => {
                // Stop after reporting the failure
                self.next_tile_row = tiling.per_side();
                Some(Err(e))
            }
        }
    }
}
