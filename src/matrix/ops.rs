//! Whole-matrix operations expressed tile by tile.
//!
//! Transposing an N×N matrix is the same as transposing every tile and
//! reflecting tile coordinates across the diagonal, so each operation below
//! visits the diagonal tiles once and the off-diagonal tiles in `(i, j)` /
//! `(j, i)` pairs. No operation pins more than two frames at a time.

use log::debug;

use crate::buffer::BufferManager;
use crate::common::Result;
use crate::storage::page::PageKind;

use super::Matrix;

impl Matrix {
    /// Whether the matrix equals its transpose.
    ///
    /// The answer is cached; later calls do not touch the pool. The scan
    /// stops at the first mismatch.
    pub fn symmetry(&mut self, bm: &BufferManager) -> Result<bool> {
        if let Some(symmetric) = self.symmetric {
            return Ok(symmetric);
        }
        debug!("checking symmetry of {}", self.name);

        let symmetric = self.scan_symmetry(bm)?;
        self.symmetric = Some(symmetric);
        Ok(symmetric)
    }

    fn scan_symmetry(&self, bm: &BufferManager) -> Result<bool> {
        let tiling = self.loaded_tiling()?;
        let per_side = tiling.per_side();

        for i in 0..per_side {
            let mut upper = self.cursor(bm);
            upper.next_page(tiling.block_index(i, i))?;
            let n = tiling.tile_rows(i);
            for k in 0..n {
                for l in (k + 1)..n {
                    if upper.get_cell(k, l)? != upper.get_cell(l, k)? {
                        return Ok(false);
                    }
                }
            }
            drop(upper);

            for j in (i + 1)..per_side {
                let mut upper = self.cursor(bm);
                let mut lower = self.cursor(bm);
                upper.next_page(tiling.block_index(i, j))?;
                lower.next_page(tiling.block_index(j, i))?;

                for k in 0..tiling.tile_rows(i) {
                    for l in 0..tiling.tile_cols(j) {
                        if upper.get_cell(k, l)? != lower.get_cell(l, k)? {
                            return Ok(false);
                        }
                    }
                }
            }
        }
        Ok(true)
    }

    /// Transpose in place.
    ///
    /// A matrix already known to be symmetric is left untouched. Modified
    /// tiles stay dirty in the pool and are written back on eviction.
    pub fn transpose(&mut self, bm: &BufferManager) -> Result<()> {
        if self.symmetric == Some(true) {
            debug!("{} is symmetric, transpose is a no-op", self.name);
            return Ok(());
        }
        debug!("transposing {}", self.name);

        let tiling = self.loaded_tiling()?;
        let per_side = tiling.per_side();

        for i in 0..per_side {
            bm.fetch_page_write(&self.name, tiling.block_index(i, i))?
                .transpose_in_place();

            for j in (i + 1)..per_side {
                let mut upper = bm.fetch_page_write(&self.name, tiling.block_index(i, j))?;
                let mut lower = bm.fetch_page_write(&self.name, tiling.block_index(j, i))?;

                let upper_t = upper.transposed();
                let lower_t = lower.transposed();
                let (upper_cols, lower_cols) = (lower.row_count(), upper.row_count());
                upper.replace_rows(lower_t, upper_cols);
                lower.replace_rows(upper_t, lower_cols);
            }
        }
        Ok(())
    }

    /// Compute `self - selfᵀ` into a new matrix called `dest`.
    ///
    /// `self` is only read. The result's tiles are written straight to disk;
    /// if any write fails they are deleted again.
    pub fn compute(&self, bm: &BufferManager, dest: &str) -> Result<Matrix> {
        debug!("computing {} = {} - {}ᵀ", dest, self.name, self.name);
        let mut result = Matrix::with_layout_of(dest, self, bm.config());

        if let Err(e) = self.write_antisymmetric(bm, dest) {
            result.unload(bm);
            return Err(e);
        }
        Ok(result)
    }

    fn write_antisymmetric(&self, bm: &BufferManager, dest: &str) -> Result<()> {
        let tiling = self.loaded_tiling()?;
        let per_side = tiling.per_side();

        for i in 0..per_side {
            let index = tiling.block_index(i, i);
            let diagonal = {
                let tile = bm.fetch_page_read(&self.name, index)?;
                difference(tile.rows(), &tile.transposed())
            };
            write_tile(bm, dest, index, &diagonal)?;

            for j in (i + 1)..per_side {
                let upper_index = tiling.block_index(i, j);
                let lower_index = tiling.block_index(j, i);
                let (upper, lower) = {
                    let upper = bm.fetch_page_read(&self.name, upper_index)?;
                    let lower = bm.fetch_page_read(&self.name, lower_index)?;
                    (
                        difference(upper.rows(), &lower.transposed()),
                        difference(lower.rows(), &upper.transposed()),
                    )
                };
                write_tile(bm, dest, upper_index, &upper)?;
                write_tile(bm, dest, lower_index, &lower)?;
            }
        }
        Ok(())
    }
}

/// Element-wise `a - b`, wrapping on overflow.
fn difference(a: &[Vec<i32>], b: &[Vec<i32>]) -> Vec<Vec<i32>> {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.iter().zip(y).map(|(p, q)| p.wrapping_sub(*q)).collect())
        .collect()
}

fn write_tile(bm: &BufferManager, owner: &str, index: usize, rows: &[Vec<i32>]) -> Result<()> {
    let col_count = rows.first().map_or(0, Vec::len);
    bm.write_page(owner, index, PageKind::Matrix, rows, rows.len(), col_count)
}
