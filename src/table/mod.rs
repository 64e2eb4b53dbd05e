//! Tables: relations of integer rows stored as a sequence of blocks.
//!
//! A [`Table`] is created from a CSV source whose first line names the
//! columns, or from a column list by an assignment-style operator. Rows are
//! packed `max_rows_per_block` to a block in source order.

mod sort;

use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::buffer::BufferManager;
use crate::common::{EngineConfig, Error, Result};
use crate::cursor::Cursor;
use crate::row::{write_header_row, write_int_row};
use crate::storage::page::PageKind;
use crate::storage::CsvSource;

pub use sort::{compare_rows, external_sort, Run, SortInput, SortKey, SortOrder};

/// Index kind recorded for a table. Only the metadata is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexingStrategy {
    BTree,
    Hash,
    #[default]
    Nothing,
}

/// A relation of integer rows.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    /// Name the source was created under, see [`Table::is_permanent`].
    original_name: String,
    source_path: PathBuf,
    data_dir: PathBuf,
    columns: Vec<String>,
    column_index: HashMap<String, usize>,
    row_count: usize,
    max_rows_per_block: usize,
    rows_per_block: Vec<usize>,
    /// Values seen so far in each column.
    distinct_values: Vec<HashSet<i32>>,
    indexing_strategy: IndexingStrategy,
    indexed_column: Option<String>,
}

impl Table {
    /// A table backed by `<data>/<name>.csv`, pending [`load`](Self::load).
    pub fn new(name: &str, config: &EngineConfig) -> Self {
        Self::with_source(name, config.data_source(name), config)
    }

    /// A table produced by an assignment. The header is written to the
    /// temporary source `<temp>/<name>.csv` right away; rows follow with
    /// [`write_rows`](Self::write_rows) and then [`load`](Self::load).
    pub fn from_columns(name: &str, columns: Vec<String>, config: &EngineConfig) -> Result<Self> {
        let mut table = Self::with_source(name, config.temp_source(name), config);
        table.set_columns(columns, config.integers_per_block())?;

        let mut out = BufWriter::new(File::create(&table.source_path)?);
        write_header_row(&mut out, &table.columns)?;
        out.flush()?;
        Ok(table)
    }

    /// An empty table with the columns of `other`, whose blocks are about to
    /// be written directly.
    pub fn with_schema_of(name: &str, other: &Table, config: &EngineConfig) -> Self {
        let mut table = Self::with_source(name, config.temp_source(name), config);
        table.columns = other.columns.clone();
        table.column_index = other.column_index.clone();
        table.max_rows_per_block = other.max_rows_per_block;
        table.distinct_values = vec![HashSet::new(); other.columns.len()];
        table
    }

    fn with_source(name: &str, source_path: PathBuf, config: &EngineConfig) -> Self {
        Self {
            name: name.to_string(),
            original_name: name.to_string(),
            source_path,
            data_dir: config.data_dir.clone(),
            columns: Vec::new(),
            column_index: HashMap::new(),
            row_count: 0,
            max_rows_per_block: 0,
            rows_per_block: Vec::new(),
            distinct_values: Vec::new(),
            indexing_strategy: IndexingStrategy::Nothing,
            indexed_column: None,
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
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.rows_per_block.len()
    }

    #[inline]
    pub fn max_rows_per_block(&self) -> usize {
        self.max_rows_per_block
    }

    #[inline]
    pub fn rows_per_block(&self) -> &[usize] {
        &self.rows_per_block
    }

    /// Whether the source lives in the data directory rather than being a
    /// temporary. A renamed table is judged by the name it was created with.
    pub fn is_permanent(&self) -> bool {
        self.source_path == self.data_dir.join(format!("{}.csv", self.original_name))
    }

    // ========================================================================
    // Columns
    // ========================================================================

    fn set_columns(&mut self, columns: Vec<String>, capacity: usize) -> Result<()> {
        let mut column_index = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            if column_index.insert(column.clone(), i).is_some() {
                return Err(Error::DuplicateColumn(column.clone()));
            }
        }
        let max_rows_per_block = capacity.checked_div(columns.len()).unwrap_or(0);
        if max_rows_per_block == 0 {
            return Err(Error::RowTooWide {
                columns: columns.len(),
                capacity,
            });
        }

        self.distinct_values = vec![HashSet::new(); columns.len()];
        self.columns = columns;
        self.column_index = column_index;
        self.max_rows_per_block = max_rows_per_block;
        Ok(())
    }

    pub fn is_column(&self, column: &str) -> bool {
        self.column_index.contains_key(column)
    }

    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.column_index
            .get(column)
            .copied()
            .ok_or_else(|| Error::ColumnNotFound(column.to_string()))
    }

    pub fn column_indices(&self, columns: &[&str]) -> Result<Vec<usize>> {
        columns.iter().map(|c| self.column_index(c)).collect()
    }

    /// Rename a column in the metadata.
    ///
    /// # Errors
    /// - `Error::ColumnNotFound` if `from` is not a column
    /// - `Error::DuplicateColumn` if `to` already is one
    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        let index = self.column_index(from)?;
        if from == to {
            return Ok(());
        }
        if self.is_column(to) {
            return Err(Error::DuplicateColumn(to.to_string()));
        }
        self.column_index.remove(from);
        self.column_index.insert(to.to_string(), index);
        self.columns[index] = to.to_string();
        Ok(())
    }

    /// Number of distinct values seen in a column.
    pub fn distinct_count(&self, column: &str) -> Result<usize> {
        let index = self.column_index(column)?;
        Ok(self.distinct_values[index].len())
    }

    // ========================================================================
    // Indexing metadata
    // ========================================================================

    #[inline]
    pub fn indexing_strategy(&self) -> IndexingStrategy {
        self.indexing_strategy
    }

    #[inline]
    pub fn indexed_column(&self) -> Option<&str> {
        self.indexed_column.as_deref()
    }

    /// Record an index on `column`, or clear it with `Nothing`.
    pub fn set_indexing(&mut self, strategy: IndexingStrategy, column: &str) -> Result<()> {
        if strategy == IndexingStrategy::Nothing {
            self.indexing_strategy = strategy;
            self.indexed_column = None;
            return Ok(());
        }
        self.column_index(column)?;
        self.indexing_strategy = strategy;
        self.indexed_column = Some(column.to_string());
        Ok(())
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Read the header and pack the source rows into blocks.
    ///
    /// On failure every block already written is deleted and the table is
    /// left empty.
    pub fn load(&mut self, bm: &BufferManager) -> Result<()> {
        debug!("loading table {} from {}", self.name, self.source_path.display());
        // A reload replaces the blocks of the previous load
        self.discard_blocks(bm);

        if let Err(e) = self.blockify(bm) {
            self.discard_blocks(bm);
            self.columns.clear();
            self.column_index.clear();
            self.distinct_values.clear();
            return Err(e);
        }
        debug!(
            "table {}: {} rows in {} blocks",
            self.name,
            self.row_count,
            self.block_count()
        );
        Ok(())
    }

    fn blockify(&mut self, bm: &BufferManager) -> Result<()> {
        let mut source = CsvSource::open(&self.source_path)?;
        let header = match source.next_record()? {
            Some(record) if !record.is_empty() => record,
            _ => return Err(Error::EmptySource(self.source_path.clone())),
        };
        let columns = header.iter().map(str::to_string).collect();
        self.set_columns(columns, bm.config().integers_per_block())?;

        let width = self.column_count();
        let mut rows = Vec::with_capacity(self.max_rows_per_block);
        while let Some(row) = source.next_row(width)? {
            self.update_statistics(&row);
            rows.push(row);
            if rows.len() == self.max_rows_per_block {
                self.flush_block(bm, &rows)?;
                rows.clear();
            }
        }
        if !rows.is_empty() {
            self.flush_block(bm, &rows)?;
        }
        Ok(())
    }

    fn flush_block(&mut self, bm: &BufferManager, rows: &[Vec<i32>]) -> Result<()> {
        bm.write_page(
            &self.name,
            self.block_count(),
            PageKind::Table,
            rows,
            rows.len(),
            self.column_count(),
        )?;
        self.rows_per_block.push(rows.len());
        Ok(())
    }

    fn update_statistics(&mut self, row: &[i32]) {
        self.row_count += 1;
        for (seen, value) in self.distinct_values.iter_mut().zip(row) {
            seen.insert(*value);
        }
    }

    /// Append one row to the source.
    pub fn write_row(&self, row: &[i32]) -> Result<()> {
        self.write_rows(&[row.to_vec()])
    }

    /// Append rows to the source.
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

    /// A cursor over the rows in block order.
    pub fn cursor<'a>(&self, bm: &'a BufferManager) -> Cursor<'a> {
        Cursor::new(bm, &self.name, PageKind::Table, self.block_count())
    }

    /// Print the header and the first `print_count` rows, then the row count.
    pub fn print<W: Write>(&self, bm: &BufferManager, out: &mut W) -> Result<()> {
        write_header_row(out, &self.columns)?;

        let count = bm.config().print_count.min(self.row_count);
        let mut cursor = self.cursor(bm);
        for _ in 0..count {
            match cursor.get_next()? {
                Some(row) => write_int_row(out, &row)?,
                None => break,
            }
        }
        writeln!(out)?;
        writeln!(out, "Row Count: {}", self.row_count)?;
        Ok(())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Export header and rows to `<data>/<name>.csv` and make that the
    /// source. A temporary source is deleted once the export is written.
    pub fn make_permanent(&mut self, bm: &BufferManager) -> Result<()> {
        let dest = bm.config().data_source(&self.name);
        debug!("exporting table {} to {}", self.name, dest.display());

        let mut out = BufWriter::new(File::create(&dest)?);
        write_header_row(&mut out, &self.columns)?;
        let mut cursor = self.cursor(bm);
        while let Some(row) = cursor.get_next()? {
            write_int_row(&mut out, &row)?;
        }
        out.flush()?;
        drop(cursor);

        if !self.is_permanent() && self.source_path != dest {
            bm.discard_source(&self.source_path);
        }
        self.source_path = dest;
        self.original_name = self.name.clone();
        Ok(())
    }

    /// Move every block (and any cached copy) to `new_name`.
    ///
    /// A block that fails to move is reported and skipped.
    pub fn rename(&mut self, bm: &BufferManager, new_name: &str) {
        debug!("renaming table {} to {}", self.name, new_name);
        for index in 0..self.block_count() {
            if let Err(e) = bm.rename_block(&self.name, new_name, index) {
                warn!("failed to rename {}_Page{}: {}", self.name, index, e);
            }
        }
        self.name = new_name.to_string();
    }

    /// Delete every block and, unless permanent, the source.
    pub fn unload(&mut self, bm: &BufferManager) {
        debug!("unloading table {}", self.name);
        self.discard_blocks(bm);
        if !self.is_permanent() {
            bm.discard_source(&self.source_path);
        }
    }

    fn discard_blocks(&mut self, bm: &BufferManager) {
        for index in 0..self.block_count() {
            if let Err(e) = bm.delete_block(&self.name, index) {
                warn!("failed to delete {}_Page{}: {}", self.name, index, e);
            }
        }
        self.rows_per_block.clear();
        self.row_count = 0;
    }

    // ========================================================================
    // Sorting
    // ========================================================================

    fn sort_keys(&self, keys: &[(&str, SortOrder)]) -> Result<Vec<SortKey>> {
        keys.iter()
            .map(|&(column, order)| {
                Ok(SortKey {
                    column: self.column_index(column)?,
                    order,
                })
            })
            .collect()
    }

    fn sort_input(&self) -> SortInput<'_> {
        SortInput {
            owner: &self.name,
            rows_per_block: &self.rows_per_block,
            col_count: self.column_count(),
            max_rows_per_block: self.max_rows_per_block,
        }
    }

    /// Sort the table in place by `keys`, compared in order.
    ///
    /// Rows equal on every key keep their relative order.
    pub fn sort(&mut self, bm: &BufferManager, keys: &[(&str, SortOrder)]) -> Result<()> {
        debug!("sorting table {} by {:?}", self.name, keys);
        let keys = self.sort_keys(keys)?;
        let run = external_sort(bm, &self.sort_input(), &keys, &self.name)?;

        // Nothing of the table changes until every block can be replaced
        if let Err(e) = self.release_blocks(bm) {
            run.discard(bm);
            return Err(e);
        }

        let sorted_blocks = run.block_count();
        let run = run.rename(bm, &self.name)?;
        for index in sorted_blocks..self.block_count() {
            bm.delete_block(&self.name, index)?;
        }
        self.rows_per_block = run.rows_per_block;
        Ok(())
    }

    /// Take every block of this table out of the pool.
    fn release_blocks(&self, bm: &BufferManager) -> Result<()> {
        for index in 0..self.block_count() {
            bm.release_block(&self.name, index)?;
        }
        Ok(())
    }

    /// A new table `dest` holding this table's rows sorted by `keys`.
    pub fn sorted(
        &self,
        bm: &BufferManager,
        dest: &str,
        keys: &[(&str, SortOrder)],
    ) -> Result<Table> {
        debug!("sorting table {} into {} by {:?}", self.name, dest, keys);
        let keys = self.sort_keys(keys)?;
        let run = external_sort(bm, &self.sort_input(), &keys, dest)?;
        let run = run.rename(bm, dest)?;

        let mut table = Table::with_schema_of(dest, self, bm.config());
        table.rows_per_block = run.rows_per_block;
        table.row_count = self.row_count;
        table.distinct_values = self.distinct_values.clone();
        Ok(table)
    }
}
