//! External merge sort over table blocks.
//!
//! # Phases
//! 1. **Sorting** - read `block_count - 1` blocks at a time, sort the rows in
//!    memory and write each batch back as a sorted run.
//! 2. **Merging** - merge up to `block_count - 1` runs at a time (one cursor,
//!    so one pinned frame, per run) until a single run remains.
//!
//! Run blocks are written with [`BufferManager::write_page`], so the output
//! buffer never occupies a frame.

use std::cmp::Ordering;

use log::{debug, warn};

use crate::buffer::BufferManager;
use crate::common::Result;
use crate::cursor::Cursor;
use crate::storage::page::PageKind;

/// Direction of one sort column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// `+1` for ascending, `-1` for descending.
    pub fn multiplier(self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }

    #[inline]
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// A resolved sort column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: usize,
    pub order: SortOrder,
}

/// Compare two rows column by column, falling through on ties.
pub fn compare_rows(a: &[i32], b: &[i32], keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ordering = key.order.apply(a[key.column].cmp(&b[key.column]));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// A sorted sequence of blocks under one owner name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub owner: String,
    pub rows_per_block: Vec<usize>,
}

impl Run {
    #[inline]
    pub fn block_count(&self) -> usize {
        self.rows_per_block.len()
    }

    /// Move the run's blocks to `owner`.
    pub fn rename(self, bm: &BufferManager, owner: &str) -> Result<Run> {
        for index in 0..self.block_count() {
            bm.rename_block(&self.owner, owner, index)?;
        }
        Ok(Run {
            owner: owner.to_string(),
            rows_per_block: self.rows_per_block,
        })
    }

    /// Delete the run's blocks, reporting failures.
    pub fn discard(&self, bm: &BufferManager) {
        for index in 0..self.block_count() {
            if let Err(e) = bm.delete_block(&self.owner, index) {
                warn!("failed to delete {}_Page{}: {}", self.owner, index, e);
            }
        }
    }
}

/// What is being sorted.
pub struct SortInput<'a> {
    pub owner: &'a str,
    pub rows_per_block: &'a [usize],
    pub col_count: usize,
    pub max_rows_per_block: usize,
}

/// Buffers rows and writes a block every `max_rows` rows.
struct RunWriter<'a> {
    bm: &'a BufferManager,
    owner: String,
    col_count: usize,
    max_rows: usize,
    buffer: Vec<Vec<i32>>,
    rows_per_block: Vec<usize>,
}

impl<'a> RunWriter<'a> {
    fn new(bm: &'a BufferManager, owner: String, col_count: usize, max_rows: usize) -> Self {
        Self {
            bm,
            owner,
            col_count,
            max_rows,
            buffer: Vec::with_capacity(max_rows),
            rows_per_block: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<i32>) -> Result<()> {
        self.buffer.push(row);
        if self.buffer.len() == self.max_rows {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.bm.write_page(
            &self.owner,
            self.rows_per_block.len(),
            PageKind::Table,
            &self.buffer,
            self.buffer.len(),
            self.col_count,
        )?;
        self.rows_per_block.push(self.buffer.len());
        self.buffer.clear();
        Ok(())
    }

    /// Flush the remainder and describe the finished run.
    fn finish(mut self) -> Result<Run> {
        self.flush()?;
        Ok(Run {
            owner: self.owner,
            rows_per_block: self.rows_per_block,
        })
    }

    /// The run so far, for cleanup after a failure.
    fn partial(&self) -> Run {
        Run {
            owner: self.owner.clone(),
            rows_per_block: self.rows_per_block.clone(),
        }
    }
}

/// Sort `input` into a single run whose owner name starts with `scratch`.
///
/// Rows equal on every key keep their input order. The input blocks are
/// left untouched; on failure every run written so far is deleted.
pub fn external_sort(
    bm: &BufferManager,
    input: &SortInput<'_>,
    keys: &[SortKey],
    scratch: &str,
) -> Result<Run> {
    let mut live = Vec::new();
    match sort_and_merge(bm, input, keys, scratch, &mut live) {
        Ok(run) => Ok(run),
        Err(e) => {
            for run in &live {
                run.discard(bm);
            }
            Err(e)
        }
    }
}

fn sort_and_merge(
    bm: &BufferManager,
    input: &SortInput<'_>,
    keys: &[SortKey],
    scratch: &str,
    live: &mut Vec<Run>,
) -> Result<Run> {
    let block_count = bm.config().block_count;
    let run_blocks = block_count.saturating_sub(1).max(1);
    let fan_in = block_count.saturating_sub(1).max(2);

    sorting_phase(bm, input, keys, scratch, run_blocks, live)?;
    debug!(
        "sorting {}: {} initial runs of up to {} blocks",
        input.owner,
        live.len(),
        run_blocks
    );

    let mut pass = 0;
    while live.len() > 1 {
        pass += 1;
        merging_pass(bm, input, keys, scratch, pass, fan_in, live)?;
        debug!("sorting {}: {} runs after pass {}", input.owner, live.len(), pass);
    }

    Ok(live.pop().unwrap_or_else(|| Run {
        owner: format!("{scratch}__run0_0"),
        rows_per_block: Vec::new(),
    }))
}

fn sorting_phase(
    bm: &BufferManager,
    input: &SortInput<'_>,
    keys: &[SortKey],
    scratch: &str,
    run_blocks: usize,
    live: &mut Vec<Run>,
) -> Result<()> {
    let mut cursor = Cursor::new(bm, input.owner, PageKind::Table, input.rows_per_block.len());
    let indices: Vec<usize> = (0..input.rows_per_block.len()).collect();

    for (r, chunk) in indices.chunks(run_blocks).enumerate() {
        let mut rows = Vec::new();
        for &index in chunk {
            cursor.next_page(index)?;
            rows.extend(cursor.current_page()?.rows().iter().cloned());
        }
        rows.sort_by(|a, b| compare_rows(a, b, keys));

        let mut writer = RunWriter::new(
            bm,
            format!("{scratch}__run0_{r}"),
            input.col_count,
            input.max_rows_per_block,
        );
        for row in rows {
            if let Err(e) = writer.push(row) {
                live.push(writer.partial());
                return Err(e);
            }
        }
        live.push(writer.finish()?);
    }
    Ok(())
}

fn merging_pass(
    bm: &BufferManager,
    input: &SortInput<'_>,
    keys: &[SortKey],
    scratch: &str,
    pass: usize,
    fan_in: usize,
    live: &mut Vec<Run>,
) -> Result<()> {
    let runs = std::mem::take(live);
    let mut groups = runs.chunks(fan_in).enumerate();
    let mut merged = Vec::new();

    while let Some((g, group)) = groups.next() {
        if group.len() == 1 {
            merged.push(group[0].clone());
            continue;
        }

        let mut writer = RunWriter::new(
            bm,
            format!("{scratch}__run{pass}_{g}"),
            input.col_count,
            input.max_rows_per_block,
        );
        if let Err(e) = merge_group(bm, group, keys, &mut writer) {
            // Everything not yet consumed must still be cleaned up
            merged.push(writer.partial());
            merged.extend(group.iter().cloned());
            merged.extend(groups.flat_map(|(_, rest)| rest.iter().cloned()));
            *live = merged;
            return Err(e);
        }
        let run = match writer.finish() {
            Ok(run) => run,
            Err(e) => {
                merged.extend(group.iter().cloned());
                merged.extend(groups.flat_map(|(_, rest)| rest.iter().cloned()));
                *live = merged;
                return Err(e);
            }
        };
        for input_run in group {
            input_run.discard(bm);
        }
        merged.push(run);
    }

    *live = merged;
    Ok(())
}

/// k-way merge; ties go to the earlier run, which keeps the merge stable.
fn merge_group(
    bm: &BufferManager,
    group: &[Run],
    keys: &[SortKey],
    writer: &mut RunWriter<'_>,
) -> Result<()> {
    let mut cursors: Vec<Cursor<'_>> = group
        .iter()
        .map(|run| Cursor::new(bm, &run.owner, PageKind::Table, run.block_count()))
        .collect();
    let mut heads = Vec::with_capacity(cursors.len());
    for cursor in cursors.iter_mut() {
        heads.push(cursor.get_next()?);
    }

    loop {
        let mut smallest: Option<usize> = None;
        for (i, head) in heads.iter().enumerate() {
            let Some(row) = head else { continue };
            let better = match smallest.and_then(|s| heads[s].as_ref()) {
                Some(best) => compare_rows(row, best, keys) == Ordering::Less,
                None => true,
            };
            if better {
                smallest = Some(i);
            }
        }

        let Some(i) = smallest else { break };
        let next = cursors[i].get_next()?;
        if let Some(row) = std::mem::replace(&mut heads[i], next) {
            writer.push(row)?;
        }
    }
    Ok(())
}
