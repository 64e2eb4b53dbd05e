//! Integration tests for the buffer manager.
//!
//! These tests verify eviction order, write-back and block access counting
//! across the pool, the guards and the block files.

use std::sync::Arc;
use std::thread;

use tempfile::{tempdir, TempDir};
use tilestore::{BlockKey, BufferManager, EngineConfig, Error, PageKind};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn create_bm(block_count: usize) -> (BufferManager, TempDir) {
    init_logging();
    let dir = tempdir().unwrap();
    let config = EngineConfig::rooted_at(dir.path()).with_block_count(block_count);
    (BufferManager::new(config).unwrap(), dir)
}

/// Write `count` single-cell blocks `T_Page0..` holding their own index.
fn write_blocks(bm: &BufferManager, count: usize) {
    for i in 0..count {
        bm.write_page("T", i, PageKind::Table, &[vec![i as i32]], 1, 1)
            .unwrap();
    }
}

fn touch(bm: &BufferManager, index: usize) {
    drop(bm.fetch_page_read("T", index).unwrap());
}

// ============================================================================
// Eviction order
// ============================================================================

/// The oldest admitted block goes first, regardless of later hits.
#[test]
fn test_fifo_eviction_ignores_hits() {
    let (bm, _dir) = create_bm(2);
    write_blocks(&bm, 3);

    touch(&bm, 0);
    touch(&bm, 1);
    touch(&bm, 0); // a hit, no reordering
    touch(&bm, 2);

    assert!(!bm.is_cached("T", 0));
    assert!(bm.is_cached("T", 1));
    assert!(bm.is_cached("T", 2));
    assert_eq!(bm.page_count(), 2);
}

/// A pinned block is skipped and the next oldest is evicted.
#[test]
fn test_pinned_block_survives_eviction() {
    let (bm, _dir) = create_bm(2);
    write_blocks(&bm, 3);

    let pinned = bm.fetch_page_read("T", 0).unwrap();
    touch(&bm, 1);
    touch(&bm, 2);

    assert!(bm.is_cached("T", 0));
    assert!(!bm.is_cached("T", 1));
    assert_eq!(pinned.cell(0, 0), Some(0));
}

/// The pool never holds more than `block_count` pages.
#[test]
fn test_pool_size_bound() {
    let (bm, _dir) = create_bm(3);
    write_blocks(&bm, 10);

    for i in (0..10).chain((0..10).rev()) {
        touch(&bm, i);
        assert!(bm.page_count() <= 3);
    }
}

// ============================================================================
// Write-back
// ============================================================================

/// Data written through a guard survives eviction.
#[test]
fn test_write_back_across_evictions() {
    let (bm, _dir) = create_bm(2);
    write_blocks(&bm, 5);

    for i in 0..5 {
        let mut guard = bm.fetch_page_write("T", i).unwrap();
        guard.set_cell(0, 0, (i * 10) as i32);
    }

    for i in 0..5 {
        let guard = bm.fetch_page_read("T", i).unwrap();
        assert_eq!(guard.cell(0, 0), Some((i * 10) as i32));
    }
}

/// A clean page is discarded silently; a dirty one costs one write.
#[test]
fn test_eviction_write_counts() {
    let (bm, _dir) = create_bm(2);
    write_blocks(&bm, 4);
    bm.report_stats();

    touch(&bm, 0);
    bm.fetch_page_write("T", 1).unwrap().set_cell(0, 0, 7);
    touch(&bm, 2); // evicts clean T_Page0
    touch(&bm, 3); // evicts dirty T_Page1

    let report = bm.report_stats();
    assert_eq!(report.pages_read, 4);
    assert_eq!(report.pages_written, 1);
    assert_eq!(report.evictions, 2);

    let on_disk = bm.disk_manager().read_block(&BlockKey::new("T", 1)).unwrap();
    assert_eq!(on_disk.cell(0, 0), Some(7));
}

// ============================================================================
// Statistics
// ============================================================================

/// Reporting returns the counts and resets them.
#[test]
fn test_report_resets() {
    let (bm, _dir) = create_bm(2);
    write_blocks(&bm, 2);

    let first = bm.report_stats();
    assert_eq!(first.pages_written, 2);
    assert_eq!(
        first.to_string(),
        "Number of blocks read: 0\nNumber of blocks written: 2\nNumber of blocks accessed: 2"
    );

    assert_eq!(bm.report_stats().pages_accessed(), 0);
}

// ============================================================================
// Block management
// ============================================================================

/// Renaming moves the file and the cached copy, including unflushed data.
#[test]
fn test_rename_retargets_cached_page() {
    let (bm, _dir) = create_bm(2);
    write_blocks(&bm, 1);
    bm.fetch_page_write("T", 0).unwrap().set_cell(0, 0, 42);

    bm.rename_block("T", "U", 0).unwrap();

    assert!(!bm.is_cached("T", 0));
    assert!(bm.is_cached("U", 0));
    assert_eq!(bm.fetch_page_read("U", 0).unwrap().cell(0, 0), Some(42));

    bm.flush_all().unwrap();
    let on_disk = bm.disk_manager().read_block(&BlockKey::new("U", 0)).unwrap();
    assert_eq!(on_disk.cell(0, 0), Some(42));
    assert!(!bm.disk_manager().block_exists(&BlockKey::new("T", 0)));
}

/// Deleting a block also drops it from the pool.
#[test]
fn test_delete_discards_cached_page() {
    let (bm, _dir) = create_bm(2);
    write_blocks(&bm, 1);
    touch(&bm, 0);

    bm.delete_block("T", 0).unwrap();

    assert!(!bm.is_cached("T", 0));
    assert!(matches!(
        bm.fetch_page_read("T", 0),
        Err(Error::BlockNotFound(_))
    ));
}

/// A pinned block cannot be deleted out from under its guard.
#[test]
fn test_delete_pinned_block() {
    let (bm, _dir) = create_bm(2);
    write_blocks(&bm, 1);

    let guard = bm.fetch_page_read("T", 0).unwrap();
    assert!(matches!(bm.delete_block("T", 0), Err(Error::PagePinned(_))));
    drop(guard);
    assert!(bm.delete_block("T", 0).is_ok());
}

/// A corrupted block file is reported, not returned.
#[test]
fn test_corrupted_block() {
    let (bm, _dir) = create_bm(2);
    write_blocks(&bm, 1);

    let path = bm.disk_manager().block_path(&BlockKey::new("T", 0));
    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&path, bytes).unwrap();

    assert!(matches!(
        bm.fetch_page_read("T", 0),
        Err(Error::CorruptedBlock(_))
    ));
}

// ============================================================================
// Concurrency
// ============================================================================

/// Readers on separate threads share the pool without losing data.
#[test]
fn test_concurrent_readers() {
    let (bm, _dir) = create_bm(4);
    write_blocks(&bm, 8);
    let bm = Arc::new(bm);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let bm = Arc::clone(&bm);
            thread::spawn(move || {
                for round in 0..25 {
                    let index = (t + round * 3) % 8;
                    let guard = bm.fetch_page_read("T", index).unwrap();
                    assert_eq!(guard.cell(0, 0), Some(index as i32));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(bm.page_count() <= 4);
}

/// Many threads contending for a two-frame pool make progress; pool-full and
/// lock conflicts are reported as errors, never waited on.
#[test]
fn test_contended_small_pool() {
    let (bm, _dir) = create_bm(2);
    write_blocks(&bm, 4);
    let bm = Arc::new(bm);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let bm = Arc::clone(&bm);
            thread::spawn(move || {
                let mut served = 0;
                for round in 0..2000 {
                    let index = (t + round) % 4;
                    let result = if round % 5 == 0 {
                        bm.fetch_page_write("T", index).map(|mut guard| {
                            // Rewrite the same value so readers can check it
                            guard.set_cell(0, 0, index as i32);
                        })
                    } else {
                        bm.fetch_page_read("T", index).map(|guard| {
                            assert_eq!(guard.cell(0, 0), Some(index as i32));
                        })
                    };
                    match result {
                        Ok(()) => served += 1,
                        Err(Error::NoFreeFrames) | Err(Error::PageLocked(_)) => {}
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
                served
            })
        })
        .collect();

    let served: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert!(served > 0);
    assert!(bm.page_count() <= 2);

    // Every frame is unpinned again once the threads are done
    for index in 0..4 {
        assert!(matches!(bm.pin_count("T", index), None | Some(0)));
    }
    bm.flush_all().unwrap();
    for index in 0..4 {
        let on_disk = bm.disk_manager().read_block(&BlockKey::new("T", index)).unwrap();
        assert_eq!(on_disk.cell(0, 0), Some(index as i32));
    }
}
