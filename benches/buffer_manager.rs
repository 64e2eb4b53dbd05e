//! Buffer pool and tiled matrix benchmarks.
//!
//! Pool size is the knob that matters: these runs compare a pool that
//! holds the working set against one that thrashes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::fs;
use tempfile::tempdir;
use tilestore::{BufferManager, EngineConfig, Matrix, PageKind, SortOrder, Table};

const BLOCKS: usize = 64;

fn bench_fetch(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_fetch");
    group.throughput(Throughput::Elements(BLOCKS as u64));

    for pool in [4usize, 64] {
        group.bench_with_input(BenchmarkId::new("sequential", pool), &pool, |b, &pool| {
            let dir = tempdir().unwrap();
            let bm = BufferManager::new(EngineConfig::rooted_at(dir.path()).with_block_count(pool))
                .unwrap();
            let row: Vec<i32> = (0..250).collect();
            for index in 0..BLOCKS {
                bm.write_page("T", index, PageKind::Table, &[row.clone()], 1, 250)
                    .unwrap();
            }

            b.iter(|| {
                for index in 0..BLOCKS {
                    let guard = bm.fetch_page_read("T", index).unwrap();
                    black_box(guard.cell(0, index % 250));
                }
            });
        });
    }

    group.finish();
}

fn bench_transpose(c: &mut Criterion) {
    let mut group = c.benchmark_group("matrix_transpose");
    group.sample_size(10);

    for n in [30usize, 90] {
        group.bench_with_input(BenchmarkId::new("tiles", n), &n, |b, &n| {
            let dir = tempdir().unwrap();
            let bm = BufferManager::new(EngineConfig::rooted_at(dir.path())).unwrap();
            let text: String = (0..n)
                .map(|r| {
                    let fields: Vec<String> = (0..n).map(|c| (r * n + c).to_string()).collect();
                    fields.join(",") + "\n"
                })
                .collect();
            fs::write(bm.config().data_source("A"), text).unwrap();
            let mut matrix = Matrix::new("A", bm.config());
            matrix.load(&bm).unwrap();

            b.iter(|| matrix.transpose(&bm).unwrap());
        });
    }

    group.finish();
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_sort");
    group.sample_size(10);

    for rows in [500usize, 2000] {
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("two_keys", rows), &rows, |b, &rows| {
            b.iter_with_setup(
                || {
                    let dir = tempdir().unwrap();
                    let bm = BufferManager::new(
                        EngineConfig::rooted_at(dir.path()).with_block_count(4),
                    )
                    .unwrap();
                    let mut text = String::from("a,b,c\n");
                    for i in 0..rows {
                        text.push_str(&format!("{},{},{}\n", (i * 7919) % 101, i % 13, i));
                    }
                    fs::write(bm.config().data_source("T"), text).unwrap();
                    let mut table = Table::new("T", bm.config());
                    table.load(&bm).unwrap();
                    (dir, bm, table)
                },
                |(dir, bm, mut table)| {
                    table
                        .sort(&bm, &[("a", SortOrder::Ascending), ("b", SortOrder::Descending)])
                        .unwrap();
                    (dir, bm, table)
                },
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fetch, bench_transpose, bench_sort);
criterion_main!(benches);
