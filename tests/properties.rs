//! Property tests over randomly shaped matrices, tables and access patterns.

use std::fs;

use proptest::prelude::*;
use tempfile::{tempdir, TempDir};
use tilestore::{BufferManager, EngineConfig, Matrix, PageKind, SortOrder, Table};

/// Tiny pages (6 integers) so small inputs span many blocks.
fn create_bm(block_count: usize) -> (BufferManager, TempDir) {
    let dir = tempdir().unwrap();
    let config = EngineConfig::rooted_at(dir.path())
        .with_block_size_bytes(24)
        .with_block_count(block_count);
    (BufferManager::new(config).unwrap(), dir)
}

fn csv_text(header: Option<&str>, rows: &[Vec<i32>]) -> String {
    let mut text = header.map(|h| format!("{h}\n")).unwrap_or_default();
    for row in rows {
        let fields: Vec<String> = row.iter().map(i32::to_string).collect();
        text.push_str(&fields.join(","));
        text.push('\n');
    }
    text
}

fn square(max: usize) -> impl Strategy<Value = Vec<Vec<i32>>> {
    (1..=max).prop_flat_map(|n| prop::collection::vec(prop::collection::vec(-50..50i32, n), n))
}

fn load_matrix(bm: &BufferManager, rows: &[Vec<i32>]) -> Matrix {
    fs::write(bm.config().data_source("A"), csv_text(None, rows)).unwrap();
    let mut matrix = Matrix::new("A", bm.config());
    matrix.load(bm).unwrap();
    matrix
}

fn table_rows(bm: &BufferManager, table: &Table) -> Vec<Vec<i32>> {
    let mut cursor = table.cursor(bm);
    let mut rows = Vec::new();
    while let Some(row) = cursor.get_next().unwrap() {
        rows.push(row);
    }
    rows
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever the access order, every block reads back its last write.
    #[test]
    fn prop_write_back(
        pool in 2..5usize,
        accesses in prop::collection::vec((0..8usize, any::<bool>()), 1..60),
    ) {
        let (bm, _dir) = create_bm(pool);
        let mut expected = vec![0i32; 8];
        for index in 0..8 {
            bm.write_page("T", index, PageKind::Table, &[vec![0]], 1, 1).unwrap();
        }

        for (step, (index, write)) in accesses.into_iter().enumerate() {
            if write {
                bm.fetch_page_write("T", index).unwrap().set_cell(0, 0, step as i32);
                expected[index] = step as i32;
            } else {
                let guard = bm.fetch_page_read("T", index).unwrap();
                prop_assert_eq!(guard.cell(0, 0), Some(expected[index]));
            }
            prop_assert!(bm.page_count() <= pool);
        }

        bm.flush_all().unwrap();
        for (index, value) in expected.iter().enumerate() {
            let page = bm.disk_manager().read_block(&tilestore::BlockKey::new("T", index)).unwrap();
            prop_assert_eq!(page.cell(0, 0), Some(*value));
        }
    }

    /// Loading then reading rows back is the identity.
    #[test]
    fn prop_matrix_round_trip(rows in square(9)) {
        let (bm, _dir) = create_bm(2);
        let matrix = load_matrix(&bm, &rows);
        let read: Vec<Vec<i32>> = matrix.rows(&bm).collect::<tilestore::Result<_>>().unwrap();
        prop_assert_eq!(read, rows);
    }

    /// Transpose swaps every (r, c) with (c, r); twice is the identity.
    #[test]
    fn prop_transpose(rows in square(9)) {
        let (bm, _dir) = create_bm(2);
        let mut matrix = load_matrix(&bm, &rows);
        let n = rows.len();

        matrix.transpose(&bm).unwrap();
        for r in 0..n {
            for c in 0..n {
                prop_assert_eq!(matrix.cell(&bm, r, c).unwrap(), rows[c][r]);
            }
        }

        matrix.transpose(&bm).unwrap();
        let read: Vec<Vec<i32>> = matrix.rows(&bm).collect::<tilestore::Result<_>>().unwrap();
        prop_assert_eq!(read, rows);
    }

    /// compute yields B with B[r][c] = A[r][c] - A[c][r]; symmetry agrees
    /// with a direct check.
    #[test]
    fn prop_compute_and_symmetry(rows in square(8)) {
        let (bm, _dir) = create_bm(3);
        let mut matrix = load_matrix(&bm, &rows);
        let n = rows.len();

        let symmetric = (0..n).all(|r| (0..n).all(|c| rows[r][c] == rows[c][r]));
        prop_assert_eq!(matrix.symmetry(&bm).unwrap(), symmetric);

        let result = matrix.compute(&bm, "B").unwrap();
        for r in 0..n {
            for c in 0..n {
                prop_assert_eq!(result.cell(&bm, r, c).unwrap(), rows[r][c] - rows[c][r]);
            }
        }
    }

    /// The sort is an ordered, stable permutation of its input.
    #[test]
    fn prop_sort(
        pool in 2..5usize,
        keys in prop::collection::vec((0..4i32, 0..3i32), 0..40),
        descending in any::<bool>(),
    ) {
        let (bm, _dir) = create_bm(pool);
        // The third column records the input position
        let rows: Vec<Vec<i32>> = keys
            .iter()
            .enumerate()
            .map(|(i, &(a, b))| vec![a, b, i as i32])
            .collect();
        fs::write(bm.config().data_source("T"), csv_text(Some("a,b,pos"), &rows)).unwrap();
        let mut table = Table::new("T", bm.config());
        table.load(&bm).unwrap();

        let order = if descending { SortOrder::Descending } else { SortOrder::Ascending };
        table.sort(&bm, &[("a", order), ("b", SortOrder::Ascending)]).unwrap();

        let mut expected = rows.clone();
        expected.sort_by(|x, y| {
            let first = if descending { y[0].cmp(&x[0]) } else { x[0].cmp(&y[0]) };
            first.then(x[1].cmp(&y[1]))
        });
        prop_assert_eq!(table_rows(&bm, &table), expected);
        prop_assert_eq!(table.row_count(), rows.len());
    }
}
