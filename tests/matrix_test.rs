//! Integration tests for tiled matrices.

use std::fs;

use tempfile::{tempdir, TempDir};
use tilestore::{BlockKey, BufferManager, Catalog, EngineConfig, Matrix};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Pages of 6 integers give 2×2 tiles.
fn create_bm() -> (BufferManager, TempDir) {
    init_logging();
    let dir = tempdir().unwrap();
    let config = EngineConfig::rooted_at(dir.path()).with_block_size_bytes(24);
    (BufferManager::new(config).unwrap(), dir)
}

fn write_csv(bm: &BufferManager, name: &str, rows: &[Vec<i32>]) {
    let text: String = rows
        .iter()
        .map(|r| {
            let fields: Vec<String> = r.iter().map(|v| v.to_string()).collect();
            fields.join(", ") + "\n"
        })
        .collect();
    fs::write(bm.config().data_source(name), text).unwrap();
}

fn load(bm: &BufferManager, name: &str, rows: &[Vec<i32>]) -> Matrix {
    write_csv(bm, name, rows);
    let mut matrix = Matrix::new(name, bm.config());
    matrix.load(bm).unwrap();
    matrix
}

fn read_all(bm: &BufferManager, matrix: &Matrix) -> Vec<Vec<i32>> {
    matrix.rows(bm).collect::<tilestore::Result<_>>().unwrap()
}

/// 5×5 of ones with m = 2: a 3×3 tile grid, symmetric, transpose a no-op.
#[test]
fn test_five_by_five_ones() {
    let (bm, _dir) = create_bm();
    let ones = vec![vec![1; 5]; 5];
    let mut matrix = load(&bm, "A", &ones);

    let tiling = *matrix.tiling().unwrap();
    assert_eq!(tiling.edge(), 2);
    assert_eq!(tiling.per_side(), 3);
    assert_eq!(matrix.block_count(), 9);
    assert_eq!(matrix.block_dims()[2], (2, 1));
    assert_eq!(matrix.block_dims()[6], (1, 2));
    assert_eq!(matrix.block_dims()[8], (1, 1));
    for index in 0..9 {
        assert!(bm.disk_manager().block_exists(&BlockKey::new("A", index)));
    }

    assert!(matrix.symmetry(&bm).unwrap());

    bm.report_stats();
    matrix.transpose(&bm).unwrap();
    assert_eq!(bm.report_stats().pages_accessed(), 0);
    assert_eq!(read_all(&bm, &matrix), ones);
}

/// Transposing twice restores the original.
#[test]
fn test_transpose_involution() {
    let (bm, _dir) = create_bm();
    let rows: Vec<Vec<i32>> = (0..7)
        .map(|r| (0..7).map(|c| r * 10 + c).collect())
        .collect();
    let mut matrix = load(&bm, "A", &rows);

    matrix.transpose(&bm).unwrap();
    assert_eq!(read_all(&bm, &matrix)[0], vec![0, 10, 20, 30, 40, 50, 60]);

    matrix.transpose(&bm).unwrap();
    assert_eq!(read_all(&bm, &matrix), rows);
}

/// compute writes A - Aᵀ and leaves A alone.
#[test]
fn test_compute_antisymmetric() {
    let (bm, _dir) = create_bm();
    let rows = vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]];
    let matrix = load(&bm, "A", &rows);

    let mut result = matrix.compute(&bm, "B").unwrap();

    assert_eq!(
        read_all(&bm, &result),
        vec![vec![0, -2, -4], vec![2, 0, -2], vec![4, 2, 0]]
    );
    assert_eq!(read_all(&bm, &matrix), rows);
    assert!(!result.symmetry(&bm).unwrap());
}

/// Export after a transpose writes the transposed rows.
#[test]
fn test_export_after_transpose() {
    let (bm, _dir) = create_bm();
    let mut matrix = load(&bm, "A", &[vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]);

    matrix.transpose(&bm).unwrap();
    matrix.rename(&bm, "AT");
    matrix.make_permanent(&bm).unwrap();

    assert_eq!(
        fs::read_to_string(bm.config().data_source("AT")).unwrap(),
        "1, 4, 7\n2, 5, 8\n3, 6, 9\n"
    );
    // The original source is untouched
    assert_eq!(
        fs::read_to_string(bm.config().data_source("A")).unwrap(),
        "1, 2, 3\n4, 5, 6\n7, 8, 9\n"
    );
}

/// Unloading through the catalog removes every tile and pool entry.
#[test]
fn test_unload_leaves_nothing_behind() {
    let (bm, _dir) = create_bm();
    let matrix = load(&bm, "A", &vec![vec![3; 4]; 4]);
    let result = matrix.compute(&bm, "B").unwrap();
    read_all(&bm, &result);

    let mut catalog = Catalog::new();
    catalog.insert_matrix(matrix).unwrap();
    catalog.insert_matrix(result).unwrap();
    assert_eq!(catalog.matrix_names(), vec!["A", "B"]);

    catalog.remove_matrix(&bm, "B").unwrap();
    assert!(!bm.caches_owner("B"));
    for index in 0..4 {
        assert!(!bm.disk_manager().block_exists(&BlockKey::new("B", index)));
        assert!(bm.disk_manager().block_exists(&BlockKey::new("A", index)));
    }
}

/// A page too small for one integer is refused up front.
#[test]
fn test_page_too_small() {
    init_logging();
    let dir = tempdir().unwrap();
    let config = EngineConfig::rooted_at(dir.path()).with_block_size_bytes(3);
    assert!(BufferManager::new(config).is_err());
}
