//! Page - the in-memory form of one block.
//!
//! A [`Page`] holds the populated rows of a block together with its
//! [`PageKind`]. Pages live inside buffer pool frames and are converted to
//! and from block files by [`Page::to_bytes`] / [`Page::from_bytes`].

use super::page_header::{PageHeader, PageKind};

/// The populated contents of one block.
///
/// Every row is exactly `col_count` integers wide. The owner and block index
/// are not stored here; they belong to the frame (or the
/// [`BlockKey`](crate::BlockKey)) holding the page.
///
/// # Example
/// ```
/// use tilestore::{Page, PageKind};
///
/// let page = Page::new(PageKind::Matrix, vec![vec![1, 2], vec![3, 4]], 2);
/// assert_eq!(page.cell(1, 0), Some(3));
/// assert_eq!(page.transposed(), vec![vec![1, 3], vec![2, 4]]);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Page {
    kind: PageKind,
    col_count: usize,
    rows: Vec<Vec<i32>>,
}

impl Page {
    /// Build a page from rows, keeping the first `col_count` values of each.
    ///
    /// Rows produced by tile slicing may be wider than the populated width
    /// (the grid buffer is always `m` wide), so extra values are dropped.
    ///
    /// # Panics
    /// Panics if a row is narrower than `col_count`.
    pub fn new(kind: PageKind, mut rows: Vec<Vec<i32>>, col_count: usize) -> Self {
        for row in &mut rows {
            assert!(row.len() >= col_count, "row narrower than col_count");
            row.truncate(col_count);
        }
        Self {
            kind,
            col_count,
            rows,
        }
    }

    /// An empty page, used for unoccupied frames.
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn kind(&self) -> PageKind {
        self.kind
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn col_count(&self) -> usize {
        self.col_count
    }

    /// Number of integers the page populates.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len() * self.col_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows(&self) -> &[Vec<i32>] {
        &self.rows
    }

    pub fn row(&self, row: usize) -> Option<&[i32]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<i32> {
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Overwrite one cell. Returns false if it lies outside the page.
    pub fn set_cell(&mut self, row: usize, col: usize, value: i32) -> bool {
        match self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Replace the page contents, keeping its kind.
    pub fn replace_rows(&mut self, rows: Vec<Vec<i32>>, col_count: usize) {
        *self = Self::new(self.kind, rows, col_count);
    }

    /// The contents transposed (`col_count` rows of `row_count` values).
    pub fn transposed(&self) -> Vec<Vec<i32>> {
        (0..self.col_count)
            .map(|c| self.rows.iter().map(|row| row[c]).collect())
            .collect()
    }

    /// Transpose a square page without reallocating.
    ///
    /// # Panics
    /// Panics if the page is not square.
    pub fn transpose_in_place(&mut self) {
        let n = self.row_count();
        assert_eq!(n, self.col_count, "in-place transpose needs a square page");
        for r in 0..n {
            for c in (r + 1)..n {
                let upper = self.rows[r][c];
                self.rows[r][c] = self.rows[c][r];
                self.rows[c][r] = upper;
            }
        }
    }

    /// Serialize into the block file format (header + row-major `i32`s).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; PageHeader::SIZE + self.len() * 4];

        let mut offset = PageHeader::SIZE;
        for value in self.rows.iter().flatten() {
            bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
            offset += 4;
        }

        let mut header =
            PageHeader::new(self.kind, self.row_count() as u32, self.col_count as u32);
        header.write_to(&mut bytes);
        header.checksum = PageHeader::compute_checksum(&bytes);
        header.write_to(&mut bytes);

        bytes
    }

    /// Parse a block file. Returns `None` if the bytes are truncated, the
    /// lengths disagree with the header or the checksum fails.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let header = PageHeader::from_bytes(bytes)?;
        let row_count = header.row_count as usize;
        let col_count = header.col_count as usize;

        if bytes.len() != PageHeader::SIZE + row_count * col_count * 4 {
            return None;
        }
        if !header.verify_checksum(bytes) {
            return None;
        }

        let mut values = bytes[PageHeader::SIZE..]
            .chunks_exact(4)
            .map(|chunk| i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));

        let rows = (0..row_count)
            .map(|_| values.by_ref().take(col_count).collect())
            .collect();

        Some(Self {
            kind: header.kind,
            col_count,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Page {
        Page::new(PageKind::Table, vec![vec![1, -2, 3], vec![4, 5, i32::MIN]], 3)
    }

    #[test]
    fn test_new_truncates_wide_rows() {
        let page = Page::new(PageKind::Matrix, vec![vec![1, 2, 9], vec![3, 4, 9]], 2);
        assert_eq!(page.rows(), &[vec![1, 2], vec![3, 4]]);
        assert_eq!(page.len(), 4);
    }

    #[test]
    fn test_cell_access() {
        let page = sample();
        assert_eq!(page.cell(0, 1), Some(-2));
        assert_eq!(page.cell(2, 0), None);
        assert_eq!(page.cell(0, 3), None);
        assert_eq!(page.row(1), Some(&[4, 5, i32::MIN][..]));
    }

    #[test]
    fn test_set_cell() {
        let mut page = sample();
        assert!(page.set_cell(1, 1, 50));
        assert_eq!(page.cell(1, 1), Some(50));
        assert!(!page.set_cell(5, 0, 1));
    }

    #[test]
    fn test_transpose_in_place() {
        let mut page = Page::new(
            PageKind::Matrix,
            vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]],
            3,
        );
        page.transpose_in_place();
        assert_eq!(page.rows(), &[vec![1, 4, 7], vec![2, 5, 8], vec![3, 6, 9]]);
    }

    #[test]
    fn test_transposed_rectangular() {
        let page = sample();
        assert_eq!(
            page.transposed(),
            vec![vec![1, 4], vec![-2, 5], vec![3, i32::MIN]]
        );
    }

    #[test]
    fn test_block_bytes() {
        let page = sample();
        let bytes = page.to_bytes();
        assert_eq!(bytes.len(), PageHeader::SIZE + 6 * 4);
        assert_eq!(Page::from_bytes(&bytes), Some(page));
    }

    #[test]
    fn test_corrupted_bytes_rejected() {
        let mut bytes = sample().to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert_eq!(Page::from_bytes(&bytes), None);

        let bytes = sample().to_bytes();
        assert_eq!(Page::from_bytes(&bytes[..bytes.len() - 4]), None);
    }

    #[test]
    fn test_empty_page_bytes() {
        let page = Page::new(PageKind::Table, Vec::new(), 4);
        let restored = Page::from_bytes(&page.to_bytes()).unwrap();
        assert_eq!(restored.row_count(), 0);
        assert_eq!(restored.col_count(), 4);
        assert!(restored.is_empty());
    }
}
