//! Block header and page kind definitions.
//!
//! Every block file starts with a [`PageHeader`] containing:
//! - [`PageKind`] discriminator
//! - CRC32 checksum for integrity
//! - populated row and column counts

/// What kind of owner a page belongs to.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Uninitialized or unrecognized page.
    #[default]
    Invalid = 0,
    /// A run of row-major table rows.
    Table = 1,
    /// One square tile of a matrix.
    Matrix = 2,
}

impl PageKind {
    /// Convert from u8, returning Invalid for unknown values.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PageKind::Table,
            2 => PageKind::Matrix,
            _ => PageKind::Invalid,
        }
    }
}

/// Metadata stored at the beginning of every block file.
///
/// # Layout (13 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     kind (PageKind as u8)
/// 1       4     checksum (CRC32, little-endian)
/// 5       4     row_count (little-endian)
/// 9       4     col_count (little-endian)
/// ```
///
/// The checksum covers the whole file with the checksum field itself set to
/// zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub kind: PageKind,
    pub checksum: u32,
    pub row_count: u32,
    pub col_count: u32,
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 13;

    pub const OFFSET_KIND: usize = 0;
    pub const OFFSET_CHECKSUM: usize = 1;
    pub const OFFSET_ROW_COUNT: usize = 5;
    pub const OFFSET_COL_COUNT: usize = 9;

    /// Create a header with a zero checksum.
    pub fn new(kind: PageKind, row_count: u32, col_count: u32) -> Self {
        Self {
            kind,
            checksum: 0,
            row_count,
            col_count,
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// Returns `None` if `data` is shorter than [`PageHeader::SIZE`].
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }

        let read_u32 = |offset: usize| {
            u32::from_le_bytes([
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ])
        };

        Some(Self {
            kind: PageKind::from_u8(data[Self::OFFSET_KIND]),
            checksum: read_u32(Self::OFFSET_CHECKSUM),
            row_count: read_u32(Self::OFFSET_ROW_COUNT),
            col_count: read_u32(Self::OFFSET_COL_COUNT),
        })
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        data[Self::OFFSET_KIND] = self.kind as u8;
        data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&self.checksum.to_le_bytes());
        data[Self::OFFSET_ROW_COUNT..Self::OFFSET_ROW_COUNT + 4]
            .copy_from_slice(&self.row_count.to_le_bytes());
        data[Self::OFFSET_COL_COUNT..Self::OFFSET_COL_COUNT + 4]
            .copy_from_slice(&self.col_count.to_le_bytes());
    }

    /// Compute the CRC32 of a serialized block, skipping the checksum field.
    pub fn compute_checksum(block: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&block[..Self::OFFSET_CHECKSUM]);
        hasher.update(&[0u8; 4]);
        hasher.update(&block[Self::OFFSET_CHECKSUM + 4..]);
        hasher.finalize()
    }

    /// Whether the stored checksum matches the block contents.
    pub fn verify_checksum(&self, block: &[u8]) -> bool {
        self.checksum == Self::compute_checksum(block)
    }
}
