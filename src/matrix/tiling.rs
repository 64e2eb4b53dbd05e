//! Tile geometry of a block-decomposed matrix.

use crate::common::{Error, Result};

/// How an N×N matrix is cut into square tiles of edge `m`.
///
/// Tiles are numbered row-major over the tile grid:
/// ```text
///            tile col 0   tile col 1   tile col 2
/// tile row 0 [  Page0  ]  [  Page1  ]  [Page2]
/// tile row 1 [  Page3  ]  [  Page4  ]  [Page5]
/// tile row 2 [  Page6  ]  [  Page7  ]  [Page8]   <- N mod m rows tall
/// ```
/// Every tile is m×m except those in the last tile row/column, which are cut
/// to `N mod m` when it is nonzero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tiling {
    dimension: usize,
    edge: usize,
    per_side: usize,
}

impl Tiling {
    /// Choose the largest tile edge whose square fits in `capacity`
    /// integers.
    ///
    /// # Errors
    /// `Error::TileTooLarge` if not even a 1×1 tile fits.
    pub fn for_capacity(capacity: usize, dimension: usize) -> Result<Self> {
        let edge = integer_sqrt(capacity);
        if edge == 0 {
            return Err(Error::TileTooLarge { capacity });
        }
        Ok(Self {
            dimension,
            edge,
            per_side: dimension.div_ceil(edge),
        })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Tile edge length `m`.
    #[inline]
    pub fn edge(&self) -> usize {
        self.edge
    }

    /// Number of tile rows (= tile columns).
    #[inline]
    pub fn per_side(&self) -> usize {
        self.per_side
    }

    /// Total number of tiles.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.per_side * self.per_side
    }

    /// Block index of the tile at tile coordinates `(i, j)`.
    #[inline]
    pub fn block_index(&self, i: usize, j: usize) -> usize {
        i * self.per_side + j
    }

    /// Tile coordinates of a block index.
    #[inline]
    pub fn coordinates(&self, index: usize) -> (usize, usize) {
        (index / self.per_side, index % self.per_side)
    }

    /// Populated rows of tiles in tile row `i`.
    pub fn tile_rows(&self, i: usize) -> usize {
        self.extent(i)
    }

    /// Populated columns of tiles in tile column `j`.
    pub fn tile_cols(&self, j: usize) -> usize {
        self.extent(j)
    }

    /// `(rows, cols)` of every tile in block order.
    pub fn block_dims(&self) -> Vec<(usize, usize)> {
        (0..self.block_count())
            .map(|index| {
                let (i, j) = self.coordinates(index);
                (self.tile_rows(i), self.tile_cols(j))
            })
            .collect()
    }

    fn extent(&self, tile: usize) -> usize {
        let remainder = self.dimension % self.edge;
        if tile + 1 == self.per_side && remainder != 0 {
            remainder
        } else {
            self.edge
        }
    }
}

/// Largest `m` with `m * m <= n`.
fn integer_sqrt(n: usize) -> usize {
    let mut m = (n as f64).sqrt() as usize;
    // Correct for floating point rounding in either direction
    while (m + 1) * (m + 1) <= n {
        m += 1;
    }
    while m * m > n {
        m -= 1;
    }
    m
}
