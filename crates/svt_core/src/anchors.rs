//! Edge-inclusive anchor lattice.
//!
//! Anchors are block origins strided by the block overlap. The last valid row
//! and column (`extent - block_size`) are always part of the lattice, so every
//! pixel of the frame is covered by at least one block.

/// Anchor lattice over a `(rows, cols)` frame, enumerated row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorGrid {
    rows: Vec<usize>,
    cols: Vec<usize>,
    block_size: usize,
}

/// Anchor coordinates along one axis: `0, stride, 2*stride, ...` plus the
/// last valid origin if the stride skips it.
fn lattice_axis(extent: usize, block_size: usize, stride: usize) -> Vec<usize> {
    if block_size == 0 || extent < block_size {
        return Vec::new();
    }
    let last = extent - block_size;
    let mut coords: Vec<usize> = (0..=last).step_by(stride.max(1)).collect();
    if coords.last() != Some(&last) {
        coords.push(last);
    }
    coords
}

impl AnchorGrid {
    pub fn new(frame_dim: (usize, usize), block_size: usize, stride: usize) -> Self {
        Self {
            rows: lattice_axis(frame_dim.0, block_size, stride),
            cols: lattice_axis(frame_dim.1, block_size, stride),
            block_size,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len() * self.cols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Anchor row coordinates, ascending.
    pub fn row_coords(&self) -> &[usize] {
        &self.rows
    }

    /// Anchor column coordinates, ascending.
    pub fn col_coords(&self) -> &[usize] {
        &self.cols
    }

    /// `(row, col)` origin of the anchor at `index`.
    #[inline]
    pub fn position(&self, index: usize) -> (usize, usize) {
        let n_cols = self.cols.len();
        (self.rows[index / n_cols], self.cols[index % n_cols])
    }

    /// Lattice column of the anchor at `index` (0 for the first column).
    #[inline]
    pub fn column_of(&self, index: usize) -> usize {
        index % self.cols.len()
    }

    /// Index of the anchor at `(row, col)`, if it belongs to the lattice.
    pub fn index_of(&self, row: usize, col: usize) -> Option<usize> {
        let r = self.rows.binary_search(&row).ok()?;
        let c = self.cols.binary_search(&col).ok()?;
        Some(r * self.cols.len() + c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows
            .iter()
            .flat_map(move |&r| self.cols.iter().map(move |&c| (r, c)))
    }
}
