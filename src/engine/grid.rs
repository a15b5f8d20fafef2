// Square row-major grid storage.
// Flat layout is kept so slices can go straight to the GPU or an image upload;
// callers address cells by (row, col) instead of hand-written index math.

use std::ops::{Index, IndexMut};

/// A `side × side` arena of cells stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    side:  usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Build a grid by evaluating `f(row, col)` for every cell in row-major order.
    pub fn from_fn(side: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut cells = Vec::with_capacity(side * side);
        for row in 0..side {
            for col in 0..side {
                cells.push(f(row, col));
            }
        }
        Self { side, cells }
    }

    pub fn side(&self) -> usize { self.side }

    pub fn len(&self) -> usize { self.cells.len() }

    /// Flat index of `(row, col)`.
    #[inline]
    pub fn flat_index(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.side && col < self.side, "cell ({row}, {col}) outside {0}x{0} grid", self.side);
        row * self.side + col
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.side && col < self.side {
            self.cells.get(row * self.side + col)
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[T] { &self.cells }

    /// Cells of the first row, left to right.
    pub fn first_row(&self) -> &[T] { &self.cells[..self.side] }

    /// Cells of the last row, left to right.
    pub fn last_row(&self) -> &[T] {
        let start = self.side.saturating_sub(1) * self.side;
        &self.cells[start..]
    }

    /// Cells of column `col`, top to bottom.
    pub fn column(&self, col: usize) -> impl Iterator<Item = &T> + '_ {
        self.cells.iter().skip(col).step_by(self.side.max(1))
    }
}

impl<T: Clone> Grid<T> {
    pub fn filled(side: usize, value: T) -> Self {
        Self { side, cells: vec![value; side * side] }
    }

    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        &self.cells[self.flat_index(row, col)]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        let idx = self.flat_index(row, col);
        &mut self.cells[idx]
    }
}
