//! Grid storage for the leapfrog solvers.
//!
//! [`Grid2`] is a flat row-major field with fixed dimensions. [`TimeLevels`]
//! owns the three time slices of one membrane and cycles their roles
//! (`prev`, `curr`, `next`) by index instead of moving data.

use std::ops::{Index, IndexMut};

/// A fixed-size 2D field of displacement values.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2 {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Grid2 {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Grid2 {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "grid index ({row}, {col}) out of bounds for {}x{} grid",
            self.rows,
            self.cols
        );
        row * self.cols + col
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        (row < self.rows && col < self.cols).then(|| self.data[row * self.cols + col])
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let start = self.offset(row, 0);
        &self.data[start..start + self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        let start = self.offset(row, 0);
        let cols = self.cols;
        &mut self.data[start..start + cols]
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn copy_from(&mut self, other: &Grid2) {
        assert_eq!(
            (self.rows, self.cols),
            (other.rows, other.cols),
            "grid dimensions must match"
        );
        self.data.copy_from_slice(&other.data);
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Largest absolute value in the field, or infinity if any cell is not finite.
    pub fn peak(&self) -> f64 {
        self.data
            .iter()
            .try_fold(0.0_f64, |peak, &v| v.is_finite().then(|| peak.max(v.abs())))
            .unwrap_or(f64::INFINITY)
    }
}

impl Index<(usize, usize)> for Grid2 {
    type Output = f64;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[self.offset(row, col)]
    }
}

impl IndexMut<(usize, usize)> for Grid2 {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        let i = self.offset(row, col);
        &mut self.data[i]
    }
}

/// Three time slices of the same field with rotating roles.
///
/// Slot `curr` holds time t; `curr + 1` (mod 3) is the scratch slice for
/// t + Δt and `curr + 2` (mod 3) holds t − Δt. Advancing time is a single
/// index update once the scratch slice has been filled.
#[derive(Debug, Clone)]
pub struct TimeLevels {
    slices: [Grid2; 3],
    curr: usize,
}

impl TimeLevels {
    pub fn new(rows: usize, cols: usize) -> Self {
        TimeLevels {
            slices: [
                Grid2::zeros(rows, cols),
                Grid2::zeros(rows, cols),
                Grid2::zeros(rows, cols),
            ],
            curr: 0,
        }
    }

    pub fn prev(&self) -> &Grid2 {
        &self.slices[(self.curr + 2) % 3]
    }

    pub fn curr(&self) -> &Grid2 {
        &self.slices[self.curr]
    }

    /// Borrow `(prev, curr, next)` for one update pass.
    pub fn split(&mut self) -> (&Grid2, &Grid2, &mut Grid2) {
        let [s0, s1, s2] = &mut self.slices;
        match self.curr {
            0 => (&*s2, &*s0, s1),
            1 => (&*s0, &*s1, s2),
            _ => (&*s1, &*s2, s0),
        }
    }

    /// `prev ← curr`, `curr ← next`.
    pub fn rotate(&mut self) {
        self.curr = (self.curr + 1) % 3;
    }

    /// Write an initial displacement into `curr` and copy it to `prev`
    /// (zero initial velocity). The scratch slice is cleared.
    pub fn seed(&mut self, mut f: impl FnMut(&mut Grid2)) {
        let (_, _, scratch) = self.split();
        scratch.fill(0.0);
        f(&mut self.slices[self.curr]);
        let [s0, s1, s2] = &mut self.slices;
        match self.curr {
            0 => s2.copy_from(s0),
            1 => s0.copy_from(s1),
            _ => s1.copy_from(s2),
        }
    }

    pub fn clear(&mut self) {
        for slice in &mut self.slices {
            slice.fill(0.0);
        }
    }
}
