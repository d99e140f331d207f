//! Skyline (profile) Cholesky solver
//!
//! Stringer-panel stiffness matrices are banded once nodes are numbered by
//! ascending position, so storing each row from its first non-zero entry to
//! the diagonal keeps the factor compact. The factor is computed once and
//! reused for every correction of a load step.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Cholesky factor `L Lᵀ` stored row-wise in skyline form
#[derive(Debug, Clone)]
pub struct SkylineCholesky {
    size: usize,
    // For each row, entries from the first non-zero column up to the diagonal
    rows: Vec<Vec<f64>>,
    // Distance from the diagonal to the first non-zero column of each row
    heights: Vec<usize>,
    factorized: bool,
}

/// Failure of the skyline factorization
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SkylineError {
    /// A non-positive pivot was found at the given row
    #[error("matrix is not positive definite (pivot {pivot:.3e} at DOF {row})")]
    NotPositiveDefinite { row: usize, pivot: f64 },
}

impl SkylineCholesky {
    /// Build the skyline profile from the lower triangle of a symmetric matrix
    pub fn from_dense(k: &DMatrix<f64>) -> Self {
        let size = k.nrows();

        let heights: Vec<usize> = (0..size)
            .map(|row| {
                (0..row)
                    .find(|&col| k[(row, col)] != 0.0)
                    .map_or(0, |first| row - first)
            })
            .collect();

        let rows = heights
            .iter()
            .enumerate()
            .map(|(row, &h)| ((row - h)..=row).map(|col| k[(row, col)]).collect())
            .collect();

        Self {
            size,
            rows,
            heights,
            factorized: false,
        }
    }

    /// Number of stored coefficients
    pub fn stored_entries(&self) -> usize {
        self.rows.iter().map(|r| r.len()).sum()
    }

    #[inline]
    fn first_col(&self, row: usize) -> usize {
        row - self.heights[row]
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> f64 {
        let start = self.first_col(row);
        if col < start || col > row {
            return 0.0;
        }
        self.rows[row][col - start]
    }

    /// Factorize in place
    pub fn factorize(&mut self) -> Result<(), SkylineError> {
        let scale = (0..self.size)
            .map(|i| self.get(i, i).abs())
            .fold(0.0_f64, f64::max)
            .max(f64::MIN_POSITIVE);

        for i in 0..self.size {
            let start_i = self.first_col(i);

            for j in start_i..i {
                let start = start_i.max(self.first_col(j));
                let sum: f64 = (start..j).map(|k| self.get(i, k) * self.get(j, k)).sum();
                let value = (self.get(i, j) - sum) / self.get(j, j);
                self.rows[i][j - start_i] = value;
            }

            let sum: f64 = (start_i..i).map(|k| self.get(i, k).powi(2)).sum();
            let pivot = self.get(i, i) - sum;
            if pivot <= 1e-13 * scale || !pivot.is_finite() {
                return Err(SkylineError::NotPositiveDefinite { row: i, pivot });
            }
            self.rows[i][i - start_i] = pivot.sqrt();
        }

        self.factorized = true;
        Ok(())
    }

    /// Solve `L Lᵀ x = b` with a previously factorized matrix
    pub fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        debug_assert!(self.factorized, "skyline solve before factorize");
        let mut x = b.clone();

        // L y = b
        for i in 0..self.size {
            let sum: f64 = (self.first_col(i)..i).map(|j| self.get(i, j) * x[j]).sum();
            x[i] = (x[i] - sum) / self.get(i, i);
        }

        // Lᵀ x = y
        for i in (0..self.size).rev() {
            x[i] /= self.get(i, i);
            let xi = x[i];
            for j in self.first_col(i)..i {
                x[j] -= self.get(i, j) * xi;
            }
        }

        x
    }
}
