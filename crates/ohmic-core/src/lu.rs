//! LU decomposition with partial pivoting.
//!
//! The factorization is stored in place: the strictly lower triangle holds
//! the multipliers of the unit lower factor and the upper triangle holds `U`.

use crate::error::{Error, Result};
use crate::matrix::Matrix;

/// Below this many rows under the pivot, threads cost more than they save.
const PARALLEL_MIN_ROWS: usize = 64;

#[derive(Debug, Clone)]
pub struct LuDecomposition {
    lu: Matrix,
    perm: Vec<usize>,
    swaps: usize,
}

impl LuDecomposition {
    pub fn decompose(matrix: Matrix) -> Result<Self> {
        Self::decompose_parallel(matrix, 1)
    }

    /// Factor `matrix`, updating the rows below each pivot on up to
    /// `threads` scoped worker threads. The result does not depend on the
    /// thread count.
    pub fn decompose_parallel(mut matrix: Matrix, threads: usize) -> Result<Self> {
        let n = matrix.size();
        let mut perm: Vec<usize> = (0..n).collect();
        let mut swaps = 0;

        for k in 0..n {
            let pivot_row = (k..n)
                .max_by(|&a, &b| matrix[(a, k)].abs().total_cmp(&matrix[(b, k)].abs()))
                .unwrap_or(k);
            if pivot_row != k {
                matrix.swap_rows(pivot_row, k);
                perm.swap(pivot_row, k);
                swaps += 1;
            }

            let pivot = matrix[(k, k)];
            if pivot == 0.0 || !pivot.is_finite() {
                return Err(Error::SingularMatrix { pivot: k });
            }

            eliminate_below(&mut matrix, k, threads);
        }

        Ok(Self {
            lu: matrix,
            perm,
            swaps,
        })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.lu.size()
    }

    /// Solve `A x = rhs` for `x`.
    #[must_use]
    pub fn solve(&self, rhs: &[f64]) -> Vec<f64> {
        let n = self.size();
        let mut y: Vec<f64> = self.perm.iter().map(|&p| rhs[p]).collect();

        for i in 0..n {
            let row = self.lu.row(i);
            let s: f64 = row[..i].iter().zip(&y[..i]).map(|(a, b)| a * b).sum();
            y[i] -= s;
        }

        for i in (0..n).rev() {
            let row = self.lu.row(i);
            let s: f64 = row[i + 1..].iter().zip(&y[i + 1..]).map(|(a, b)| a * b).sum();
            y[i] = (y[i] - s) / row[i];
        }

        y
    }

    #[must_use]
    pub fn determinant(&self) -> f64 {
        let det: f64 = (0..self.size()).map(|i| self.lu[(i, i)]).product();
        if self.swaps % 2 == 0 {
            det
        } else {
            -det
        }
    }

    #[must_use]
    pub fn inverse(&self) -> Matrix {
        let n = self.size();
        let mut inv = Matrix::zeros(n);
        let mut unit = vec![0.0; n];
        for col in 0..n {
            unit[col] = 1.0;
            for (row, value) in self.solve(&unit).into_iter().enumerate() {
                inv[(row, col)] = value;
            }
            unit[col] = 0.0;
        }
        inv
    }
}

fn eliminate_below(matrix: &mut Matrix, k: usize, threads: usize) {
    let n = matrix.size();
    let remaining = n - k - 1;
    if remaining == 0 {
        return;
    }

    let (head, tail) = matrix.data_mut().split_at_mut((k + 1) * n);
    let pivot = &head[k * n..(k + 1) * n];

    if threads <= 1 || remaining < PARALLEL_MIN_ROWS {
        eliminate_rows(pivot, tail, n, k);
        return;
    }

    let rows_per_worker = remaining.div_ceil(threads);
    std::thread::scope(|scope| {
        for chunk in tail.chunks_mut(rows_per_worker * n) {
            scope.spawn(move || eliminate_rows(pivot, chunk, n, k));
        }
    });
}

fn eliminate_rows(pivot: &[f64], rows: &mut [f64], n: usize, k: usize) {
    for row in rows.chunks_mut(n) {
        let factor = row[k] / pivot[k];
        row[k] = factor;
        if factor.abs() > 0.0 {
            for (x, p) in row[k + 1..].iter_mut().zip(&pivot[k + 1..]) {
                *x -= factor * p;
            }
        }
    }
}
