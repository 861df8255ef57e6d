//! Dense square matrices and the vector helpers used by the solvers.

use serde::Serialize;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Dense row-major square matrix of `f64`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix {
    size: usize,
    data: Vec<f64>,
}

impl Matrix {
    #[must_use]
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            data: vec![0.0; size * size],
        }
    }

    #[must_use]
    pub fn identity(size: usize) -> Self {
        let mut m = Self::zeros(size);
        for i in 0..size {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Build a matrix from rows. Returns `None` if the rows are not square.
    #[must_use]
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let size = rows.len();
        if rows.iter().any(|r| r.len() != size) {
            return None;
        }
        Some(Self {
            size,
            data: rows.iter().flatten().copied().collect(),
        })
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self[(row, col)] += value;
    }

    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.size..(row + 1) * self.size]
    }

    pub fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let n = self.size;
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.data.split_at_mut(high * n);
        head[low * n..(low + 1) * n].swap_with_slice(&mut tail[..n]);
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Copy the entries of `other` into `self`. Both must have the same size.
    pub fn copy_from(&mut self, other: &Self) {
        self.data.copy_from_slice(&other.data);
    }

    #[must_use]
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        (0..self.size)
            .map(|i| self.row(i).iter().zip(v).map(|(a, b)| a * b).sum())
            .collect()
    }

    #[must_use]
    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.data.chunks(self.size.max(1)).map(<[f64]>::to_vec).collect()
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[row * self.size + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        &mut self.data[row * self.size + col]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.size {
            let cells: Vec<String> = self.row(i).iter().map(|v| format!("{v:>10.4}")).collect();
            writeln!(f, "[{}]", cells.join(" "))?;
        }
        Ok(())
    }
}

/// Euclidean norm.
#[must_use]
pub fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// `a - b` element-wise.
#[must_use]
pub fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// `x - scale * d` element-wise.
#[must_use]
pub fn step(x: &[f64], d: &[f64], scale: f64) -> Vec<f64> {
    x.iter().zip(d).map(|(x, d)| x - scale * d).collect()
}

/// Format a column vector, one value per line.
#[must_use]
pub fn format_vector(v: &[f64]) -> String {
    v.iter().map(|x| format!("[{x:>10.4}]\n")).collect()
}
