use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Dense row-major `f64` matrix: the design matrix handed to estimators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

// ─── Construction ───────────────────────────────────────────────────────────

impl Matrix {
    /// Create a matrix from flat row-major data.
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> CoreResult<Self> {
        if data.len() != rows * cols {
            return Err(CoreError::ShapeMismatch {
                expected: (rows, cols),
                got: (data.len(), 1),
            });
        }
        Ok(Matrix { data, rows, cols })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Create a matrix from nested rows. All rows must have equal length.
    pub fn from_rows(rows: &[Vec<f64>]) -> CoreResult<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(CoreError::ShapeMismatch {
                    expected: (rows.len(), cols),
                    got: (rows.len(), row.len()),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Matrix {
            data,
            rows: rows.len(),
            cols,
        })
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.rows).map(|i| self.get(i, col)).collect()
    }

    /// Gather rows by index into a new matrix.
    pub fn select_rows(&self, indices: &[usize]) -> CoreResult<Matrix> {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            if i >= self.rows {
                return Err(CoreError::IndexOutOfBounds {
                    row: i,
                    col: 0,
                    rows: self.rows,
                    cols: self.cols,
                });
            }
            data.extend_from_slice(self.row(i));
        }
        Ok(Matrix {
            data,
            rows: indices.len(),
            cols: self.cols,
        })
    }

    /// Append a leading column of ones (intercept term).
    pub fn with_intercept(&self) -> Matrix {
        let cols = self.cols + 1;
        let mut data = Vec::with_capacity(self.rows * cols);
        for i in 0..self.rows {
            data.push(1.0);
            data.extend_from_slice(self.row(i));
        }
        Matrix {
            data,
            rows: self.rows,
            cols,
        }
    }

    // ─── Products ───────────────────────────────────────────────────────────

    /// XᵀX as a `cols x cols` matrix.
    pub fn gram(&self) -> Matrix {
        let p = self.cols;
        let mut out = Matrix::zeros(p, p);
        for i in 0..self.rows {
            let r = self.row(i);
            for a in 0..p {
                let ra = r[a];
                if ra == 0.0 {
                    continue;
                }
                for b in a..p {
                    out.data[a * p + b] += ra * r[b];
                }
            }
        }
        for a in 0..p {
            for b in 0..a {
                out.data[a * p + b] = out.data[b * p + a];
            }
        }
        out
    }

    /// Xᵀy for a target vector of length `rows`.
    pub fn t_dot(&self, y: &[f64]) -> CoreResult<Vec<f64>> {
        if y.len() != self.rows {
            return Err(CoreError::ShapeMismatch {
                expected: (self.rows, 1),
                got: (y.len(), 1),
            });
        }
        let mut out = vec![0.0; self.cols];
        for (i, &yi) in y.iter().enumerate() {
            for (o, &x) in out.iter_mut().zip(self.row(i)) {
                *o += x * yi;
            }
        }
        Ok(out)
    }

    /// Xw for a weight vector of length `cols`.
    pub fn dot(&self, w: &[f64]) -> CoreResult<Vec<f64>> {
        if w.len() != self.cols {
            return Err(CoreError::ShapeMismatch {
                expected: (self.cols, 1),
                got: (w.len(), 1),
            });
        }
        Ok((0..self.rows)
            .map(|i| self.row(i).iter().zip(w).map(|(x, w)| x * w).sum())
            .collect())
    }
}
