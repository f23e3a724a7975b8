use canvalytics_core::Matrix;
use thiserror::Error;

/// Pivots smaller than this fraction of the largest diagonal entry count as zero.
const RELATIVE_PIVOT_TOL: f64 = 1e-12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LinalgError {
    #[error("Singular matrix: cannot invert or decompose")]
    SingularMatrix,

    #[error("Matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
}

/// LU decomposition with partial pivoting, stored compactly.
struct Lu {
    lu: Vec<f64>,
    pivot: Vec<usize>,
    n: usize,
}

fn lu(a: &Matrix) -> Result<Lu, LinalgError> {
    let n = a.rows();
    if n != a.cols() {
        return Err(LinalgError::NotSquare {
            rows: a.rows(),
            cols: a.cols(),
        });
    }
    let scale = (0..n).map(|i| a.get(i, i).abs()).fold(0.0_f64, f64::max).max(1.0);
    let tol = scale * RELATIVE_PIVOT_TOL;

    let mut lu = a.data().to_vec();
    let mut pivot: Vec<usize> = (0..n).collect();

    for k in 0..n {
        // Partial pivoting: largest magnitude in column k at or below the diagonal
        let (p, max) = (k..n)
            .map(|i| (i, lu[i * n + k].abs()))
            .fold((k, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best });
        if max <= tol {
            return Err(LinalgError::SingularMatrix);
        }
        if p != k {
            for j in 0..n {
                lu.swap(k * n + j, p * n + j);
            }
            pivot.swap(k, p);
        }
        let diag = lu[k * n + k];
        for i in (k + 1)..n {
            let factor = lu[i * n + k] / diag;
            lu[i * n + k] = factor;
            for j in (k + 1)..n {
                lu[i * n + j] -= factor * lu[k * n + j];
            }
        }
    }

    Ok(Lu { lu, pivot, n })
}

/// Solve the linear system Ax = b using LU decomposition.
pub fn solve(a: &Matrix, b: &[f64]) -> Result<Vec<f64>, LinalgError> {
    if b.len() != a.rows() {
        return Err(LinalgError::DimensionMismatch(format!(
            "solve: b has {} elements but A is {}x{}",
            b.len(),
            a.rows(),
            a.cols()
        )));
    }
    let Lu { lu, pivot, n } = lu(a)?;

    // Forward substitution: L * y = Pb
    let mut y = vec![0.0; n];
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| lu[i * n + j] * y[j]).sum();
        y[i] = b[pivot[i]] - sum;
    }

    // Back substitution: U * x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| lu[i * n + j] * x[j]).sum();
        x[i] = (y[i] - sum) / lu[i * n + i];
    }
    Ok(x)
}

/// Solve `(A + λI)x = b`, leaving the first `skip` diagonal entries unpenalized.
pub fn solve_regularized(
    a: &Matrix,
    b: &[f64],
    lambda: f64,
    skip: usize,
) -> Result<Vec<f64>, LinalgError> {
    let mut reg = a.clone();
    for i in skip..a.rows().min(a.cols()) {
        reg.set(i, i, reg.get(i, i) + lambda);
    }
    solve(&reg, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_solve() {
        // 2x + y = 5
        // x + 3y = 7
        // Solution: x=1.6, y=1.8
        let a = Matrix::new(vec![2.0, 1.0, 1.0, 3.0], 2, 2).unwrap();
        let x = solve(&a, &[5.0, 7.0]).unwrap();
        assert_abs_diff_eq!(x[0], 1.6, epsilon = 1e-10);
        assert_abs_diff_eq!(x[1], 1.8, epsilon = 1e-10);
    }

    #[test]
    fn test_solve_needs_pivoting() {
        let a = Matrix::new(vec![0.0, 1.0, 1.0, 0.0], 2, 2).unwrap();
        let x = solve(&a, &[2.0, 3.0]).unwrap();
        assert_abs_diff_eq!(x[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_detected() {
        let a = Matrix::new(vec![1.0, 2.0, 2.0, 4.0], 2, 2).unwrap();
        assert_eq!(solve(&a, &[1.0, 2.0]), Err(LinalgError::SingularMatrix));
        // A ridge term makes it solvable
        assert!(solve_regularized(&a, &[1.0, 2.0], 1e-3, 0).is_ok());
    }

    #[test]
    fn test_not_square() {
        let a = Matrix::zeros(2, 3);
        assert!(matches!(solve(&a, &[0.0, 0.0]), Err(LinalgError::NotSquare { .. })));
    }
}
