//! Small dense linear algebra for the normal equations.
//!
//! Matrices here are at most 6x6, so plain loops are used throughout.

use ndarray::{Array1, Array2};

/// Rotation budget per matrix dimension squared for the Jacobi solver.
const JACOBI_ITERATIONS_PER_ENTRY: usize = 50;

/// Off-diagonal magnitude below which the Jacobi iteration stops.
const JACOBI_TOLERANCE: f64 = 1e-15;

/// Scale a symmetric matrix to unit diagonal: `D^-1/2 A D^-1/2`.
///
/// Returns the scaled matrix and the `D^-1/2` factors, or the index of the
/// first non-positive diagonal entry.
pub(crate) fn scale_to_unit_diagonal(a: &Array2<f64>) -> Result<(Array2<f64>, Array1<f64>), usize> {
    let n = a.nrows();
    let mut inv_sqrt = Array1::<f64>::zeros(n);
    for i in 0..n {
        let d = a[[i, i]];
        if d <= 0.0 || !d.is_finite() {
            return Err(i);
        }
        inv_sqrt[i] = 1.0 / d.sqrt();
    }

    let mut scaled = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            scaled[[i, j]] = a[[i, j]] * inv_sqrt[i] * inv_sqrt[j];
        }
    }
    Ok((scaled, inv_sqrt))
}

/// Undo [`scale_to_unit_diagonal`] on an inverse: `D^-1/2 S^-1 D^-1/2`.
pub(crate) fn unscale_inverse(s_inv: &Array2<f64>, inv_sqrt: &Array1<f64>) -> Array2<f64> {
    let n = s_inv.nrows();
    let mut out = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            out[[i, j]] = s_inv[[i, j]] * inv_sqrt[i] * inv_sqrt[j];
        }
    }
    out
}

/// Eigenvalues of a symmetric matrix by Jacobi rotations, descending.
pub(crate) fn symmetric_eigenvalues(matrix: &Array2<f64>) -> Array1<f64> {
    let n = matrix.nrows();
    let mut a = matrix.clone();

    for _ in 0..JACOBI_ITERATIONS_PER_ENTRY * n * n {
        let (p, q, apq) = largest_off_diagonal(&a);
        if apq.abs() < JACOBI_TOLERANCE {
            break;
        }
        let (cos_theta, sin_theta) = rotation(a[[p, p]], a[[q, q]], apq);
        rotate(&mut a, p, q, cos_theta, sin_theta);
    }

    let mut eigenvalues: Vec<f64> = (0..n).map(|i| a[[i, i]]).collect();
    eigenvalues.sort_by(|x, y| y.partial_cmp(x).unwrap_or(std::cmp::Ordering::Equal));
    Array1::from(eigenvalues)
}

/// Ratio of the smallest to the largest eigenvalue of a symmetric positive
/// semi-definite matrix. Zero (or negative round-off) means singular.
pub(crate) fn reciprocal_condition(matrix: &Array2<f64>) -> f64 {
    let eigenvalues = symmetric_eigenvalues(matrix);
    let max = eigenvalues.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    if max <= 0.0 || !max.is_finite() { 0.0 } else { (min / max).max(0.0) }
}

/// Invert a square matrix by Gauss-Jordan elimination with partial pivoting.
///
/// Returns `None` when a pivot falls below `pivot_tolerance`.
pub(crate) fn invert(a: &Array2<f64>, pivot_tolerance: f64) -> Option<Array2<f64>> {
    let n = a.nrows();
    if n == 0 || a.ncols() != n {
        return None;
    }

    // Augmented matrix [A | I]
    let mut aug = Array2::<f64>::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut pivot_row = col;
        let mut pivot_val = aug[[col, col]].abs();
        for row in (col + 1)..n {
            if aug[[row, col]].abs() > pivot_val {
                pivot_val = aug[[row, col]].abs();
                pivot_row = row;
            }
        }

        if pivot_val < pivot_tolerance || !pivot_val.is_finite() {
            return None;
        }

        if pivot_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [pivot_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[[row, col]];
            if factor != 0.0 {
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    let mut inverse = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            inverse[[i, j]] = aug[[i, n + j]];
        }
    }
    Some(inverse)
}

fn largest_off_diagonal(matrix: &Array2<f64>) -> (usize, usize, f64) {
    let n = matrix.nrows();
    let mut max_val = 0.0;
    let mut p = 0;
    let mut q = usize::from(n > 1);

    for i in 0..n {
        for j in (i + 1)..n {
            let val = matrix[[i, j]].abs();
            if val > max_val {
                max_val = val;
                p = i;
                q = j;
            }
        }
    }

    if n < 2 { (0, 0, 0.0) } else { (p, q, matrix[[p, q]]) }
}

/// (cos, sin) of the rotation that annihilates `a[p][q]`.
fn rotation(app: f64, aqq: f64, apq: f64) -> (f64, f64) {
    let tau = (aqq - app) / (2.0 * apq);
    let t = if tau >= 0.0 {
        1.0 / (tau + (1.0 + tau * tau).sqrt())
    } else {
        -1.0 / (-tau + (1.0 + tau * tau).sqrt())
    };
    let cos_theta = 1.0 / (1.0 + t * t).sqrt();
    (cos_theta, t * cos_theta)
}

fn rotate(a: &mut Array2<f64>, p: usize, q: usize, cos_theta: f64, sin_theta: f64) {
    let n = a.nrows();
    let app = a[[p, p]];
    let aqq = a[[q, q]];
    let apq = a[[p, q]];
    let (c, s) = (cos_theta, sin_theta);

    a[[p, p]] = c * c * app - 2.0 * c * s * apq + s * s * aqq;
    a[[q, q]] = s * s * app + 2.0 * c * s * apq + c * c * aqq;
    a[[p, q]] = 0.0;
    a[[q, p]] = 0.0;

    for i in 0..n {
        if i != p && i != q {
            let aip = a[[i, p]];
            let aiq = a[[i, q]];
            a[[i, p]] = c * aip - s * aiq;
            a[[p, i]] = a[[i, p]];
            a[[i, q]] = s * aip + c * aiq;
            a[[q, i]] = a[[i, q]];
        }
    }
}
