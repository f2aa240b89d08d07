//! Small linear-algebra utilities for covariance validation.

use ndarray::Array2;

/// Cholesky decomposition of a symmetric matrix.
///
/// Returns the lower-triangular factor `L` with `M = L * L^T`, or `None`
/// if the matrix is not strictly positive-definite.
pub fn cholesky(matrix: &Array2<f64>) -> Option<Array2<f64>> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return None;
    }
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = matrix[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[[i, j]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Whether a symmetric matrix is strictly positive-definite.
///
/// Uses a Cholesky attempt, which succeeds exactly when all eigenvalues
/// are strictly positive.
pub fn is_positive_definite(matrix: &Array2<f64>) -> bool {
    cholesky(matrix).is_some()
}
