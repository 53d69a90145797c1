//! Weighted least squares solver.
//!
//! The peak fit solves two kinds of small linear problems:
//!
//! ```text
//! minimize Σ w_i (y_i - x_i^T β)^2
//! ```
//!
//! - once for the log-parabola seed (3 columns: 1, x, x²)
//! - once per Levenberg–Marquardt iteration for the parameter update
//!
//! Rows are scaled by `sqrt(w_i)` and the resulting ordinary problem is solved
//! with SVD, which copes with tall and near-singular design matrices.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Weighted variant: scales each row of `x` and `y` by `sqrt(w_i)`.
///
/// Rows with non-positive or non-finite weight are dropped.
pub fn solve_weighted_least_squares(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    w: &[f64],
) -> Option<DVector<f64>> {
    let rows: Vec<usize> = (0..x.nrows())
        .filter(|&i| w[i].is_finite() && w[i] > 0.0)
        .collect();
    if rows.len() < x.ncols() {
        return None;
    }

    let mut xs = DMatrix::zeros(rows.len(), x.ncols());
    let mut ys = DVector::zeros(rows.len());
    for (r, &i) in rows.iter().enumerate() {
        let s = w[i].sqrt();
        for c in 0..x.ncols() {
            xs[(r, c)] = x[(i, c)] * s;
        }
        ys[r] = y[i] * s;
    }

    solve_least_squares(&xs, &ys)
}
