//! Single-Gaussian peak fit over a bin range.
//!
//! Given a rebinned spectrum and an ADC range:
//!
//! - select bins whose center lies inside the range
//! - skip empty bins and weight the rest by `1 / content` (Poisson variance)
//! - seed `(A, μ, σ)` from a log-parabola (see `seed`)
//! - minimize χ² with Levenberg–Marquardt
//!
//! Each LM step solves the damped normal equations as an augmented least
//! squares problem, so the same SVD solver handles both the seed and the
//! updates.

use nalgebra::{DMatrix, DVector};

use crate::domain::{FitRange, GaussianFit, RebinnedSpectrumHistogram};
use crate::error::CalibError;
use crate::fit::seed::seed;
use crate::math::{gaussian, gaussian_with_gradient, solve_least_squares};

const MAX_ITERATIONS: usize = 200;
const LAMBDA_START: f64 = 1e-3;
const LAMBDA_MAX: f64 = 1e12;
const REL_TOL: f64 = 1e-10;
const PRECISION_FLOOR: f64 = 1e-20;

/// One histogram bin taking part in the fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitPoint {
    pub x: f64,
    pub y: f64,
    /// Inverse variance.
    pub w: f64,
}

/// Collect the bins that take part in a fit over `range`.
pub fn select_points(hist: &RebinnedSpectrumHistogram, range: FitRange) -> Vec<FitPoint> {
    (0..hist.bin_count())
        .filter_map(|i| {
            let x = hist.bin_center(i);
            let y = hist.contents[i];
            (range.contains(x) && y.is_finite() && y > 0.0).then(|| FitPoint { x, y, w: 1.0 / y })
        })
        .collect()
}

/// Fit `A * exp(-0.5 * ((x - μ) / σ)^2)` to the bins inside `range`.
pub fn fit_gaussian(
    hist: &RebinnedSpectrumHistogram,
    range: FitRange,
) -> Result<GaussianFit, CalibError> {
    if !(range.lo.is_finite() && range.hi.is_finite() && range.hi > range.lo) {
        return Err(CalibError::malformed(format!(
            "invalid fit range [{}, {}]",
            range.lo, range.hi
        )));
    }

    let points = select_points(hist, range);
    if points.len() < 3 {
        return Err(CalibError::Fit(format!(
            "need at least 3 non-empty bins in [{}, {}], found {}",
            range.lo,
            range.hi,
            points.len()
        )));
    }

    let start = seed(&points)
        .ok_or_else(|| CalibError::Fit("could not estimate starting values".to_string()))?;
    tracing::debug!(
        amplitude = start.amplitude,
        mean = start.mean,
        sigma = start.sigma,
        bins = points.len(),
        "gaussian fit seeded"
    );

    let mut params = [start.amplitude, start.mean, start.sigma];
    let mut chi2 = chi_square(&points, &params);
    let mut lambda = LAMBDA_START;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < MAX_ITERATIONS {
        iterations += 1;

        let Some(delta) = lm_step(&points, &params, lambda) else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                converged = at_precision_floor(&points, chi2);
                break;
            }
            continue;
        };

        let trial = [
            params[0] + delta[0],
            params[1] + delta[1],
            params[2] + delta[2],
        ];
        let trial_chi2 = chi_square(&points, &trial);

        if trial_chi2.is_finite() && trial_chi2 <= chi2 {
            let improvement = chi2 - trial_chi2;
            params = trial;
            chi2 = trial_chi2;
            lambda = (lambda / 10.0).max(1e-12);
            if improvement <= REL_TOL * chi2.max(f64::MIN_POSITIVE) {
                converged = true;
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                converged = at_precision_floor(&points, chi2);
                break;
            }
        }
    }

    if !converged {
        tracing::debug!(
            amplitude = params[0],
            mean = params[1],
            sigma = params[2],
            chi2,
            iterations,
            "gaussian fit did not converge"
        );
        return Err(CalibError::Fit(format!(
            "no convergence after {iterations} iterations"
        )));
    }

    let [amplitude, mean, sigma] = params;
    let sigma = sigma.abs();
    if !(amplitude.is_finite() && mean.is_finite() && sigma.is_finite() && sigma > 0.0) {
        return Err(CalibError::Fit(format!(
            "fit diverged (A={amplitude}, mean={mean}, sigma={sigma})"
        )));
    }

    if !range.contains(mean) {
        return Err(CalibError::Fit(format!(
            "fitted mean {mean} lies outside [{}, {}]",
            range.lo, range.hi
        )));
    }
    if sigma > range.hi - range.lo {
        return Err(CalibError::Fit(format!(
            "fitted sigma {sigma} is wider than the fit range [{}, {}]",
            range.lo, range.hi
        )));
    }

    tracing::debug!(amplitude, mean, sigma, chi2, iterations, "gaussian fit finished");

    Ok(GaussianFit {
        amplitude,
        mean,
        sigma,
        chi2,
        ndf: points.len() - 3,
        iterations,
        range,
    })
}

/// No step can lower χ² any further because it already sits at rounding level.
fn at_precision_floor(points: &[FitPoint], chi2: f64) -> bool {
    let scale: f64 = points.iter().map(|p| p.w * p.y * p.y).sum();
    chi2 <= PRECISION_FLOOR * scale
}

fn chi_square(points: &[FitPoint], p: &[f64; 3]) -> f64 {
    points
        .iter()
        .map(|pt| {
            let r = pt.y - gaussian(pt.x, p[0], p[1], p[2]);
            pt.w * r * r
        })
        .sum()
}

/// Solve `(JᵀWJ + λ·diag(JᵀWJ)) δ = JᵀW r` via the stacked system
/// `[√W·J ; √(λ·d)] δ = [√W·r ; 0]`.
fn lm_step(points: &[FitPoint], p: &[f64; 3], lambda: f64) -> Option<DVector<f64>> {
    let n = points.len();
    let mut a = DMatrix::zeros(n + 3, 3);
    let mut b = DVector::zeros(n + 3);
    let mut diag = [0.0f64; 3];

    for (i, pt) in points.iter().enumerate() {
        let (g, grad) = gaussian_with_gradient(pt.x, p[0], p[1], p[2]);
        let s = pt.w.sqrt();
        for k in 0..3 {
            a[(i, k)] = s * grad[k];
            diag[k] += pt.w * grad[k] * grad[k];
        }
        b[i] = s * (pt.y - g);
    }
    for k in 0..3 {
        a[(n + k, k)] = (lambda * diag[k].max(1e-12)).sqrt();
    }

    solve_least_squares(&a, &b)
}
