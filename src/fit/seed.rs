//! Starting values for the Gaussian fit.
//!
//! A Gaussian is a parabola in log space:
//!
//! `ln g(x) = ln A - (x - μ)² / (2σ²) = a + b·x + c·x²`
//!
//! so a weighted linear fit of `ln y` gives closed-form estimates whenever the
//! curvature `c` is negative. Otherwise we fall back to the weighted moments of
//! the selected bins.

use nalgebra::{DMatrix, DVector};

use crate::fit::gaussian::FitPoint;
use crate::math::solve_weighted_least_squares;

/// Initial `(amplitude, mean, sigma)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seed {
    pub amplitude: f64,
    pub mean: f64,
    pub sigma: f64,
}

pub fn seed(points: &[FitPoint]) -> Option<Seed> {
    log_parabola(points).or_else(|| moments(points))
}

fn log_parabola(points: &[FitPoint]) -> Option<Seed> {
    if points.len() < 3 {
        return None;
    }

    let n = points.len();
    let mut x = DMatrix::zeros(n, 3);
    let mut y = DVector::zeros(n);
    // var(ln y) ≈ var(y) / y² = 1 / y for Poisson-like bins.
    let mut w = Vec::with_capacity(n);
    for (i, p) in points.iter().enumerate() {
        x[(i, 0)] = 1.0;
        x[(i, 1)] = p.x;
        x[(i, 2)] = p.x * p.x;
        y[i] = p.y.ln();
        w.push(p.y);
    }

    let beta = solve_weighted_least_squares(&x, &y, &w)?;
    let (a, b, c) = (beta[0], beta[1], beta[2]);
    if !(c < 0.0) {
        return None;
    }

    let sigma = (-1.0 / (2.0 * c)).sqrt();
    let mean = -b / (2.0 * c);
    let amplitude = (a - b * b / (4.0 * c)).exp();
    let seed = Seed {
        amplitude,
        mean,
        sigma,
    };
    is_usable(&seed).then_some(seed)
}

fn moments(points: &[FitPoint]) -> Option<Seed> {
    let total: f64 = points.iter().map(|p| p.y).sum();
    if !(total > 0.0) {
        return None;
    }

    let mean = points.iter().map(|p| p.y * p.x).sum::<f64>() / total;
    let var = points
        .iter()
        .map(|p| p.y * (p.x - mean) * (p.x - mean))
        .sum::<f64>()
        / total;
    let amplitude = points.iter().map(|p| p.y).fold(0.0, f64::max);

    let seed = Seed {
        amplitude,
        mean,
        sigma: var.sqrt(),
    };
    is_usable(&seed).then_some(seed)
}

fn is_usable(seed: &Seed) -> bool {
    seed.amplitude.is_finite()
        && seed.amplitude > 0.0
        && seed.mean.is_finite()
        && seed.sigma.is_finite()
        && seed.sigma > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::gaussian;

    fn points(f: impl Fn(f64) -> f64, xs: &[f64]) -> Vec<FitPoint> {
        xs.iter()
            .map(|&x| {
                let y = f(x);
                FitPoint { x, y, w: 1.0 / y }
            })
            .collect()
    }

    #[test]
    fn exact_gaussian_is_recovered_in_closed_form() {
        let xs: Vec<f64> = (10..=26).map(|v| v as f64).collect();
        let pts = points(|x| gaussian(x, 300.0, 17.5, 2.5), &xs);
        let s = seed(&pts).unwrap();
        assert!((s.amplitude - 300.0).abs() < 1e-6);
        assert!((s.mean - 17.5).abs() < 1e-9);
        assert!((s.sigma - 2.5).abs() < 1e-9);
    }

    #[test]
    fn convex_data_falls_back_to_moments() {
        // A valley: log curvature is positive, so the parabola has no peak.
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let pts = points(|x| 1.0 + (x - 3.0) * (x - 3.0), &xs);
        let s = seed(&pts).unwrap();
        assert!((s.mean - 3.0).abs() < 1e-12);
        assert_eq!(s.amplitude, 5.0);
        assert!(s.sigma > 0.0);
    }
}
