//! Gaussian peak model.
//!
//! `g(x) = A * exp(-0.5 * ((x - μ) / σ)^2)`
//!
//! The fitter needs the value and the partial derivatives with respect to
//! `(A, μ, σ)` for the Jacobian of the residual vector.

/// Evaluate the Gaussian at `x`.
pub fn gaussian(x: f64, amplitude: f64, mean: f64, sigma: f64) -> f64 {
    let z = (x - mean) / sigma;
    amplitude * (-0.5 * z * z).exp()
}

/// Value and gradient `[∂g/∂A, ∂g/∂μ, ∂g/∂σ]` at `x`.
pub fn gaussian_with_gradient(x: f64, amplitude: f64, mean: f64, sigma: f64) -> (f64, [f64; 3]) {
    let z = (x - mean) / sigma;
    let e = (-0.5 * z * z).exp();
    let g = amplitude * e;
    (g, [e, g * z / sigma, g * z * z / sigma])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_value_is_amplitude() {
        assert!((gaussian(3.0, 7.5, 3.0, 2.0) - 7.5).abs() < 1e-12);
        let half = gaussian(3.0 + 2.0 * (2.0f64.ln() * 2.0).sqrt(), 7.5, 3.0, 2.0);
        assert!((half - 3.75).abs() < 1e-9, "half maximum: {half}");
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let (a, mu, s) = (120.0, 18.3, 2.7);
        let h = 1e-6;
        for &x in &[12.0, 18.0, 18.3, 21.5] {
            let (_, grad) = gaussian_with_gradient(x, a, mu, s);
            let num = [
                (gaussian(x, a + h, mu, s) - gaussian(x, a - h, mu, s)) / (2.0 * h),
                (gaussian(x, a, mu + h, s) - gaussian(x, a, mu - h, s)) / (2.0 * h),
                (gaussian(x, a, mu, s + h) - gaussian(x, a, mu, s - h)) / (2.0 * h),
            ];
            for k in 0..3 {
                assert!((grad[k] - num[k]).abs() < 1e-4, "x={x} k={k}: {} vs {}", grad[k], num[k]);
            }
        }
    }
}
