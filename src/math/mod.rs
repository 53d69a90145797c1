//! Mathematical utilities: Gaussian model and least squares.

pub mod gauss;
pub mod ols;

pub use gauss::*;
pub use ols::*;
