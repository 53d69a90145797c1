//! Gaussian peak fitting of rebinned spectra.
//!
//! Responsibilities:
//!
//! - pick the bins inside the fit range
//! - estimate starting values
//! - run the χ² minimization

pub mod gaussian;
pub mod seed;

pub use gaussian::*;
pub use seed::*;
