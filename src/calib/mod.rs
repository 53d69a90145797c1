//! Calibration core.
//!
//! - derive bin-edge weights from S-curve integrals (`weights`)
//! - rebin a uniform spectrum onto those edges with width normalization (`rebin`)

pub mod rebin;
pub mod weights;

pub use rebin::*;
pub use weights::*;
