//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - calibration inputs (`RawCalibrationTable`, `IntegratedCalibration`)
//! - derived bin edges (`WeightVector`)
//! - raw and rebinned spectra plus rebinning diagnostics
//! - fit outputs and the pipeline configuration

pub mod types;

pub use types::*;
