//! `xyter-calib` library crate.
//!
//! The binary (`xycal`) is a thin wrapper around this library so that:
//!
//! - the calibration core is testable without spawning processes
//! - weights and rebinning are reusable from other analysis code
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod calib;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod observe;
pub mod plot;
pub mod report;
