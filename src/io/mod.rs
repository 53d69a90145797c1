//! Input/output helpers.
//!
//! - calibration dump parsing (`calibration`)
//! - spectrum event lists (`spectrum`)
//! - per-bin CSV export (`export`)
//! - spectrum JSON read/write (`spectrum_file`)
//! - batch manifests (`manifest`)

pub mod calibration;
pub mod export;
pub mod manifest;
pub mod spectrum;
pub mod spectrum_file;

pub use calibration::*;
pub use export::*;
pub use manifest::*;
pub use spectrum::*;
pub use spectrum_file::*;
