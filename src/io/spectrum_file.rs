//! Read/write spectrum JSON files.
//!
//! Spectrum JSON is the portable result of one dataset:
//! - pipeline configuration and S-curve integrals
//! - derived edges and the width of every bin
//! - raw and rebinned contents
//! - the peak fit, when one was run
//!
//! The schema is defined by `domain::SpectrumFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::app::pipeline::DatasetOutput;
use crate::domain::{PipelineConfig, SpectrumFile};
use crate::error::AppError;

pub const TOOL_NAME: &str = "xycal";

/// Assemble the saved representation of a pipeline run.
pub fn spectrum_file(output: &DatasetOutput, config: &PipelineConfig) -> SpectrumFile {
    SpectrumFile {
        tool: TOOL_NAME.to_string(),
        label: output.label.clone(),
        generated: Utc::now(),
        config: config.clone(),
        integrated: output.integrated.clone(),
        weights: output.weights.clone(),
        widths: output.rebinned.diagnostics.widths.clone(),
        raw: output.raw.clone(),
        rebinned: output.rebinned.histogram.clone(),
        fit: output.fit.clone(),
    }
}

/// Write a spectrum JSON file.
pub fn write_spectrum_json(path: &Path, spectrum: &SpectrumFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create spectrum JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, spectrum)
        .map_err(|e| AppError::new(2, format!("Failed to write spectrum JSON: {e}")))?;

    tracing::info!(path = %path.display(), label = %spectrum.label, "spectrum exported");
    Ok(())
}

/// Read a spectrum JSON file.
pub fn read_spectrum_json(path: &Path) -> Result<SpectrumFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open spectrum JSON '{}': {e}", path.display())))?;
    let spectrum: SpectrumFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid spectrum JSON: {e}")))?;

    if spectrum.rebinned.edges.len() != spectrum.rebinned.contents.len() + 1 {
        return Err(AppError::new(
            2,
            format!(
                "Invalid spectrum JSON: {} edges for {} bins",
                spectrum.rebinned.edges.len(),
                spectrum.rebinned.contents.len()
            ),
        ));
    }
    Ok(spectrum)
}
