//! Batch manifest: the list of calibration/spectrum pairs to process.
//!
//! ```json
//! {
//!   "datasets": [
//!     { "label": "201119_143946",
//!       "calibration": "data/outputcal_201119_143946.txt",
//!       "spectrum": "data/XYTER_201119_143946_for7200s.txt",
//!       "export": "results/241Am_201119_143946.json" }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::Dataset;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub datasets: Vec<Dataset>,
}

impl Manifest {
    /// Make every relative path absolute with respect to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for d in &mut self.datasets {
            join(&mut d.calibration);
            join(&mut d.spectrum);
            if let Some(export) = d.export.as_mut() {
                join(export);
            }
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.datasets.is_empty() {
            return Err(AppError::new(2, "Manifest lists no datasets."));
        }
        let mut seen = HashSet::new();
        for d in &self.datasets {
            if !seen.insert(d.label.as_str()) {
                return Err(AppError::new(2, format!("Duplicate dataset label '{}' in manifest.", d.label)));
            }
        }
        Ok(())
    }
}

/// Parse a manifest from JSON text.
pub fn parse_manifest(text: &str) -> Result<Manifest, AppError> {
    let manifest: Manifest =
        serde_json::from_str(text).map_err(|e| AppError::new(2, format!("Invalid manifest JSON: {e}")))?;
    manifest.validate()?;
    Ok(manifest)
}

/// Read a manifest file and resolve its paths.
pub fn read_manifest(path: &Path) -> Result<Manifest, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open manifest '{}': {e}", path.display())))?;
    let mut manifest: Manifest =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid manifest JSON: {e}")))?;
    manifest.validate()?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    manifest.resolve_paths(base);
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = r#"{
        "datasets": [
            { "label": "a", "calibration": "cal_a.txt", "spectrum": "/abs/spec_a.txt" },
            { "label": "b", "calibration": "cal_b.txt", "spectrum": "spec_b.txt", "export": "out/b.json" }
        ]
    }"#;

    #[test]
    fn parses_datasets_with_optional_export() {
        let m = parse_manifest(TEXT).unwrap();
        assert_eq!(m.datasets.len(), 2);
        assert_eq!(m.datasets[0].export, None);
        assert_eq!(m.datasets[1].export, Some(PathBuf::from("out/b.json")));
    }

    #[test]
    fn relative_paths_follow_manifest_dir() {
        let mut m = parse_manifest(TEXT).unwrap();
        m.resolve_paths(Path::new("/data/run1"));
        assert_eq!(m.datasets[0].calibration, PathBuf::from("/data/run1/cal_a.txt"));
        assert_eq!(m.datasets[0].spectrum, PathBuf::from("/abs/spec_a.txt"));
        assert_eq!(m.datasets[1].export, Some(PathBuf::from("/data/run1/out/b.json")));
    }

    #[test]
    fn empty_or_duplicate_manifests_are_rejected() {
        assert!(parse_manifest(r#"{ "datasets": [] }"#).is_err());

        let dup = r#"{ "datasets": [
            { "label": "a", "calibration": "c", "spectrum": "s" },
            { "label": "a", "calibration": "c2", "spectrum": "s2" }
        ] }"#;
        let err = parse_manifest(dup).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }
}
