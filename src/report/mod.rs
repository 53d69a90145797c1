//! Reporting: terminal formatting and diagnostic log output.

pub mod format;

pub use format::*;

use crate::domain::RebinDiagnostics;

/// Log every effective bin width; zero-width and decreasing edges are warnings.
pub fn log_bin_widths(label: &str, diagnostics: &RebinDiagnostics) {
    for w in &diagnostics.widths {
        tracing::info!(dataset = label, adc = w.adc, width = w.width, "bin width");
        if w.degenerate {
            tracing::warn!(dataset = label, adc = w.adc, "zero bin width replaced by 1");
        }
        if w.non_monotonic {
            tracing::warn!(
                dataset = label,
                adc = w.adc,
                width = w.width,
                "non-monotonic bin edges"
            );
        }
    }
}
