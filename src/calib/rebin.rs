//! Width-normalized rebinning onto the derived edges.
//!
//! A bin that the calibration shows to be narrower than one ADC unit collects
//! fewer events than its neighbours for the same underlying density. Dividing
//! each raw count by the bin's effective width turns counts into a density that
//! is comparable across bins.
//!
//! The computation is pure; the per-bin widths come back as `RebinDiagnostics`
//! and the caller decides how to report them.

use crate::domain::{BinWidth, RebinDiagnostics, RebinnedSpectrumHistogram};
use crate::error::CalibError;

/// Rebinned histogram plus the widths used to build it.
#[derive(Debug, Clone, PartialEq)]
pub struct Rebinned {
    pub histogram: RebinnedSpectrumHistogram,
    pub diagnostics: RebinDiagnostics,
}

/// Effective width of the bin between two edges.
///
/// An exactly-zero difference is replaced by `1` so the division stays finite.
pub fn effective_width(lo: f64, hi: f64) -> BinWidth {
    let raw = hi - lo;
    let degenerate = raw == 0.0;
    BinWidth {
        adc: 0,
        width: if degenerate { 1.0 } else { raw },
        degenerate,
        non_monotonic: raw < 0.0,
    }
}

/// Divide each raw count by the width of its bin on `weights`.
///
/// `weights` must hold one more entry than `raw_counts`. Monotonicity is not
/// re-checked here; decreasing edges are reported through
/// `BinWidth::non_monotonic`.
pub fn rebin(raw_counts: &[f64], weights: &[f64]) -> Result<Rebinned, CalibError> {
    if raw_counts.is_empty() {
        return Err(CalibError::malformed("cannot rebin an empty spectrum"));
    }
    if weights.len() != raw_counts.len() + 1 {
        return Err(CalibError::malformed(format!(
            "{} bins need {} edges, got {}",
            raw_counts.len(),
            raw_counts.len() + 1,
            weights.len()
        )));
    }

    let mut contents = Vec::with_capacity(raw_counts.len());
    let mut widths = Vec::with_capacity(raw_counts.len());
    for (i, &count) in raw_counts.iter().enumerate() {
        let mut width = effective_width(weights[i], weights[i + 1]);
        width.adc = i + 1;
        contents.push(count / width.width);
        widths.push(width);
    }

    Ok(Rebinned {
        histogram: RebinnedSpectrumHistogram {
            edges: weights.to_vec(),
            contents,
        },
        diagnostics: RebinDiagnostics { widths },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_are_divided_by_width() {
        let out = rebin(&[10.0, 20.0, 30.0], &[0.5, 1.6, 2.5, 3.5]).unwrap();
        let c = &out.histogram.contents;
        assert!((c[0] - 9.090909).abs() < 1e-5);
        assert!((c[1] - 22.222222).abs() < 1e-5);
        assert!((c[2] - 30.0).abs() < 1e-12);

        let widths: Vec<f64> = out.diagnostics.widths.iter().map(|w| w.width).collect();
        assert!((widths[0] - 1.1).abs() < 1e-12);
        assert!((widths[1] - 0.9).abs() < 1e-12);
        assert!((widths[2] - 1.0).abs() < 1e-12);
        assert_eq!(out.diagnostics.widths[2].adc, 3);
    }

    #[test]
    fn content_times_width_recovers_count() {
        let raw = [3.0, 0.0, 17.0, 250.0, 4.0];
        let edges = [0.5, 0.73, 2.0, 2.1, 4.9, 5.5];
        let out = rebin(&raw, &edges).unwrap();
        for i in 0..raw.len() {
            let width = edges[i + 1] - edges[i];
            assert!((out.histogram.contents[i] * width - raw[i]).abs() < 1e-9);
        }
        assert_eq!(out.histogram.edges, edges.to_vec());
    }

    #[test]
    fn zero_width_uses_unit_divisor() {
        let out = rebin(&[5.0, 8.0], &[0.5, 0.5, 2.5]).unwrap();
        assert_eq!(out.histogram.contents[0], 5.0);
        assert!(out.diagnostics.widths[0].degenerate);
        assert_eq!(out.diagnostics.degenerate_bins().count(), 1);
        assert!(out.histogram.contents.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn decreasing_edges_are_flagged_not_nan() {
        let out = rebin(&[4.0, 6.0, 2.0], &[0.5, 1.5, 1.0, 3.5]).unwrap();
        assert!(out.diagnostics.widths[1].non_monotonic);
        assert_eq!(out.diagnostics.non_monotonic_bins().count(), 1);
        assert!(out.histogram.contents.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(matches!(
            rebin(&[1.0, 2.0], &[0.5, 1.5]),
            Err(CalibError::MalformedInput(_))
        ));
        assert!(matches!(rebin(&[], &[0.5]), Err(CalibError::MalformedInput(_))));
    }

    #[test]
    fn bin_geometry_follows_edges() {
        let out = rebin(&[1.0, 1.0], &[0.5, 1.0, 2.5]).unwrap();
        let h = &out.histogram;
        assert_eq!(h.bin_count(), 2);
        assert_eq!(h.bin_low(1), 1.0);
        assert_eq!(h.bin_high(1), 2.5);
        assert!((h.bin_center(1) - 1.75).abs() < 1e-12);
    }
}
