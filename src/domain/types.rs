//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between the pipeline stages
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of comparators on the XYTER readout chip.
pub const DEFAULT_COMPARATORS: usize = 31;

/// Minimum step between two consecutive interior bin edges.
pub const DEFAULT_WEIGHT_FLOOR: f64 = 0.1;

/// ADC range of the Am-241 photo peak used by the default fit.
pub const DEFAULT_FIT_RANGE: FitRange = FitRange { lo: 11.0, hi: 30.0 };

/// Per-comparator raw S-curve samples, as read from a calibration dump.
///
/// `samples[i]` belongs to comparator `i + 1`. Every comparator has the same
/// number of samples (one per charge step of the sweep).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCalibrationTable {
    pub samples: Vec<Vec<i64>>,
}

impl RawCalibrationTable {
    pub fn comparator_count(&self) -> usize {
        self.samples.len()
    }

    /// Number of charge steps (rows) in the sweep.
    pub fn sweep_len(&self) -> usize {
        self.samples.first().map(Vec::len).unwrap_or(0)
    }
}

/// One S-curve integral per comparator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegratedCalibration(pub Vec<i64>);

impl IntegratedCalibration {
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `N + 1` bin edges anchored at `0.5` and `N + 0.5`.
///
/// Interior edges increase by at least the weight floor. The last interval is
/// whatever remains up to the fixed upper edge, so it can be narrow or negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightVector(pub Vec<f64>);

impl WeightVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Number of bins (`N`) described by these edges.
    pub fn bin_count(&self) -> usize {
        self.0.len().saturating_sub(1)
    }
}

/// Uniform histogram over `[0.5, N + 0.5]`, one bin per ADC code `1..=N`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSpectrumHistogram {
    pub counts: Vec<u64>,
    /// Entries below `0.5`.
    pub underflow: u64,
    /// Entries at or above `N + 0.5`.
    pub overflow: u64,
}

impl RawSpectrumHistogram {
    pub fn empty(bins: usize) -> Self {
        Self {
            counts: vec![0; bins],
            underflow: 0,
            overflow: 0,
        }
    }

    pub fn bin_count(&self) -> usize {
        self.counts.len()
    }

    /// Increment the bin holding ADC code `adc`.
    ///
    /// Bin `k` (0-based) covers `[k + 0.5, k + 1.5)`, so integer codes land in
    /// bin `adc - 1`.
    pub fn fill(&mut self, adc: i64) {
        let n = self.counts.len() as i64;
        if adc < 1 {
            self.underflow += 1;
        } else if adc > n {
            self.overflow += 1;
        } else {
            self.counts[(adc - 1) as usize] += 1;
        }
    }

    /// Entries inside the axis range.
    pub fn entries(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn counts_f64(&self) -> Vec<f64> {
        self.counts.iter().map(|&c| c as f64).collect()
    }
}

/// Histogram with explicit non-uniform edges and width-normalized contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebinnedSpectrumHistogram {
    pub edges: Vec<f64>,
    pub contents: Vec<f64>,
}

impl RebinnedSpectrumHistogram {
    pub fn bin_count(&self) -> usize {
        self.contents.len()
    }

    pub fn bin_low(&self, i: usize) -> f64 {
        self.edges[i]
    }

    pub fn bin_high(&self, i: usize) -> f64 {
        self.edges[i + 1]
    }

    pub fn bin_center(&self, i: usize) -> f64 {
        0.5 * (self.edges[i] + self.edges[i + 1])
    }
}

/// Effective width of one rebinned bin, as reported by the rebinner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinWidth {
    /// ADC code (1-based).
    pub adc: usize,
    /// Width actually used as the divisor.
    pub width: f64,
    /// The raw edge difference was exactly zero and was replaced by 1.
    pub degenerate: bool,
    /// The raw edge difference was negative.
    pub non_monotonic: bool,
}

/// Per-bin width report returned alongside a rebinned histogram.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RebinDiagnostics {
    pub widths: Vec<BinWidth>,
}

impl RebinDiagnostics {
    pub fn degenerate_bins(&self) -> impl Iterator<Item = &BinWidth> {
        self.widths.iter().filter(|w| w.degenerate)
    }

    pub fn non_monotonic_bins(&self) -> impl Iterator<Item = &BinWidth> {
        self.widths.iter().filter(|w| w.non_monotonic)
    }
}

/// Closed ADC interval used to select bins for the peak fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitRange {
    pub lo: f64,
    pub hi: f64,
}

impl FitRange {
    pub fn contains(&self, x: f64) -> bool {
        x >= self.lo && x <= self.hi
    }
}

/// Result of the single-Gaussian peak fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianFit {
    pub amplitude: f64,
    pub mean: f64,
    pub sigma: f64,
    pub chi2: f64,
    /// Degrees of freedom (`bins used - 3`).
    pub ndf: usize,
    pub iterations: usize,
    pub range: FitRange,
}

impl GaussianFit {
    pub fn evaluate(&self, x: f64) -> f64 {
        crate::math::gaussian(x, self.amplitude, self.mean, self.sigma)
    }
}

/// Fixed layout of the calibration dump text format.
///
/// The counts of comparator `i` (0-based) sit in token `last_column - i`, so the
/// columns are stored in reverse comparator order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpLayout {
    pub header_lines: usize,
    pub last_column: usize,
}

impl Default for DumpLayout {
    fn default() -> Self {
        Self {
            header_lines: 32,
            last_column: 32,
        }
    }
}

/// Configuration shared by every stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub comparator_count: usize,
    pub weight_floor: f64,
    pub fit_range: FitRange,
    pub layout: DumpLayout,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            comparator_count: DEFAULT_COMPARATORS,
            weight_floor: DEFAULT_WEIGHT_FLOOR,
            fit_range: DEFAULT_FIT_RANGE,
            layout: DumpLayout::default(),
        }
    }
}

/// One calibration/spectrum pair to process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Short name used in reports and logs.
    pub label: String,
    pub calibration: PathBuf,
    pub spectrum: PathBuf,
    /// Optional JSON output for this dataset.
    #[serde(default)]
    pub export: Option<PathBuf>,
}

/// Presentation options for a `run`.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub fit: bool,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub export_json: Option<PathBuf>,
    pub export_csv: Option<PathBuf>,
}

/// A saved spectrum file (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumFile {
    pub tool: String,
    pub label: String,
    pub generated: DateTime<Utc>,
    pub config: PipelineConfig,
    pub integrated: IntegratedCalibration,
    pub weights: WeightVector,
    pub widths: Vec<BinWidth>,
    pub raw: RawSpectrumHistogram,
    pub rebinned: RebinnedSpectrumHistogram,
    pub fit: Option<GaussianFit>,
}
