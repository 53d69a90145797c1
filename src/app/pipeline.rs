//! Shared pipeline logic used by the single-run and batch commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! calibration dump -> integrals -> weights -> spectrum -> rebin -> fit
//!
//! The commands can then focus on presentation (printing vs exporting).

use rayon::prelude::*;

use crate::calib::{Rebinned, derive_from_table, rebin};
use crate::domain::{
    Dataset, GaussianFit, IntegratedCalibration, PipelineConfig, RawSpectrumHistogram, WeightVector,
};
use crate::error::{AppError, CalibError};
use crate::fit::fit_gaussian;
use crate::io::{read_calibration, read_spectrum};
use crate::report::log_bin_widths;

/// All computed outputs of one calibration/spectrum pair.
#[derive(Debug, Clone)]
pub struct DatasetOutput {
    pub label: String,
    /// Charge steps in the calibration sweep.
    pub sweep_len: usize,
    pub integrated: IntegratedCalibration,
    pub weights: WeightVector,
    pub raw: RawSpectrumHistogram,
    pub rebinned: Rebinned,
    pub fit: Option<GaussianFit>,
}

/// Calibration side only: parse, integrate, derive weights.
pub fn derive_dataset_weights(
    dataset: &Dataset,
    config: &PipelineConfig,
) -> Result<(usize, IntegratedCalibration, WeightVector), AppError> {
    let table = read_calibration(&dataset.calibration, config.comparator_count, config.layout)?;
    let (integrated, weights) = derive_from_table(&table, config.weight_floor)
        .map_err(|e| AppError::from(e).context(&dataset.label))?;

    tracing::info!(
        dataset = %dataset.label,
        first = weights.as_slice()[1],
        last_interior = weights.as_slice()[config.comparator_count - 1],
        "weights derived"
    );
    Ok((table.sweep_len(), integrated, weights))
}

/// Run the full pipeline for one dataset.
pub fn run_dataset(dataset: &Dataset, config: &PipelineConfig, fit: bool) -> Result<DatasetOutput, AppError> {
    let (sweep_len, integrated, weights) = derive_dataset_weights(dataset, config)?;
    let raw = read_spectrum(&dataset.spectrum, config.comparator_count)?;

    process_spectrum(&dataset.label, sweep_len, integrated, weights, raw, config, fit)
        .map_err(|e| AppError::from(e).context(&dataset.label))
}

/// Rebin a histogrammed spectrum on derived weights and optionally fit it.
pub fn process_spectrum(
    label: &str,
    sweep_len: usize,
    integrated: IntegratedCalibration,
    weights: WeightVector,
    raw: RawSpectrumHistogram,
    config: &PipelineConfig,
    fit: bool,
) -> Result<DatasetOutput, CalibError> {
    if raw.bin_count() != config.comparator_count {
        return Err(CalibError::malformed(format!(
            "spectrum has {} bins, expected {}",
            raw.bin_count(),
            config.comparator_count
        )));
    }

    let rebinned = rebin(&raw.counts_f64(), weights.as_slice())?;
    log_bin_widths(label, &rebinned.diagnostics);

    let fit = if fit {
        let result = fit_gaussian(&rebinned.histogram, config.fit_range)?;
        tracing::info!(
            dataset = label,
            amplitude = result.amplitude,
            mean = result.mean,
            sigma = result.sigma,
            chi2 = result.chi2,
            ndf = result.ndf,
            "peak fitted"
        );
        Some(result)
    } else {
        None
    };

    Ok(DatasetOutput {
        label: label.to_string(),
        sweep_len,
        integrated,
        weights,
        raw,
        rebinned,
        fit,
    })
}

/// Run every dataset independently in parallel; results keep input order.
pub fn run_batch(
    datasets: &[Dataset],
    config: &PipelineConfig,
    fit: bool,
) -> Vec<(String, Result<DatasetOutput, AppError>)> {
    datasets
        .par_iter()
        .map(|d| (d.label.clone(), run_dataset(d, config, fit)))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::{SimulationConfig, dump_header, generate};
    use crate::io::{format_calibration, format_events};

    /// Counts `[10, 20, 30]` on the given edges, no fit.
    pub(crate) fn three_bin_output(edges: Vec<f64>) -> DatasetOutput {
        let config = PipelineConfig {
            comparator_count: 3,
            ..PipelineConfig::default()
        };
        let raw = RawSpectrumHistogram {
            counts: vec![10, 20, 30],
            underflow: 0,
            overflow: 0,
        };
        process_spectrum(
            "unit",
            4,
            IntegratedCalibration(vec![100, 50, 10]),
            WeightVector(edges),
            raw,
            &config,
            false,
        )
        .unwrap()
    }

    #[test]
    fn spectrum_is_rebinned_on_weights() {
        let output = three_bin_output(vec![0.5, 1.6, 2.5, 3.5]);
        let c = &output.rebinned.histogram.contents;
        assert!((c[0] - 9.09).abs() < 0.005);
        assert!((c[1] - 22.22).abs() < 0.005);
        assert!((c[2] - 30.0).abs() < 1e-12);
        assert!(output.fit.is_none());
    }

    #[test]
    fn bin_count_must_match_config() {
        let config = PipelineConfig::default();
        let err = process_spectrum(
            "unit",
            1,
            IntegratedCalibration(vec![2, 1]),
            WeightVector(vec![0.5, 1.5, 2.5]),
            RawSpectrumHistogram::empty(2),
            &config,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, CalibError::MalformedInput(_)));
    }

    fn write_synthetic(dir: &std::path::Path, seed: u64) -> Dataset {
        std::fs::create_dir_all(dir).unwrap();
        let sim = SimulationConfig {
            seed,
            events: 20_000,
            pulses_per_step: 50,
            sweep_step: 0.1,
            ..SimulationConfig::default()
        };
        let data = generate(&sim).unwrap();
        let calibration = dir.join("calibration.txt");
        let spectrum = dir.join("spectrum.txt");
        let layout = PipelineConfig::default().layout;
        std::fs::write(&calibration, format_calibration(&data.calibration, layout, &dump_header(&sim))).unwrap();
        std::fs::write(&spectrum, format_events(&data.events)).unwrap();
        Dataset {
            label: format!("seed{seed}"),
            calibration,
            spectrum,
            export: None,
        }
    }

    #[test]
    fn synthetic_dataset_runs_end_to_end() {
        let dir = std::env::temp_dir().join(format!("xycal-e2e-{}", std::process::id()));
        let dataset = write_synthetic(&dir, 3);
        let output = run_dataset(&dataset, &PipelineConfig::default(), true).unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        let w = output.weights.as_slice();
        assert_eq!(w.len(), 32);
        assert_eq!(w[0], 0.5);
        assert_eq!(w[31], 31.5);
        assert_eq!(output.raw.bin_count(), 31);

        let fit = output.fit.unwrap();
        assert!((fit.mean - 20.5).abs() < 2.0, "{fit:?}");
        assert!(fit.sigma > 0.5 && fit.sigma < 6.0, "{fit:?}");
    }

    #[test]
    fn batch_keeps_order_and_isolates_failures() {
        let dir = std::env::temp_dir().join(format!("xycal-batch-{}", std::process::id()));
        let good = write_synthetic(&dir.join("a"), 5);
        let missing = Dataset {
            label: "missing".to_string(),
            calibration: dir.join("nope.txt"),
            spectrum: dir.join("nope-either.txt"),
            export: None,
        };

        let results = run_batch(&[good, missing], &PipelineConfig::default(), false);
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "seed5");
        assert!(results[0].1.is_ok());
        assert_eq!(results[1].0, "missing");
        assert_eq!(results[1].1.as_ref().unwrap_err().exit_code(), 2);
    }
}
