//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - reads calibration dumps and spectra
//! - derives weights, rebins and fits
//! - prints reports/plots
//! - writes optional exports

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::cli::{BatchArgs, CalibrationArgs, Command, FitArgs, PlotArgs, RunArgs, SimulateArgs, WeightsArgs};
use crate::data::{SimulationConfig, dump_header, generate};
use crate::domain::{Dataset, FitRange, PipelineConfig, RunOptions};
use crate::error::AppError;
use crate::io::{Manifest, format_calibration, format_events, spectrum_file};
use crate::observe::{LogConfig, init_logging};
use pipeline::DatasetOutput;

pub mod pipeline;

/// Entry point for the `xycal` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    // `.env` may carry RUST_LOG; load it before the filter reads the environment.
    dotenvy::dotenv().ok();
    init_logging(&LogConfig {
        level: cli.log_level,
        format: cli.log_format,
    });

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Weights(args) => handle_weights(args),
        Command::Batch(args) => handle_batch(args),
        Command::Plot(args) => handle_plot(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.calib, &args.fit)?;
    let options = run_options_from_args(&args);
    let dataset = Dataset {
        label: args.label.clone().unwrap_or_else(|| label_from_path(&args.spectrum)),
        calibration: args.calibration.clone(),
        spectrum: args.spectrum.clone(),
        export: args.export.clone(),
    };

    let output = pipeline::run_dataset(&dataset, &config, options.fit)?;

    println!("{}", crate::report::format_run_summary(&output, &config));

    if options.plot {
        let plot = crate::plot::render_ascii_plot(
            &output.rebinned.histogram,
            output.fit.as_ref(),
            options.plot_width,
            options.plot_height,
        );
        println!("{plot}");
    }

    // Optional exports.
    if options.export_json.is_some() || options.export_csv.is_some() {
        let file = spectrum_file(&output, &config);
        if let Some(path) = &options.export_json {
            crate::io::write_spectrum_json(path, &file)?;
        }
        if let Some(path) = &options.export_csv {
            crate::io::write_bins_csv(path, &file)?;
        }
    }

    Ok(())
}

fn handle_weights(args: WeightsArgs) -> Result<(), AppError> {
    let config = PipelineConfig {
        comparator_count: args.calib.comparators,
        weight_floor: args.calib.floor,
        ..PipelineConfig::default()
    };
    let table = crate::io::read_calibration(&args.calibration, config.comparator_count, config.layout)?;
    let (integrated, weights) = crate::calib::derive_from_table(&table, config.weight_floor)
        .map_err(|e| AppError::from(e).context(args.calibration.display()))?;

    println!("{}", crate::report::format_weights(&integrated, &weights));
    Ok(())
}

fn handle_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.calib, &args.fit)?;
    let manifest = crate::io::read_manifest(&args.manifest)?;
    tracing::info!(datasets = manifest.datasets.len(), "batch started");

    let results = pipeline::run_batch(&manifest.datasets, &config, !args.fit.no_fit);
    println!("{}", crate::report::format_batch_summary(&results));

    let export_errors = export_batch(&manifest.datasets, &results, &config);
    batch_outcome(&results, &export_errors)
}

/// Write the JSON of every successful dataset that asks for one; failures are
/// logged and collected so later exports still run.
fn export_batch(
    datasets: &[Dataset],
    results: &[(String, Result<DatasetOutput, AppError>)],
    config: &PipelineConfig,
) -> Vec<AppError> {
    let mut errors = Vec::new();
    for (dataset, (_, result)) in datasets.iter().zip(results) {
        if let (Some(path), Ok(output)) = (&dataset.export, result) {
            if let Err(e) = crate::io::write_spectrum_json(path, &spectrum_file(output, config)) {
                tracing::warn!(dataset = %dataset.label, error = %e, "export failed");
                errors.push(e.context(&dataset.label));
            }
        }
    }
    errors
}

/// Exit status of a batch: the first dataset failure's code, else the first export failure's.
fn batch_outcome(
    results: &[(String, Result<DatasetOutput, AppError>)],
    export_errors: &[AppError],
) -> Result<(), AppError> {
    let failed: Vec<&AppError> = results.iter().filter_map(|(_, r)| r.as_ref().err()).collect();
    let Some(first) = failed.first().copied().or(export_errors.first()) else {
        return Ok(());
    };

    let mut message = Vec::new();
    if !failed.is_empty() {
        message.push(format!("{} of {} datasets failed.", failed.len(), results.len()));
    }
    for e in export_errors {
        message.push(e.to_string());
    }
    Err(AppError::new(first.exit_code(), message.join("\n")))
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let spectrum = crate::io::read_spectrum_json(&args.spectrum)?;
    let plot = crate::plot::render_ascii_plot_from_file(&spectrum, args.width, args.height);

    println!("{plot}");
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let layout = PipelineConfig::default().layout;
    if args.comparators > layout.last_column {
        return Err(AppError::new(
            2,
            format!("At most {} comparators fit the dump format.", layout.last_column),
        ));
    }

    let sim = simulation_config_from_args(&args);
    let data = generate(&sim)?;

    std::fs::create_dir_all(&args.out_dir).map_err(|e| {
        AppError::new(2, format!("Failed to create '{}': {e}", args.out_dir.display()))
    })?;

    let manifest = Manifest {
        datasets: vec![Dataset {
            label: format!("synthetic_{}", sim.seed),
            calibration: PathBuf::from("calibration.txt"),
            spectrum: PathBuf::from("spectrum.txt"),
            export: Some(PathBuf::from("result.json")),
        }],
    };
    let manifest_json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| AppError::new(2, format!("Failed to serialize manifest: {e}")))?;

    write_text(&args.out_dir.join("calibration.txt"), &format_calibration(&data.calibration, layout, &dump_header(&sim)))?;
    write_text(&args.out_dir.join("spectrum.txt"), &format_events(&data.events))?;
    write_text(&args.out_dir.join("manifest.json"), &manifest_json)?;

    tracing::info!(
        dir = %args.out_dir.display(),
        comparators = sim.comparators,
        sweep_steps = data.calibration.sweep_len(),
        events = data.events.len(),
        "synthetic dataset written"
    );
    println!(
        "Wrote calibration.txt, spectrum.txt and manifest.json to {}",
        args.out_dir.display()
    );
    Ok(())
}

fn write_text(path: &Path, text: &str) -> Result<(), AppError> {
    std::fs::write(path, text).map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))
}

pub fn pipeline_config_from_args(calib: &CalibrationArgs, fit: &FitArgs) -> Result<PipelineConfig, AppError> {
    if !(fit.fit_lo.is_finite() && fit.fit_hi.is_finite() && fit.fit_lo < fit.fit_hi) {
        return Err(AppError::new(
            2,
            format!("Invalid fit range [{}, {}].", fit.fit_lo, fit.fit_hi),
        ));
    }
    Ok(PipelineConfig {
        comparator_count: calib.comparators,
        weight_floor: calib.floor,
        fit_range: FitRange {
            lo: fit.fit_lo,
            hi: fit.fit_hi,
        },
        ..PipelineConfig::default()
    })
}

fn run_options_from_args(args: &RunArgs) -> RunOptions {
    RunOptions {
        fit: !args.fit.no_fit,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_json: args.export.clone(),
        export_csv: args.export_csv.clone(),
    }
}

/// Peak position and width scale with the number of comparators.
fn simulation_config_from_args(args: &SimulateArgs) -> SimulationConfig {
    let base = SimulationConfig::default();
    let scale = args.comparators as f64 / base.comparators as f64;
    SimulationConfig {
        comparators: args.comparators,
        seed: args.seed,
        events: args.events,
        peak_mean: base.peak_mean * scale,
        peak_sigma: base.peak_sigma * scale,
        background_scale: base.background_scale * scale,
        ..base
    }
}

fn label_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit_args(lo: f64, hi: f64) -> FitArgs {
        FitArgs {
            fit_lo: lo,
            fit_hi: hi,
            no_fit: false,
        }
    }

    #[test]
    fn config_from_args_carries_flags() {
        let calib = CalibrationArgs {
            comparators: 12,
            floor: 0.2,
        };
        let config = pipeline_config_from_args(&calib, &fit_args(3.0, 9.0)).unwrap();
        assert_eq!(config.comparator_count, 12);
        assert_eq!(config.weight_floor, 0.2);
        assert_eq!(config.fit_range, FitRange { lo: 3.0, hi: 9.0 });
        assert_eq!(config.layout, PipelineConfig::default().layout);
    }

    #[test]
    fn inverted_fit_range_is_rejected() {
        let calib = CalibrationArgs {
            comparators: 31,
            floor: 0.1,
        };
        let err = pipeline_config_from_args(&calib, &fit_args(30.0, 11.0)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn label_defaults_to_file_stem() {
        assert_eq!(label_from_path(Path::new("data/XYTER_201119.txt")), "XYTER_201119");
    }

    #[test]
    fn batch_export_failure_does_not_skip_later_exports() {
        let dir = std::env::temp_dir().join(format!("xycal-export-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let dataset = |label: &str, export: PathBuf| Dataset {
            label: label.to_string(),
            calibration: dir.join("unused.txt"),
            spectrum: dir.join("unused.txt"),
            export: Some(export),
        };
        let datasets = vec![
            dataset("a", dir.join("missing-dir").join("a.json")),
            dataset("b", dir.join("b.json")),
        ];
        let output = pipeline::tests::three_bin_output(vec![0.5, 1.6, 2.5, 3.5]);
        let results = vec![
            ("a".to_string(), Ok(output.clone())),
            ("b".to_string(), Ok(output)),
        ];

        let errors = export_batch(&datasets, &results, &PipelineConfig::default());
        let written = dir.join("b.json").exists();
        let _ = std::fs::remove_dir_all(&dir);

        assert!(written);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().starts_with("a: "));

        let err = batch_outcome(&results, &errors).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn batch_outcome_reports_dataset_and_export_failures() {
        let output = pipeline::tests::three_bin_output(vec![0.5, 1.6, 2.5, 3.5]);
        let results = vec![
            ("good".to_string(), Ok(output)),
            ("bad".to_string(), Err(AppError::new(3, "degenerate"))),
        ];
        assert!(batch_outcome(&results[..1], &[]).is_ok());

        let exports = vec![AppError::new(2, "good: cannot write")];
        let err = batch_outcome(&results, &exports).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("1 of 2 datasets failed."));
        assert!(err.to_string().contains("good: cannot write"));
    }

    #[test]
    fn simulate_writes_a_runnable_manifest() {
        let dir = std::env::temp_dir().join(format!("xycal-sim-{}", std::process::id()));
        handle_simulate(SimulateArgs {
            out_dir: dir.clone(),
            seed: 9,
            events: 5_000,
            comparators: 16,
        })
        .unwrap();

        let manifest = crate::io::read_manifest(&dir.join("manifest.json")).unwrap();
        let config = PipelineConfig {
            comparator_count: 16,
            ..PipelineConfig::default()
        };
        let output = pipeline::run_dataset(&manifest.datasets[0], &config, false).unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(output.label, "synthetic_9");
        assert_eq!(output.weights.bin_count(), 16);
        assert_eq!(output.raw.entries() + output.raw.underflow + output.raw.overflow, 5_000);
    }
}
