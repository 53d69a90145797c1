//! Command-line parsing for the XYTER ADC calibration tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the calibration/fit code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_COMPARATORS, DEFAULT_FIT_RANGE, DEFAULT_WEIGHT_FLOOR};
use crate::observe::{LogFormat, LogLevel};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "xycal", version, about = "XYTER ADC non-linearity calibration")]
pub struct Cli {
    /// Log verbosity (`RUST_LOG` takes precedence).
    #[arg(long, value_enum, global = true, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Log output format (written to stderr).
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Derive weights, rebin a spectrum, fit the peak, print and optionally export.
    Run(RunArgs),
    /// Print the integrals and derived bin edges of a calibration dump.
    Weights(WeightsArgs),
    /// Process every dataset of a JSON manifest in parallel.
    Batch(BatchArgs),
    /// Plot a previously exported spectrum JSON.
    Plot(PlotArgs),
    /// Write a synthetic calibration dump, event list and manifest.
    Simulate(SimulateArgs),
}

/// Options shared by every command that derives weights.
#[derive(Debug, Args, Clone)]
pub struct CalibrationArgs {
    /// Number of ADC comparators.
    #[arg(short = 'n', long, default_value_t = DEFAULT_COMPARATORS)]
    pub comparators: usize,

    /// Minimum normalized step between consecutive edges.
    #[arg(long, default_value_t = DEFAULT_WEIGHT_FLOOR)]
    pub floor: f64,
}

/// Options for the peak fit.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Lower end of the Gaussian fit range (ADC units).
    #[arg(long, default_value_t = DEFAULT_FIT_RANGE.lo)]
    pub fit_lo: f64,

    /// Upper end of the Gaussian fit range (ADC units).
    #[arg(long, default_value_t = DEFAULT_FIT_RANGE.hi)]
    pub fit_hi: f64,

    /// Skip the Gaussian fit.
    #[arg(long)]
    pub no_fit: bool,
}

/// Options for a single calibration/spectrum pair.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Calibration dump (text, 32 header lines).
    #[arg(short = 'c', long, value_name = "TXT")]
    pub calibration: PathBuf,

    /// Source spectrum as a list of ADC codes.
    #[arg(short = 's', long, value_name = "EVENTS")]
    pub spectrum: PathBuf,

    /// Dataset label for reports (defaults to the spectrum file stem).
    #[arg(long)]
    pub label: Option<String>,

    #[command(flatten)]
    pub calib: CalibrationArgs,

    #[command(flatten)]
    pub fit: FitArgs,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the full result (weights, widths, densities, fit) to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,

    /// Export one row per bin to CSV.
    #[arg(long = "export-csv", value_name = "CSV")]
    pub export_csv: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct WeightsArgs {
    /// Calibration dump (text, 32 header lines).
    #[arg(short = 'c', long, value_name = "TXT")]
    pub calibration: PathBuf,

    #[command(flatten)]
    pub calib: CalibrationArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct BatchArgs {
    /// JSON manifest listing the datasets.
    #[arg(short = 'm', long, value_name = "JSON")]
    pub manifest: PathBuf,

    #[command(flatten)]
    pub calib: CalibrationArgs,

    #[command(flatten)]
    pub fit: FitArgs,
}

/// Options for plotting a saved spectrum.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Spectrum JSON file produced by `xycal run --export`.
    #[arg(long, value_name = "JSON")]
    pub spectrum: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Parser)]
pub struct SimulateArgs {
    /// Directory for `calibration.txt`, `spectrum.txt` and `manifest.json`.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of source events.
    #[arg(long, default_value_t = 100_000)]
    pub events: usize,

    /// Number of ADC comparators.
    #[arg(short = 'n', long, default_value_t = DEFAULT_COMPARATORS)]
    pub comparators: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = Cli::parse_from(["xycal", "run", "-c", "cal.txt", "-s", "ev.txt"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.calib.comparators, 31);
        assert_eq!(args.calib.floor, 0.1);
        assert_eq!((args.fit.fit_lo, args.fit.fit_hi), (11.0, 30.0));
        assert!(!args.fit.no_fit && !args.no_plot);
        assert_eq!(cli.log_level, LogLevel::Warn);
    }

    #[test]
    fn log_flags_are_global() {
        let cli = Cli::parse_from([
            "xycal",
            "weights",
            "-c",
            "cal.txt",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ]);
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
