//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the numeric code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::app::pipeline::DatasetOutput;
use crate::domain::{GaussianFit, IntegratedCalibration, PipelineConfig, WeightVector};
use crate::error::AppError;

/// Format the full run summary (inputs + per-bin table + fit).
pub fn format_run_summary(output: &DatasetOutput, config: &PipelineConfig) -> String {
    let mut out = String::new();

    out.push_str("=== xycal - XYTER ADC non-linearity correction ===\n");
    out.push_str(&format!("Dataset: {}\n", output.label));
    out.push_str(&format!(
        "Calibration: comparators={} | sweep steps={} | integral[first]={} integral[last]={}\n",
        config.comparator_count,
        output.sweep_len,
        output.integrated.as_slice().first().copied().unwrap_or(0),
        output.integrated.as_slice().last().copied().unwrap_or(0),
    ));
    out.push_str(&format!(
        "Spectrum: entries={} | underflow={} | overflow={}\n",
        output.raw.entries(),
        output.raw.underflow,
        output.raw.overflow,
    ));
    out.push_str(&format!("Weight floor: {}\n", config.weight_floor));

    out.push('\n');
    out.push_str(&format_bin_table(output));

    out.push('\n');
    match &output.fit {
        Some(fit) => out.push_str(&format_fit(fit)),
        None => out.push_str("Fit: not run\n"),
    }

    out
}

/// One row per ADC code: edges, effective width, raw count and density.
pub fn format_bin_table(output: &DatasetOutput) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>4} {:>9} {:>9} {:>8} {:>10} {:>12}  {}\n",
        "adc", "edge_lo", "edge_hi", "width", "raw", "density", "flags"
    ));
    out.push_str(&format!(
        "{:->4} {:->9} {:->9} {:->8} {:->10} {:->12}  {:-<5}\n",
        "", "", "", "", "", "", ""
    ));

    let hist = &output.rebinned.histogram;
    for (i, w) in output.rebinned.diagnostics.widths.iter().enumerate() {
        let mut flags = Vec::new();
        if w.degenerate {
            flags.push("zero-width");
        }
        if w.non_monotonic {
            flags.push("non-monotonic");
        }
        out.push_str(
            format!(
                "{:>4} {:>9.4} {:>9.4} {:>8.4} {:>10} {:>12.3}  {}\n",
                w.adc,
                hist.bin_low(i),
                hist.bin_high(i),
                w.width,
                output.raw.counts.get(i).copied().unwrap_or(0),
                hist.contents[i],
                flags.join(",")
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

pub fn format_fit(fit: &GaussianFit) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Gaussian fit in [{}, {}] ({} iterations):\n",
        fit.range.lo, fit.range.hi, fit.iterations
    ));
    out.push_str(&format!("- amplitude: {:.3}\n", fit.amplitude));
    out.push_str(&format!("- mean     : {:.4}\n", fit.mean));
    out.push_str(&format!("- sigma    : {:.4}\n", fit.sigma));
    let per_ndf = if fit.ndf > 0 {
        format!("{:.3}", fit.chi2 / fit.ndf as f64)
    } else {
        "-".to_string()
    };
    out.push_str(&format!("- chi2/ndf : {:.3}/{} = {per_ndf}\n", fit.chi2, fit.ndf));
    out
}

/// Integrals and derived edges, one comparator per row.
pub fn format_weights(integrated: &IntegratedCalibration, weights: &WeightVector) -> String {
    let w = weights.as_slice();
    let mut out = String::new();
    out.push_str(&format!("{:>4} {:>12} {:>9} {:>9}\n", "adc", "integral", "edge_lo", "step"));
    out.push_str(&format!("{:->4} {:->12} {:->9} {:->9}\n", "", "", "", ""));
    for (i, integral) in integrated.as_slice().iter().enumerate() {
        out.push_str(&format!(
            "{:>4} {:>12} {:>9.4} {:>9.4}\n",
            i + 1,
            integral,
            w[i],
            w[i + 1] - w[i]
        ));
    }
    out.push_str(&format!("{:>4} {:>12} {:>9.4}\n", "", "", w[w.len() - 1]));
    out
}

/// One line per dataset of a batch run.
pub fn format_batch_summary(results: &[(String, Result<DatasetOutput, AppError>)]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<24} {:>10} {:>10} {:>10} {:>10}  {}\n",
        "dataset", "entries", "mean", "sigma", "chi2/ndf", "status"
    ));
    for (label, result) in results {
        let line = match result {
            Ok(output) => {
                let (mean, sigma, chi2) = match &output.fit {
                    Some(f) if f.ndf > 0 => (
                        format!("{:.4}", f.mean),
                        format!("{:.4}", f.sigma),
                        format!("{:.3}", f.chi2 / f.ndf as f64),
                    ),
                    Some(f) => (format!("{:.4}", f.mean), format!("{:.4}", f.sigma), "-".to_string()),
                    None => ("-".to_string(), "-".to_string(), "-".to_string()),
                };
                format!(
                    "{:<24} {:>10} {:>10} {:>10} {:>10}  ok",
                    truncate(label, 24),
                    output.raw.entries(),
                    mean,
                    sigma,
                    chi2
                )
            }
            Err(e) => format!(
                "{:<24} {:>10} {:>10} {:>10} {:>10}  error: {e}",
                truncate(label, 24),
                "-",
                "-",
                "-",
                "-"
            ),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::tests::three_bin_output;

    #[test]
    fn weights_table_lists_every_edge() {
        let integrated = IntegratedCalibration(vec![100, 50, 10]);
        let weights = WeightVector(vec![0.5, 1.6, 2.5, 3.5]);
        let txt = format_weights(&integrated, &weights);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 2 + 3 + 1);
        assert_eq!(lines[2], "   1          100    0.5000    1.1000");
        assert!(lines[5].ends_with("3.5000"));
    }

    #[test]
    fn bin_table_flags_zero_width_bins() {
        let output = three_bin_output(vec![0.5, 0.5, 2.5, 3.5]);
        let txt = format_bin_table(&output);
        let first = txt.lines().nth(2).unwrap();
        assert!(first.ends_with("zero-width"), "{first}");
        assert!(!txt.lines().nth(3).unwrap().contains("zero-width"));
    }

    #[test]
    fn summary_mentions_dataset_and_missing_fit() {
        let output = three_bin_output(vec![0.5, 1.6, 2.5, 3.5]);
        let config = PipelineConfig {
            comparator_count: 3,
            ..PipelineConfig::default()
        };
        let txt = format_run_summary(&output, &config);
        assert!(txt.contains("Dataset: unit"));
        assert!(txt.contains("comparators=3"));
        assert!(txt.contains("Fit: not run"));
    }

    #[test]
    fn batch_summary_reports_errors_inline() {
        let results = vec![
            ("good".to_string(), Ok(three_bin_output(vec![0.5, 1.6, 2.5, 3.5]))),
            ("bad".to_string(), Err(AppError::new(3, "degenerate"))),
        ];
        let txt = format_batch_summary(&results);
        let lines: Vec<&str> = txt.lines().collect();
        assert!(lines[1].starts_with("good") && lines[1].ends_with("ok"));
        assert!(lines[2].ends_with("error: degenerate"));
    }

    #[test]
    fn truncate_long_labels() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdefgh", 5), "abcd.");
    }
}
