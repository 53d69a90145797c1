//! Export per-bin results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::SpectrumFile;
use crate::error::AppError;

const HEADER: &str = "adc,edge_lo,edge_hi,width,degenerate,raw_count,density,fit";

/// Render the per-bin table.
pub fn format_bins_csv(spectrum: &SpectrumFile) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');

    let hist = &spectrum.rebinned;
    for i in 0..hist.bin_count() {
        let width = spectrum.widths.get(i);
        let fit = spectrum
            .fit
            .as_ref()
            .map(|f| format!("{:.6}", f.evaluate(hist.bin_center(i))))
            .unwrap_or_default();
        out.push_str(&format!(
            "{},{:.6},{:.6},{:.6},{},{},{:.6},{}\n",
            i + 1,
            hist.bin_low(i),
            hist.bin_high(i),
            width.map(|w| w.width).unwrap_or(f64::NAN),
            width.map(|w| w.degenerate).unwrap_or(false),
            spectrum.raw.counts.get(i).copied().unwrap_or(0),
            hist.contents[i],
            fit,
        ));
    }
    out
}

/// Write per-bin results to a CSV file.
pub fn write_bins_csv(path: &Path, spectrum: &SpectrumFile) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    file.write_all(format_bins_csv(spectrum).as_bytes())
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV: {e}")))?;

    tracing::info!(path = %path.display(), "bin table exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::spectrum_file::tests::sample_file;

    #[test]
    fn one_row_per_bin() {
        let spectrum = sample_file();
        let csv = format_bins_csv(&spectrum);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines.len(), 1 + 3);
        assert!(lines[1].starts_with("1,0.500000,1.600000,1.100000,false,10,9.090909,"));
        assert!(lines[3].starts_with("3,2.500000,3.500000,1.000000,false,30,30.000000,"));
    }

    #[test]
    fn csv_file_is_written() {
        let path = std::env::temp_dir().join(format!("xycal-bins-{}.csv", std::process::id()));
        write_bins_csv(&path, &sample_file()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(HEADER));
        let _ = std::fs::remove_file(&path);
    }
}
