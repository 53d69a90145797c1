//! Spectrum event list reader.
//!
//! The event list is plain text holding one integer ADC code (`nadc`) per
//! event, separated by any whitespace. `#` starts a comment that runs to the
//! end of the line. Every event is filled into a uniform histogram with one
//! bin per ADC code `1..=N`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::domain::RawSpectrumHistogram;
use crate::error::{AppError, CalibError};

/// Fill a histogram of `bins` ADC codes from an event list.
pub fn parse_events<R: BufRead>(reader: R, bins: usize) -> Result<RawSpectrumHistogram, CalibError> {
    if bins == 0 {
        return Err(CalibError::malformed("spectrum needs at least one bin"));
    }

    let mut hist = RawSpectrumHistogram::empty(bins);
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| CalibError::malformed(format!("line {line_no}: {e}")))?;
        let data = line.split('#').next().unwrap_or("");
        for token in data.split_whitespace() {
            let adc = token.parse::<i64>().map_err(|_| {
                CalibError::malformed(format!("line {line_no}: ADC value '{token}' is not an integer"))
            })?;
            hist.fill(adc);
        }
    }

    Ok(hist)
}

/// Read an event list from disk and histogram it.
pub fn read_spectrum(path: &Path, bins: usize) -> Result<RawSpectrumHistogram, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open spectrum '{}': {e}", path.display()))
    })?;
    let hist = parse_events(BufReader::new(file), bins)
        .map_err(|e| AppError::from(e).context(path.display()))?;

    tracing::info!(
        path = %path.display(),
        entries = hist.entries(),
        underflow = hist.underflow,
        overflow = hist.overflow,
        "spectrum histogrammed"
    );
    if hist.underflow + hist.overflow > 0 {
        tracing::warn!(
            underflow = hist.underflow,
            overflow = hist.overflow,
            "events outside the ADC axis were not binned"
        );
    }
    Ok(hist)
}

/// Write events back in the list format (used by the synthetic generator).
pub fn format_events(events: &[i64]) -> String {
    let mut out = String::with_capacity(events.len() * 3);
    out.push_str("# nadc\n");
    for chunk in events.chunks(20) {
        let row: Vec<String> = chunk.iter().map(|v| v.to_string()).collect();
        out.push_str(&row.join(" "));
        out.push('\n');
    }
    out
}
