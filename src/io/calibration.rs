//! Calibration dump parser.
//!
//! The dump is a space-delimited text table:
//!
//! - the first `header_lines` (32) lines are skipped
//! - each data row holds the S-curve value of every comparator at one charge
//!   step; comparator `i` (0-based) is the token at `last_column - i` (32 - i),
//!   i.e. columns run in reverse comparator order
//! - the table ends at the first row with exactly one token; an empty line or
//!   end of file ends it too

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::domain::{DumpLayout, RawCalibrationTable};
use crate::error::{AppError, CalibError};

/// Split a dump line into tokens, ignoring repeated spaces.
fn tokens(line: &str) -> Vec<&str> {
    line.trim_end_matches(['\r', '\n'])
        .split(' ')
        .filter(|t| !t.is_empty())
        .collect()
}

/// Read one raw line (including its terminator) into `buf`; 0 means end of input.
fn next_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<usize> {
    buf.clear();
    reader.read_until(b'\n', buf)
}

/// Parse a calibration dump from any buffered reader.
pub fn parse_calibration<R: BufRead>(
    mut reader: R,
    comparator_count: usize,
    layout: DumpLayout,
) -> Result<RawCalibrationTable, CalibError> {
    if comparator_count == 0 || comparator_count > layout.last_column + 1 {
        return Err(CalibError::malformed(format!(
            "{comparator_count} comparators do not fit a dump whose last column is {}",
            layout.last_column
        )));
    }

    let mut buf = Vec::new();

    // Header bytes are never decoded; only the line breaks matter.
    for skipped in 0..layout.header_lines {
        let read = next_line(&mut reader, &mut buf).map_err(|e| {
            CalibError::malformed(format!("failed to read header line {}: {e}", skipped + 1))
        })?;
        if read == 0 {
            return Err(CalibError::malformed(format!(
                "dump ended after {skipped} of {} header lines",
                layout.header_lines
            )));
        }
    }

    let mut samples: Vec<Vec<i64>> = vec![Vec::new(); comparator_count];
    let mut line_no = layout.header_lines;

    loop {
        line_no += 1;
        let read = next_line(&mut reader, &mut buf)
            .map_err(|e| CalibError::malformed(format!("line {line_no}: {e}")))?;
        if read == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let row = tokens(&line);
        if row.len() <= 1 {
            break;
        }
        if row.len() <= layout.last_column {
            return Err(CalibError::malformed(format!(
                "line {line_no}: expected at least {} tokens, found {}",
                layout.last_column + 1,
                row.len()
            )));
        }

        for (i, comparator) in samples.iter_mut().enumerate() {
            let token = row[layout.last_column - i];
            let value = token.parse::<i64>().map_err(|_| {
                CalibError::malformed(format!(
                    "line {line_no}: comparator {} value '{token}' is not an integer",
                    i + 1
                ))
            })?;
            comparator.push(value);
        }
    }

    if samples[0].is_empty() {
        return Err(CalibError::malformed("calibration dump has no data rows"));
    }

    Ok(RawCalibrationTable { samples })
}

/// Read a calibration dump from disk.
pub fn read_calibration(
    path: &Path,
    comparator_count: usize,
    layout: DumpLayout,
) -> Result<RawCalibrationTable, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open calibration dump '{}': {e}", path.display()))
    })?;
    let table = parse_calibration(BufReader::new(file), comparator_count, layout)
        .map_err(|e| AppError::from(e).context(path.display()))?;

    tracing::info!(
        path = %path.display(),
        comparators = table.comparator_count(),
        sweep_steps = table.sweep_len(),
        "calibration dump parsed"
    );
    Ok(table)
}

/// Render a table in the dump format, including header and end marker.
///
/// Token 0 carries the charge step; tokens not owned by a comparator are 0.
pub fn format_calibration(table: &RawCalibrationTable, layout: DumpLayout, header: &[String]) -> String {
    let mut out = String::new();
    for i in 0..layout.header_lines {
        match header.get(i) {
            Some(line) => out.push_str(line),
            None => out.push_str("#"),
        }
        out.push('\n');
    }

    for step in 0..table.sweep_len() {
        let mut row = vec![0i64; layout.last_column + 1];
        row[0] = step as i64;
        for (i, comparator) in table.samples.iter().enumerate() {
            row[layout.last_column - i] = comparator[step];
        }
        let row: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        out.push_str(&row.join(" "));
        out.push('\n');
    }
    out.push_str("END\n");
    out
}
