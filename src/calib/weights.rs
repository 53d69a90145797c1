//! Calibration weight derivation.
//!
//! Each comparator's S-curve integral measures how much of the charge sweep it
//! fires for. The drop between two neighbouring integrals is therefore the
//! analog extent of the digital code between them. Normalizing those drops by
//! the full first-to-last range, scaled by `N - 1`, gives steps that are all
//! `≈ 1` for a perfectly linear ADC; accumulating them yields the bin edges.

use crate::domain::{IntegratedCalibration, RawCalibrationTable, WeightVector};
use crate::error::CalibError;

/// Lower edge of the first ADC bin.
pub const FIRST_EDGE: f64 = 0.5;

/// Sum every comparator's raw samples (the S-curve integral).
pub fn integrate(table: &RawCalibrationTable) -> Result<IntegratedCalibration, CalibError> {
    let sums = table
        .samples
        .iter()
        .enumerate()
        .map(|(i, samples)| {
            samples
                .iter()
                .try_fold(0i64, |acc, &v| acc.checked_add(v))
                .ok_or_else(|| {
                    CalibError::malformed(format!("S-curve integral of comparator {} overflows", i + 1))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(IntegratedCalibration(sums))
}

fn difference(a: i64, b: i64) -> Result<f64, CalibError> {
    a.checked_sub(b)
        .map(|d| d as f64)
        .ok_or_else(|| CalibError::malformed(format!("integral difference {a} - {b} overflows")))
}

/// Derive `N + 1` bin edges from `N` integrated calibration sums.
///
/// - `weight[0] = 0.5` and `weight[N] = N + 0.5` are fixed.
/// - interior edges accumulate `max(floor, step[i])` in index order.
///
/// The last edge is anchored, not derived: if the accumulated steps do not add
/// up to `N - 1`, the final interval absorbs the difference.
pub fn derive_weights(
    integrated: &[i64],
    comparator_count: usize,
    floor: f64,
) -> Result<WeightVector, CalibError> {
    let n = comparator_count;
    if n < 2 {
        return Err(CalibError::malformed(format!(
            "at least 2 comparators are required, got {n}"
        )));
    }
    if integrated.len() != n {
        return Err(CalibError::malformed(format!(
            "expected {n} integrated calibration sums, got {}",
            integrated.len()
        )));
    }
    if !(floor.is_finite() && floor > 0.0) {
        return Err(CalibError::malformed(format!(
            "weight floor must be finite and > 0, got {floor}"
        )));
    }

    if integrated[0] == integrated[n - 1] {
        return Err(CalibError::DegenerateNormalization {
            value: integrated[0],
        });
    }

    let range = difference(integrated[0], integrated[n - 1])?;
    let scale = (n - 1) as f64;

    let mut weights = vec![0.0; n + 1];
    weights[0] = FIRST_EDGE;
    weights[n] = n as f64 + FIRST_EDGE;
    for i in 1..n {
        let step = difference(integrated[i - 1], integrated[i])? / range * scale;
        weights[i] = weights[i - 1] + step.max(floor);
    }

    Ok(WeightVector(weights))
}

/// Convenience wrapper: integrate a table and derive its weights.
pub fn derive_from_table(
    table: &RawCalibrationTable,
    floor: f64,
) -> Result<(IntegratedCalibration, WeightVector), CalibError> {
    let integrated = integrate(table)?;
    let weights = derive_weights(integrated.as_slice(), table.comparator_count(), floor)?;
    Ok((integrated, weights))
}
