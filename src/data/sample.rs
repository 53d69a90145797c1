//! Synthetic calibration sweeps and source spectra.
//!
//! The generator models an ADC whose comparator thresholds are unevenly
//! spaced:
//!
//! - threshold `k` sits at `0.5 + Σ spacing` with spacings drawn around 1
//! - an S-curve sweep injects `pulses_per_step` test pulses at each charge step
//!   and counts how often each comparator fires under Gaussian noise
//! - source events are drawn from a photo peak on top of a falling
//!   exponential background and digitized against the same thresholds
//!
//! Output uses the same shapes as real data, so it exercises the whole pipeline.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Exp, Normal};

use crate::domain::RawCalibrationTable;
use crate::error::AppError;

/// Smallest allowed threshold spacing (in nominal ADC units).
const MIN_SPACING: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub comparators: usize,
    pub seed: u64,
    /// Standard deviation of the threshold spacings around 1.
    pub spacing_spread: f64,
    /// Charge increment between sweep steps.
    pub sweep_step: f64,
    pub pulses_per_step: usize,
    /// Front-end noise (charge units) smearing each test pulse.
    pub noise: f64,
    pub events: usize,
    pub peak_mean: f64,
    pub peak_sigma: f64,
    /// Fraction of events drawn from the exponential background.
    pub background_fraction: f64,
    pub background_scale: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            comparators: crate::domain::DEFAULT_COMPARATORS,
            seed: 42,
            spacing_spread: 0.25,
            sweep_step: 0.05,
            pulses_per_step: 200,
            noise: 0.2,
            events: 100_000,
            peak_mean: 20.5,
            peak_sigma: 2.5,
            background_fraction: 0.3,
            background_scale: 6.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticData {
    /// True firing threshold of every comparator.
    pub thresholds: Vec<f64>,
    pub calibration: RawCalibrationTable,
    /// Digitized ADC code per source event (0 = below the first threshold).
    pub events: Vec<i64>,
}

pub fn generate(config: &SimulationConfig) -> Result<SyntheticData, AppError> {
    if config.comparators < 2 {
        return Err(AppError::new(2, "Simulation needs at least 2 comparators."));
    }
    if !(config.sweep_step.is_finite() && config.sweep_step > 0.0) {
        return Err(AppError::new(2, "Sweep step must be > 0."));
    }
    if config.pulses_per_step == 0 {
        return Err(AppError::new(2, "Pulses per step must be > 0."));
    }
    if !(0.0..=1.0).contains(&config.background_fraction) {
        return Err(AppError::new(2, "Background fraction must lie in [0, 1]."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let unit = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let thresholds = draw_thresholds(&mut rng, &unit, config);
    let calibration = sweep(&mut rng, &unit, &thresholds, config);
    let events = source_events(&mut rng, &thresholds, config)?;

    Ok(SyntheticData {
        thresholds,
        calibration,
        events,
    })
}

fn draw_thresholds(rng: &mut StdRng, unit: &Normal<f64>, config: &SimulationConfig) -> Vec<f64> {
    let mut thresholds = Vec::with_capacity(config.comparators);
    let mut t = 0.5;
    thresholds.push(t);
    for _ in 1..config.comparators {
        let spacing = (1.0 + config.spacing_spread * unit.sample(rng)).max(MIN_SPACING);
        t += spacing;
        thresholds.push(t);
    }
    thresholds
}

/// Count firing pulses per comparator at every charge step of the sweep.
fn sweep(
    rng: &mut StdRng,
    unit: &Normal<f64>,
    thresholds: &[f64],
    config: &SimulationConfig,
) -> RawCalibrationTable {
    // Start and end far enough from the outer thresholds that the curves sit
    // flat at 0 and at full efficiency.
    let margin = 5.0 * config.noise + 1.0;
    let q_min = thresholds.first().copied().unwrap_or(0.0) - margin;
    let q_max = thresholds.last().copied().unwrap_or(0.0) + margin;
    let steps = ((q_max - q_min) / config.sweep_step).ceil() as usize + 1;

    let mut samples = vec![Vec::with_capacity(steps); thresholds.len()];
    for step in 0..steps {
        let q = q_min + step as f64 * config.sweep_step;
        for (k, &t) in thresholds.iter().enumerate() {
            let fired = (0..config.pulses_per_step)
                .filter(|_| q + config.noise * unit.sample(rng) >= t)
                .count();
            samples[k].push(fired as i64);
        }
    }
    RawCalibrationTable { samples }
}

fn source_events(
    rng: &mut StdRng,
    thresholds: &[f64],
    config: &SimulationConfig,
) -> Result<Vec<i64>, AppError> {
    let peak = Normal::new(config.peak_mean, config.peak_sigma)
        .map_err(|e| AppError::new(2, format!("Invalid peak settings: {e}")))?;
    let background = Exp::new(1.0 / config.background_scale)
        .map_err(|e| AppError::new(2, format!("Invalid background scale: {e}")))?;

    let events = (0..config.events)
        .map(|_| {
            let charge = if rng.gen_bool(config.background_fraction) {
                thresholds[0] + background.sample(rng)
            } else {
                peak.sample(rng)
            };
            digitize(charge, thresholds)
        })
        .collect();
    Ok(events)
}

/// ADC code for a charge: the number of thresholds at or below it.
pub fn digitize(charge: f64, thresholds: &[f64]) -> i64 {
    thresholds.partition_point(|&t| t <= charge) as i64
}

/// Header lines written at the top of a synthetic dump.
pub fn dump_header(config: &SimulationConfig) -> Vec<String> {
    vec![
        "# synthetic XYTER S-curve calibration".to_string(),
        format!("# comparators {}", config.comparators),
        format!("# seed {}", config.seed),
        format!("# sweep_step {} pulses_per_step {}", config.sweep_step, config.pulses_per_step),
        format!("# noise {}", config.noise),
    ]
}
