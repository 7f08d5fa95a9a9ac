//! Sliding-window mean firing rates of the excitatory modules.
//!
//! # Examples
//!
//! ```rust
//! use modular_snn::config::RateConfig;
//! use modular_snn::layer::Firing;
//! use modular_snn::rates::mean_firing_rate_series;
//!
//! let firings = vec![Firing::new(10, 0), Firing::new(30, 4), Firing::new(45, 2)];
//! let series = mean_firing_rate_series(&firings, &RateConfig::default(), 100).unwrap();
//!
//! assert_eq!(series.len(), 6);
//! assert_eq!(series[0], 0.0);
//! assert_eq!(series[2], 2.0 / 50.0);
//! ```
use itertools::Itertools;

use crate::config::{RateConfig, WindowAlignment};
use crate::error::SNNError;
use crate::layer::Firing;
use crate::network::ModularNetwork;

/// The number of firings strictly before each time step of `[0, span]`.
fn cumulative_counts(firings: &[Firing], offset: usize, span: usize) -> Vec<usize> {
    let mut counts = vec![0; span];
    for firing in firings.iter() {
        if firing.time >= offset && firing.time - offset < span {
            counts[firing.time - offset] += 1;
        }
    }

    std::iter::once(0)
        .chain(counts.into_iter().scan(0, |total, count| {
            *total += count;
            Some(*total)
        }))
        .collect()
}

/// The mean firing rate of a population, sampled every `stride` steps over `[warmup, horizon]`.
///
/// Each sample is the number of firings in a window of `window` ms divided by `window`. The window
/// is clamped to the analysed interval. Firings outside `[warmup, horizon)` are ignored.
pub fn mean_firing_rate_series(
    firings: &[Firing],
    rate_config: &RateConfig,
    horizon: usize,
) -> Result<Vec<f64>, SNNError> {
    rate_config.validate()?;
    if horizon <= rate_config.warmup {
        return Err(SNNError::InvalidParameter(format!(
            "The horizon ({}) must be larger than the warmup ({})",
            horizon, rate_config.warmup
        )));
    }

    let span = horizon - rate_config.warmup;
    let cumulative = cumulative_counts(firings, rate_config.warmup, span);
    let window = rate_config.window;

    let series = (0..=span)
        .step_by(rate_config.stride)
        .map(|t| {
            let (start, end) = match rate_config.alignment {
                WindowAlignment::Trailing => (t.saturating_sub(window), t),
                WindowAlignment::Centered => (
                    t.saturating_sub(window / 2),
                    (t + window - window / 2).min(span),
                ),
            };
            (cumulative[end] - cumulative[start]) as f64 / window as f64
        })
        .collect();

    Ok(series)
}

/// Check that all series have the same length.
pub fn check_series_lengths(series: &[Vec<f64>]) -> Result<(), SNNError> {
    if series.iter().map(Vec::len).all_equal() {
        return Ok(());
    }
    let expected = series[0].len();
    let found = series
        .iter()
        .map(Vec::len)
        .find(|&len| len != expected)
        .unwrap_or(expected);
    Err(SNNError::SeriesLengthMismatch { expected, found })
}

/// The mean firing-rate series of every excitatory module, in module order.
pub fn module_firing_rates(
    network: &ModularNetwork,
    rate_config: &RateConfig,
    horizon: usize,
) -> Result<Vec<Vec<f64>>, SNNError> {
    let series = (0..network.num_modules())
        .filter_map(|module| network.module(module))
        .map(|layer| mean_firing_rate_series(layer.firings(), rate_config, horizon))
        .collect::<Result<Vec<Vec<f64>>, SNNError>>()?;

    if series.len() != network.num_modules() {
        return Err(SNNError::SeriesLengthMismatch {
            expected: network.num_modules(),
            found: series.len(),
        });
    }
    check_series_lengths(&series)?;
    Ok(series)
}
