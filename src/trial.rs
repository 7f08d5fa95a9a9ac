//! Independent simulation trials and parallel sweeps over the rewiring probability.
//!
//! Each trial owns its network, integrator and random number generator; trials never share
//! mutable state and their results are only combined once all of them are done.
use itertools::{Either, Itertools};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{validate_probability, NetworkConfig, RateConfig};
use crate::drive::PoissonDrive;
use crate::error::SNNError;
use crate::integrator::{Integrator, IzhikevichIntegrator};
use crate::network::ModularNetwork;
use crate::rates::module_firing_rates;

/// Simulation and analysis settings shared by all trials of a sweep.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialSettings {
    /// The number of simulated 1 ms steps.
    pub duration: usize,
    /// The mean number of Poisson events per neuron and per step.
    pub rate: f64,
    /// The firing-rate analysis.
    pub rate_config: RateConfig,
    /// How many times a trial whose construction failed is run again with a new seed.
    pub max_retries: usize,
}

impl Default for TrialSettings {
    fn default() -> Self {
        TrialSettings {
            duration: 1000,
            rate: 0.01,
            rate_config: RateConfig::default(),
            max_retries: 2,
        }
    }
}

/// The outcome of one trial: the rewiring probability and one firing-rate series per module.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    pub p: f64,
    pub series: Vec<Vec<f64>>,
}

impl TrialResult {
    /// The firing rate averaged over all modules and sample points, 0 for an empty series.
    pub fn mean_rate(&self) -> f64 {
        let num_samples = self.series.iter().map(Vec::len).sum::<usize>();
        if num_samples == 0 {
            return 0.0;
        }
        self.series.iter().flatten().sum::<f64>() / num_samples as f64
    }
}

/// A trial that kept failing after all its retries.
#[derive(Debug, PartialEq)]
pub struct TrialFailure {
    /// The position of the trial in the sweep.
    pub index: usize,
    pub p: f64,
    /// The number of runs, retries included.
    pub attempts: usize,
    /// The error of the last run.
    pub error: SNNError,
}

/// The outcome of a sweep: the successful trials in sweep order, and the trials given up on.
#[derive(Debug, PartialEq)]
pub struct Sweep {
    pub results: Vec<TrialResult>,
    pub failures: Vec<TrialFailure>,
}

/// Drive the network with Poisson input for `duration` steps, starting at step 0.
pub fn run_simulation<I: Integrator, R: Rng>(
    network: &mut ModularNetwork,
    integrator: &mut I,
    duration: usize,
    rate: f64,
    rng: &mut R,
) -> Result<(), SNNError> {
    let drive = PoissonDrive::build(
        rate,
        network.config().drive_current,
        network.config().drive_target,
    )?;

    log::info!("Starting simulation of {} ms...", duration);
    let log_interval = (duration / 10).max(1);
    for t in 0..duration {
        drive.step(network, integrator, t, rng);
        if t % log_interval == 0 {
            log::debug!("Simulation at time {} / {}", t, duration);
        }
    }
    log::info!("Simulation completed successfully!");
    Ok(())
}

/// Build, simulate and analyse one network with rewiring probability `p`.
pub fn run_trial(
    p: f64,
    config: &NetworkConfig,
    settings: &TrialSettings,
    seed: u64,
) -> Result<TrialResult, SNNError> {
    validate_probability(p)?;
    settings.rate_config.validate()?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut network = ModularNetwork::build(p, config.clone(), &mut rng)?;
    let mut integrator = IzhikevichIntegrator::for_config(config)?;

    run_simulation(
        &mut network,
        &mut integrator,
        settings.duration,
        settings.rate,
        &mut rng,
    )?;
    let series = module_firing_rates(&network, &settings.rate_config, settings.duration)?;

    Ok(TrialResult { p, series })
}

/// The seed of run `attempt` of trial `index` in a sweep of `num_trials` trials.
/// First runs use `seed + index`; every retry round moves on to seeds no first run uses.
pub fn trial_seed(seed: u64, index: usize, attempt: usize, num_trials: usize) -> u64 {
    seed.wrapping_add((index + attempt * num_trials) as u64)
}

/// Only the random construction of a network can fail on one seed and succeed on another.
fn is_retryable(error: &SNNError) -> bool {
    matches!(
        error,
        SNNError::RetryLimitExceeded(_) | SNNError::InvariantViolation(_)
    )
}

/// Run trial `index`, retrying with fresh seeds up to `settings.max_retries` times.
fn run_trial_with_retries(
    index: usize,
    p: f64,
    config: &NetworkConfig,
    settings: &TrialSettings,
    seed: u64,
    num_trials: usize,
) -> Result<TrialResult, TrialFailure> {
    let mut attempt = 0;
    loop {
        let run_seed = trial_seed(seed, index, attempt, num_trials);
        match run_trial(p, config, settings, run_seed) {
            Ok(result) => return Ok(result),
            Err(error) if is_retryable(&error) && attempt < settings.max_retries => {
                log::warn!(
                    "Trial {} with p = {} failed on seed {}, retrying: {}",
                    index,
                    p,
                    run_seed,
                    error
                );
                attempt += 1;
            }
            Err(error) => {
                log::warn!(
                    "Trial {} with p = {} given up after {} runs: {}",
                    index,
                    p,
                    attempt + 1,
                    error
                );
                return Err(TrialFailure {
                    index,
                    p,
                    attempts: attempt + 1,
                    error,
                });
            }
        }
    }
}

/// Run one independent trial per rewiring probability, in parallel.
///
/// Trial `i` is first seeded with `seed + i`. A trial that fails is retried on its own and, if it
/// keeps failing, reported in [`Sweep::failures`] without affecting the other trials.
/// Only an invalid configuration or probability fails the whole sweep.
pub fn run_trials(
    ps: &[f64],
    config: &NetworkConfig,
    settings: &TrialSettings,
    seed: u64,
) -> Result<Sweep, SNNError> {
    config.validate()?;
    settings.rate_config.validate()?;
    ps.iter().try_for_each(|&p| validate_probability(p))?;

    log::info!("Running {} trials...", ps.len());
    let outcomes: Vec<Result<TrialResult, TrialFailure>> = ps
        .par_iter()
        .enumerate()
        .map(|(i, &p)| run_trial_with_retries(i, p, config, settings, seed, ps.len()))
        .collect();

    let (results, failures): (Vec<TrialResult>, Vec<TrialFailure>) =
        outcomes.into_iter().partition_map(|outcome| match outcome {
            Ok(result) => Either::Left(result),
            Err(failure) => Either::Right(failure),
        });
    log::info!(
        "{} trials completed, {} failed",
        results.len(),
        failures.len()
    );

    Ok(Sweep { results, failures })
}

/// Draw `num_trials` rewiring probabilities uniformly in [0, 1).
pub fn random_probabilities<R: Rng>(num_trials: usize, rng: &mut R) -> Vec<f64> {
    (0..num_trials).map(|_| rng.gen::<f64>()).collect()
}
