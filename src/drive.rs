//! Stochastic background drive and firing records.
//!
//! At every time step, each driven neuron receives a current proportional to a Poisson count,
//! modelling sporadic spontaneous input from outside the network. The inputs of all layers are set
//! before the integrator moves the network by one step.
//!
//! # Examples
//!
//! ```rust
//! use modular_snn::config::NetworkConfig;
//! use modular_snn::drive::{excitatory_raster, step_with_poisson_drive};
//! use modular_snn::integrator::IzhikevichIntegrator;
//! use modular_snn::network::ModularNetwork;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let mut network = ModularNetwork::build(0.0, NetworkConfig::default(), &mut rng).unwrap();
//! let mut integrator = IzhikevichIntegrator::for_config(network.config()).unwrap();
//!
//! for t in 0..10 {
//!     step_with_poisson_drive(&mut network, &mut integrator, 0.0, t, &mut rng).unwrap();
//! }
//! assert!(excitatory_raster(&network).is_empty());
//! ```
use itertools::Itertools;
use rand::Rng;
use rand_distr::{Distribution, Poisson};
use serde::{Deserialize, Serialize};

use crate::config::DriveTarget;
use crate::error::SNNError;
use crate::integrator::Integrator;
use crate::network::{module_layer, ModularNetwork, INHIBITORY_LAYER};

/// Poisson-distributed input current.
#[derive(Debug, Clone)]
pub struct PoissonDrive {
    /// `None` for a zero rate, which yields no input at all.
    counts: Option<Poisson<f64>>,
    current: f64,
    target: DriveTarget,
}

impl PoissonDrive {
    /// Create a drive injecting `current` per Poisson event, with `rate` events per neuron and per step.
    pub fn build(rate: f64, current: f64, target: DriveTarget) -> Result<Self, SNNError> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(SNNError::InvalidParameter(format!(
                "The drive rate must be finite and non-negative, got {}",
                rate
            )));
        }
        let counts = if rate > 0.0 {
            Some(Poisson::new(rate).map_err(|e| {
                SNNError::InvalidParameter(format!("Invalid Poisson distribution: {}", e))
            })?)
        } else {
            None
        };
        Ok(PoissonDrive {
            counts,
            current,
            target,
        })
    }

    /// Sample the input currents of `num_neurons` neurons.
    pub fn sample<R: Rng>(&self, num_neurons: usize, rng: &mut R) -> Vec<f64> {
        match &self.counts {
            Some(counts) => (0..num_neurons)
                .map(|_| self.current * counts.sample(rng))
                .collect(),
            None => vec![0.0; num_neurons],
        }
    }

    /// Set the inputs of every layer, then advance the network to time step `t`.
    pub fn step<I: Integrator, R: Rng>(
        &self,
        network: &mut ModularNetwork,
        integrator: &mut I,
        t: usize,
        rng: &mut R,
    ) {
        let num_modules = network.num_modules();
        let layers = network.layers_mut();

        let inhibitory = &mut layers[INHIBITORY_LAYER];
        inhibitory.input = match self.target {
            DriveTarget::All => self.sample(inhibitory.num_neurons(), rng),
            DriveTarget::Excitatory => vec![0.0; inhibitory.num_neurons()],
        };
        for module in 0..num_modules {
            let layer = &mut layers[module_layer(module)];
            layer.input = self.sample(layer.num_neurons(), rng);
        }

        integrator.advance(layers, t);
    }
}

/// Drive the network with Poisson input of mean `rate` and advance it to time step `t`.
pub fn step_with_poisson_drive<I: Integrator, R: Rng>(
    network: &mut ModularNetwork,
    integrator: &mut I,
    rate: f64,
    t: usize,
    rng: &mut R,
) -> Result<(), SNNError> {
    let drive = PoissonDrive::build(
        rate,
        network.config().drive_current,
        network.config().drive_target,
    )?;
    drive.step(network, integrator, t, rng);
    Ok(())
}

/// A firing event with the global index of the neuron.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct GlobalFiring {
    pub time: usize,
    pub neuron_id: usize,
}

/// The firings of all excitatory modules, ordered by time then neuron.
/// Neuron `k` of module `m` has global index `m * excitatory_per_module + k`.
pub fn excitatory_raster(network: &ModularNetwork) -> Vec<GlobalFiring> {
    let num_excitatory = network.config().excitatory_per_module;
    (0..network.num_modules())
        .filter_map(|module| network.module(module).map(|layer| (module, layer)))
        .flat_map(|(module, layer)| {
            layer.firings().iter().map(move |firing| GlobalFiring {
                time: firing.time,
                neuron_id: module * num_excitatory + firing.neuron_id,
            })
        })
        .sorted_by_key(|firing| (firing.time, firing.neuron_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::layer::{Firing, Layer};
    use rand::{rngs::StdRng, SeedableRng};

    /// Records the inputs seen by each layer instead of integrating.
    #[derive(Default)]
    struct InputRecorder {
        inputs: Vec<Vec<Vec<f64>>>,
        times: Vec<usize>,
    }

    impl Integrator for InputRecorder {
        fn advance(&mut self, layers: &mut [Layer], t: usize) {
            self.inputs
                .push(layers.iter().map(|layer| layer.input.clone()).collect());
            self.times.push(t);
        }
    }

    #[test]
    fn test_invalid_rate() {
        assert!(PoissonDrive::build(-0.1, 15.0, DriveTarget::Excitatory).is_err());
        assert!(PoissonDrive::build(f64::NAN, 15.0, DriveTarget::Excitatory).is_err());
    }

    #[test]
    fn test_drive_excitatory_only() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut network = ModularNetwork::build(0.0, NetworkConfig::default(), &mut rng).unwrap();
        let mut recorder = InputRecorder::default();

        for t in 0..20 {
            step_with_poisson_drive(&mut network, &mut recorder, 0.5, t, &mut rng).unwrap();
        }

        assert_eq!(recorder.times, (0..20).collect::<Vec<_>>());
        for inputs in recorder.inputs.iter() {
            assert_eq!(inputs.len(), 9);
            assert!(inputs[0].iter().all(|&i| i == 0.0));
            for module_inputs in inputs[1..].iter() {
                assert_eq!(module_inputs.len(), 100);
                assert!(module_inputs
                    .iter()
                    .all(|&i| i >= 0.0 && (i / 15.0).fract() == 0.0));
            }
        }
        let total: f64 = recorder
            .inputs
            .iter()
            .flat_map(|inputs| inputs[1..].iter().flatten())
            .sum();
        assert!(total > 0.0);
    }

    #[test]
    fn test_drive_all_populations() {
        let mut rng = StdRng::seed_from_u64(42);
        let config = NetworkConfig {
            drive_target: DriveTarget::All,
            ..Default::default()
        };
        let mut network = ModularNetwork::build(0.0, config, &mut rng).unwrap();
        let mut recorder = InputRecorder::default();

        for t in 0..20 {
            step_with_poisson_drive(&mut network, &mut recorder, 1.0, t, &mut rng).unwrap();
        }
        let inhibitory_total: f64 = recorder
            .inputs
            .iter()
            .flat_map(|inputs| inputs[0].iter())
            .sum();
        assert!(inhibitory_total > 0.0);
    }

    #[test]
    fn test_zero_rate_yields_no_input() {
        let drive = PoissonDrive::build(0.0, 15.0, DriveTarget::All).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(drive.sample(100, &mut rng), vec![0.0; 100]);
    }

    #[test]
    fn test_excitatory_raster() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut network = ModularNetwork::build(0.0, NetworkConfig::default(), &mut rng).unwrap();
        network.layers_mut()[module_layer(2)].record_firing(Firing::new(3, 7));
        network.layers_mut()[module_layer(0)].record_firing(Firing::new(5, 1));
        network.layers_mut()[module_layer(7)].record_firing(Firing::new(5, 0));
        network.layers_mut()[INHIBITORY_LAYER].record_firing(Firing::new(1, 0));

        assert_eq!(
            excitatory_raster(&network),
            vec![
                GlobalFiring { time: 3, neuron_id: 207 },
                GlobalFiring { time: 5, neuron_id: 1 },
                GlobalFiring { time: 5, neuron_id: 700 },
            ]
        );
    }
}
