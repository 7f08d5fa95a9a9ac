//! Per-neuron dynamical parameters and per-path delays and scaling factors.
//!
//! The parameters follow Izhikevich's random network: inhibitory neurons are fast spiking with
//! heterogeneous `a` and `b`, excitatory neurons are regular spiking with heterogeneous `c` and `d`.
//! Layer 0 is the inhibitory population, layer `m + 1` is excitatory module `m`.
use nalgebra::DMatrix;
use rand::Rng;

use crate::config::NetworkConfig;
use crate::layer::{Layer, RESTING_POTENTIAL};

/// Turn a layer into a population of inhibitory neurons.
/// Weights are left untouched.
pub fn parameterize_inhibitory<R: Rng>(
    layer: &mut Layer,
    config: &NetworkConfig,
    rng: &mut R,
) {
    let r: Vec<f64> = (0..layer.num_neurons()).map(|_| rng.gen::<f64>()).collect();

    layer.a = r.iter().map(|r| 0.02 + 0.08 * r).collect();
    layer.b = r.iter().map(|r| 0.25 - 0.25 * r).collect();
    layer.c = vec![RESTING_POTENTIAL; r.len()];
    layer.d = vec![2.0; r.len()];
    layer.input = vec![0.0; r.len()];

    for source in 0..layer.num_sources() {
        let (rows, cols) = layer.delays[source].shape();
        layer.delays[source] = DMatrix::from_element(rows, cols, 1);
        layer.factors[source] = if source == 0 {
            config.inhibitory_to_inhibitory
        } else {
            config.excitatory_to_inhibitory
        };
    }

    layer.reset_state();
}

/// Turn a layer into a module of excitatory neurons.
/// Delays from the other modules are drawn uniformly in `[1, max_delay)`, weights are left untouched.
pub fn parameterize_excitatory<R: Rng>(
    layer: &mut Layer,
    config: &NetworkConfig,
    rng: &mut R,
) {
    let r: Vec<f64> = (0..layer.num_neurons()).map(|_| rng.gen::<f64>()).collect();

    layer.a = vec![0.02; r.len()];
    layer.b = vec![0.2; r.len()];
    layer.c = r.iter().map(|r| RESTING_POTENTIAL + 15.0 * r * r).collect();
    layer.d = r.iter().map(|r| 8.0 - 6.0 * r * r).collect();
    layer.input = vec![0.0; r.len()];

    for source in 0..layer.num_sources() {
        let (rows, cols) = layer.delays[source].shape();
        if source == 0 {
            layer.delays[source] = DMatrix::from_element(rows, cols, 1);
            layer.factors[source] = config.inhibitory_to_excitatory;
        } else {
            layer.delays[source] =
                DMatrix::from_fn(rows, cols, |_, _| rng.gen_range(1..config.max_delay));
            layer.factors[source] = config.excitatory_to_excitatory;
        }
    }

    layer.reset_state();
}
