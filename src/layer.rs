//! Module implementing the layers of a modular network.
//!
//! A layer is one population of neurons: the inhibitory population or one excitatory module.
//! Each layer owns the parameters and state of its neurons, the external input current, the
//! firing log and, for every source layer, the matrices describing incoming synapses.
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SNNError;

/// The resting membrane potential (mV).
pub const RESTING_POTENTIAL: f64 = -65.0;

/// The identity of a population.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Population {
    Inhibitory,
    /// An excitatory module, with its module index.
    Excitatory(usize),
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Population::Inhibitory => write!(f, "inhibitory"),
            Population::Excitatory(module) => write!(f, "excitatory@module_{}", module),
        }
    }
}

/// A firing event, recorded with the index of the neuron within its layer.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct Firing {
    /// The time step at which the neuron fired.
    pub time: usize,
    /// The index of the neuron within its layer.
    pub neuron_id: usize,
}

impl Firing {
    pub fn new(time: usize, neuron_id: usize) -> Self {
        Firing { time, neuron_id }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Layer {
    population: Population,
    /// Time scale of the recovery variable, one per neuron.
    pub a: Vec<f64>,
    /// Sensitivity of the recovery variable, one per neuron.
    pub b: Vec<f64>,
    /// After-spike reset of the membrane potential, one per neuron.
    pub c: Vec<f64>,
    /// After-spike increment of the recovery variable, one per neuron.
    pub d: Vec<f64>,
    /// Membrane potentials.
    pub v: Vec<f64>,
    /// Recovery variables.
    pub u: Vec<f64>,
    /// External input currents for the current time step.
    pub input: Vec<f64>,
    /// Synaptic weights per source layer, indexed as `(target_id, source_id)`; zero means no synapse.
    pub weights: Vec<DMatrix<f64>>,
    /// Synaptic delays (in time steps) per source layer, indexed as `(target_id, source_id)`.
    pub delays: Vec<DMatrix<usize>>,
    /// Scaling factor per source layer.
    pub factors: Vec<f64>,
    firings: Vec<Firing>,
}

impl Layer {
    /// Create a layer of `num_neurons` neurons receiving from layers of the given sizes.
    /// All weights and scaling factors are zero, all delays are unit delays and the neurons rest.
    pub fn new(population: Population, num_neurons: usize, source_sizes: &[usize]) -> Self {
        Layer {
            population,
            a: vec![0.0; num_neurons],
            b: vec![0.0; num_neurons],
            c: vec![RESTING_POTENTIAL; num_neurons],
            d: vec![0.0; num_neurons],
            v: vec![RESTING_POTENTIAL; num_neurons],
            u: vec![0.0; num_neurons],
            input: vec![0.0; num_neurons],
            weights: source_sizes
                .iter()
                .map(|&n| DMatrix::zeros(num_neurons, n))
                .collect(),
            delays: source_sizes
                .iter()
                .map(|&n| DMatrix::from_element(num_neurons, n, 1))
                .collect(),
            factors: vec![0.0; source_sizes.len()],
            firings: vec![],
        }
    }

    /// The identity of the population represented by the layer.
    pub fn population(&self) -> Population {
        self.population
    }

    /// The number of neurons in the layer.
    pub fn num_neurons(&self) -> usize {
        self.v.len()
    }

    /// The number of source layers.
    pub fn num_sources(&self) -> usize {
        self.weights.len()
    }

    /// Put every neuron at rest and clear the firing log.
    pub fn reset_state(&mut self) {
        self.v.iter_mut().for_each(|v| *v = RESTING_POTENTIAL);
        self.u = self.b.iter().zip(self.v.iter()).map(|(b, v)| b * v).collect();
        self.firings.clear();
    }

    /// The firing log, ordered by time.
    pub fn firings(&self) -> &[Firing] {
        &self.firings
    }

    /// Record a firing event.
    /// Events must be recorded in non-decreasing time order.
    pub fn record_firing(&mut self, firing: Firing) {
        debug_assert!(self.firings.last().map_or(true, |last| last.time <= firing.time));
        self.firings.push(firing);
    }

    /// The number of synapses received from a source layer.
    pub fn num_synapses_from(&self, source_layer: usize) -> Result<usize, SNNError> {
        let weights = self.weights.get(source_layer).ok_or(SNNError::OutOfBounds(format!(
            "layer {} has no source layer {}",
            self.population, source_layer
        )))?;
        Ok(weights.iter().filter(|&&w| w != 0.0).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_layer() {
        let layer = Layer::new(Population::Excitatory(3), 100, &[200, 100, 100]);
        assert_eq!(layer.num_neurons(), 100);
        assert_eq!(layer.num_sources(), 3);
        assert_eq!(layer.weights[0].shape(), (100, 200));
        assert_eq!(layer.delays[1].shape(), (100, 100));
        assert!(layer.delays[0].iter().all(|&d| d == 1));
        assert_eq!(layer.num_synapses_from(0), Ok(0));
        assert!(matches!(
            layer.num_synapses_from(9),
            Err(SNNError::OutOfBounds(_))
        ));
        assert!(layer.firings().is_empty());
        assert_eq!(layer.population().to_string(), "excitatory@module_3");
    }

    #[test]
    fn test_reset_state() {
        let mut layer = Layer::new(Population::Inhibitory, 2, &[2]);
        layer.b = vec![0.2, 0.25];
        layer.v = vec![30.0, -10.0];
        layer.record_firing(Firing::new(4, 1));
        layer.reset_state();

        assert_eq!(layer.v, vec![-65.0, -65.0]);
        assert_eq!(layer.u, vec![0.2 * -65.0, 0.25 * -65.0]);
        assert!(layer.firings().is_empty());
    }
}
