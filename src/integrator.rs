//! Neuron dynamics and spike propagation.
//!
//! The network construction only relies on the [`Integrator`] trait: given the layers (parameters,
//! weights, delays, scaling factors and external inputs), advance the state by one time step and
//! append the new firing events to the layer logs.
//!
//! [`IzhikevichIntegrator`] is the reference implementation, with the quadratic integrate-and-fire
//! dynamics of Izhikevich:
//!
//! ```text
//! dv/dt = 0.04v² + 5v + 140 - u + I
//! du/dt = a(bv - u)
//! if v >= 30: v = c, u = u + d
//! ```
use crate::config::NetworkConfig;
use crate::error::SNNError;
use crate::layer::{Firing, Layer};

/// The membrane potential at which a neuron fires (mV).
pub const FIRING_THRESHOLD: f64 = 30.0;

/// The default Euler step of the neuron dynamics (ms).
pub const INTEGRATION_STEP: f64 = 0.2;

/// A synchronous, one-millisecond step of the network dynamics.
pub trait Integrator {
    /// Advance every layer to time step `t`, appending new firings to the layer logs.
    fn advance(&mut self, layers: &mut [Layer], t: usize);
}

/// Forward Euler integration of the Izhikevich model with delayed synaptic transmission.
#[derive(Debug, PartialEq, Clone)]
pub struct IzhikevichIntegrator {
    /// The number of Euler sub-steps per millisecond.
    num_substeps: usize,
    /// Firings older than this many steps are never delivered.
    max_delay: usize,
}

impl IzhikevichIntegrator {
    /// Create an integrator with `1 / dt` sub-steps per millisecond.
    /// The step must divide one millisecond evenly, e.g., 0.2 or 0.25 but not 0.3.
    pub fn build(dt: f64, max_delay: usize) -> Result<Self, SNNError> {
        if !(dt > 0.0 && dt <= 1.0) {
            return Err(SNNError::InvalidParameter(format!(
                "The integration step must be in (0, 1], got {}",
                dt
            )));
        }
        let num_substeps = (1.0 / dt).round();
        if (num_substeps * dt - 1.0).abs() > 1e-9 {
            return Err(SNNError::InvalidParameter(format!(
                "The integration step must divide 1 ms evenly, got {}",
                dt
            )));
        }
        if max_delay == 0 {
            return Err(SNNError::InvalidParameter(
                "The maximum delay must be positive".to_string(),
            ));
        }
        Ok(IzhikevichIntegrator {
            num_substeps: num_substeps as usize,
            max_delay,
        })
    }

    /// Create an integrator with the default step, keeping firings for the configured maximum delay.
    pub fn for_config(config: &NetworkConfig) -> Result<Self, SNNError> {
        IzhikevichIntegrator::build(INTEGRATION_STEP, config.max_delay)
    }

    pub fn max_delay(&self) -> usize {
        self.max_delay
    }

    pub fn dt(&self) -> f64 {
        1.0 / self.num_substeps as f64
    }

    /// The synaptic current reaching each neuron of layer `target` at time `t`, plus its external input.
    fn input_current(&self, layers: &[Layer], target: usize, t: usize) -> Vec<f64> {
        let layer = &layers[target];
        let mut current = layer.input.clone();

        for (source, source_layer) in layers.iter().enumerate() {
            let weights = &layer.weights[source];
            let delays = &layer.delays[source];
            let factor = layer.factors[source];

            for firing in source_layer
                .firings()
                .iter()
                .rev()
                .take_while(|firing| firing.time + self.max_delay > t)
            {
                let Some(elapsed) = t.checked_sub(firing.time) else {
                    continue;
                };
                for (target_id, input) in current.iter_mut().enumerate() {
                    if delays[(target_id, firing.neuron_id)] == elapsed {
                        *input += factor * weights[(target_id, firing.neuron_id)];
                    }
                }
            }
        }

        current
    }
}

/// Matches [`IzhikevichIntegrator::for_config`] with the default configuration.
impl Default for IzhikevichIntegrator {
    fn default() -> Self {
        IzhikevichIntegrator {
            num_substeps: 5,
            max_delay: 20,
        }
    }
}

impl Integrator for IzhikevichIntegrator {
    fn advance(&mut self, layers: &mut [Layer], t: usize) {
        // Currents are computed from the firings up to t - 1 before any layer moves.
        let snapshot: &[Layer] = layers;
        let currents: Vec<Vec<f64>> = (0..snapshot.len())
            .map(|target| self.input_current(snapshot, target, t))
            .collect();

        let dt = self.dt();
        for (layer, current) in layers.iter_mut().zip(currents) {
            for _ in 0..self.num_substeps {
                for k in 0..layer.num_neurons() {
                    if layer.v[k] >= FIRING_THRESHOLD {
                        continue;
                    }
                    let (v, u) = (layer.v[k], layer.u[k]);
                    layer.v[k] = v + dt * (0.04 * v * v + 5.0 * v + 140.0 - u + current[k]);
                    layer.u[k] = u + dt * (layer.a[k] * (layer.b[k] * v - u));
                    if layer.v[k] >= FIRING_THRESHOLD {
                        layer.v[k] = FIRING_THRESHOLD;
                    }
                }
            }

            for k in 0..layer.num_neurons() {
                if layer.v[k] >= FIRING_THRESHOLD {
                    layer.record_firing(Firing::new(t, k));
                    layer.v[k] = layer.c[k];
                    layer.u[k] += layer.d[k];
                }
            }
        }
    }
}
