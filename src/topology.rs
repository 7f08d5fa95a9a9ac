//! Random intra-module topologies without duplicate connections or self-loops.
//!
//! # Examples
//!
//! ```rust
//! use modular_snn::topology::generate_connections;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let (weights, connections) = generate_connections(100, 1000, 1_000_000, &mut rng).unwrap();
//!
//! assert_eq!(connections.len(), 1000);
//! assert_eq!(weights.iter().filter(|&&w| w != 0.0).count(), 1000);
//! ```
use nalgebra::DMatrix;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SNNError;

/// A directed connection between two neurons of the same population.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct Connection {
    /// The ID of the neuron producing spikes.
    pub source_id: usize,
    /// The ID of the neuron receiving spikes.
    pub target_id: usize,
}

impl Connection {
    pub fn new(source_id: usize, target_id: usize) -> Self {
        Connection {
            source_id,
            target_id,
        }
    }
}

/// Draw `num_connections` distinct directed connections among `num_neurons` neurons.
///
/// Returns the edge-indicator matrix, indexed as `(target_id, source_id)`, together with the list of
/// connections in the order they were drawn.
/// Pairs are drawn uniformly and rejected if they form a self-loop or an existing connection; the
/// expected number of rejections is small as long as the density stays well below one.
pub fn generate_connections<R: Rng>(
    num_neurons: usize,
    num_connections: usize,
    max_attempts: usize,
    rng: &mut R,
) -> Result<(DMatrix<f64>, Vec<Connection>), SNNError> {
    if num_neurons < 2 && num_connections > 0 {
        return Err(SNNError::IncompatibleTopology(
            "At least two neurons are required to draw connections without self-loops".to_string(),
        ));
    }
    let capacity = num_neurons * num_neurons.saturating_sub(1);
    if num_connections > capacity {
        return Err(SNNError::IncompatibleTopology(format!(
            "{} connections requested but only {} are possible among {} neurons",
            num_connections, capacity, num_neurons
        )));
    }

    let mut weights = DMatrix::<f64>::zeros(num_neurons, num_neurons);
    let mut connections = Vec::with_capacity(num_connections);
    let mut attempts = 0;

    while connections.len() < num_connections {
        if attempts >= max_attempts {
            return Err(SNNError::RetryLimitExceeded(format!(
                "only {} of {} connections drawn after {} attempts",
                connections.len(),
                num_connections,
                attempts
            )));
        }
        attempts += 1;

        let source_id = rng.gen_range(0..num_neurons);
        let target_id = rng.gen_range(0..num_neurons);
        if source_id == target_id || weights[(target_id, source_id)] != 0.0 {
            continue;
        }

        weights[(target_id, source_id)] = 1.0;
        connections.push(Connection::new(source_id, target_id));
    }

    log::debug!(
        "{} connections drawn among {} neurons in {} attempts",
        num_connections,
        num_neurons,
        attempts
    );

    Ok((weights, connections))
}
