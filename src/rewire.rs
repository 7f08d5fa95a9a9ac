//! Small-world rewiring of the intra-module connections.
//!
//! Every connection drawn at construction is visited exactly once and, with probability `p`, moved
//! to a uniformly drawn (module, neuron) target. The source neuron, hence the source module, never
//! changes: the number of connections sourced from each module is preserved.
use rand::Rng;
use std::collections::HashSet;

use crate::config::validate_probability;
use crate::error::SNNError;
use crate::network::{module_layer, ModularNetwork, RewiringRecord};

/// Rewire the intra-module connections listed in `record` with probability `p`.
///
/// A moved connection never becomes a self-loop, never duplicates an existing connection from the
/// same source and never lands on a cell that held one of the module's original connections.
pub fn rewire<R: Rng>(
    network: &mut ModularNetwork,
    p: f64,
    record: &RewiringRecord,
    rng: &mut R,
) -> Result<(), SNNError> {
    validate_probability(p)?;

    let num_modules = network.num_modules();
    let num_excitatory = network.config().excitatory_per_module;
    let max_attempts = network.config().max_attempts;

    if let Some(module) = record.keys().find(|&&module| module >= num_modules) {
        return Err(SNNError::InvalidParameter(format!(
            "The rewiring record refers to module {} but the network has {} modules",
            module, num_modules
        )));
    }

    let mut num_rewired = 0;
    for (&module, connections) in record.iter() {
        let source_layer = module_layer(module);
        let original: HashSet<(usize, usize)> = connections
            .iter()
            .map(|c| (c.target_id, c.source_id))
            .collect();

        for connection in connections.iter() {
            if rng.gen::<f64>() >= p {
                continue;
            }

            let (source_id, target_id) = (connection.source_id, connection.target_id);
            let weight = &mut network.layers_mut()[source_layer].weights[source_layer]
                [(target_id, source_id)];
            if *weight != 1.0 {
                return Err(SNNError::InvariantViolation(format!(
                    "connection {} -> {} of module {} is missing or was already rewired",
                    source_id, target_id, module
                )));
            }
            *weight = 0.0;

            let mut attempts = 0;
            let (new_module, new_target_id) = loop {
                if attempts >= max_attempts {
                    return Err(SNNError::RetryLimitExceeded(format!(
                        "no free target found for neuron {} of module {} after {} attempts",
                        source_id, module, attempts
                    )));
                }
                attempts += 1;

                let new_module = rng.gen_range(0..num_modules);
                let new_target_id = rng.gen_range(0..num_excitatory);

                if new_module == module
                    && (new_target_id == source_id
                        || original.contains(&(new_target_id, source_id)))
                {
                    continue;
                }
                if network.layers()[module_layer(new_module)].weights[source_layer]
                    [(new_target_id, source_id)]
                    != 0.0
                {
                    continue;
                }
                break (new_module, new_target_id);
            };

            network.layers_mut()[module_layer(new_module)].weights[source_layer]
                [(new_target_id, source_id)] = 1.0;
            num_rewired += 1;
        }

        log::debug!(
            "Module {}: {} connections visited for rewiring",
            module,
            connections.len()
        );
    }

    log::info!(
        "{} connections rewired with probability {}",
        num_rewired,
        p
    );
    Ok(())
}
