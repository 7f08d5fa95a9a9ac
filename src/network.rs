//! Construction of modular small-world networks.
//!
//! A network is made of one inhibitory population (layer 0) and several excitatory modules
//! (layers `1..=num_modules`). Inhibitory neurons project to every neuron of the network,
//! excitatory neurons project densely within their module and sparsely onto the inhibitory
//! population. A rewiring pass then moves each intra-module connection to a random module with
//! probability `p`, turning the modular network into a small-world one.
//!
//! # Examples
//!
//! ```rust
//! use modular_snn::config::NetworkConfig;
//! use modular_snn::network::ModularNetwork;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let network = ModularNetwork::build(0.1, NetworkConfig::default(), &mut rng).unwrap();
//!
//! assert_eq!(network.num_layers(), 9);
//! assert_eq!(network.num_neurons(), 1000);
//! assert_eq!(network.module_edge_count(0), Ok(1000));
//! assert_eq!(network.excitatory_to_inhibitory_count(), 800);
//! ```
use nalgebra::DMatrix;
use rand::distributions::{Distribution, Uniform};
use rand::seq::{index, SliceRandom};
use rand::Rng;
use std::collections::BTreeMap;

use crate::config::{validate_probability, InputAssignment, NetworkConfig};
use crate::error::SNNError;
use crate::layer::{Layer, Population};
use crate::parameters::{parameterize_excitatory, parameterize_inhibitory};
use crate::rewire::rewire;
use crate::topology::{generate_connections, Connection};

/// The index of the inhibitory layer.
pub const INHIBITORY_LAYER: usize = 0;

/// The index of the layer holding excitatory module `module`.
pub fn module_layer(module: usize) -> usize {
    module + 1
}

/// The intra-module connections drawn at construction, by module index.
pub type RewiringRecord = BTreeMap<usize, Vec<Connection>>;

#[derive(Debug, PartialEq, Clone)]
pub struct ModularNetwork {
    config: NetworkConfig,
    layers: Vec<Layer>,
}

impl ModularNetwork {
    /// Build a network and rewire its intra-module connections with probability `p`.
    /// The parameters are checked before any random number is drawn.
    pub fn build<R: Rng>(p: f64, config: NetworkConfig, rng: &mut R) -> Result<Self, SNNError> {
        validate_probability(p)?;
        let (mut network, record) = Self::build_unrewired(config, rng)?;
        rewire(&mut network, p, &record, rng)?;
        log::info!("Network with rewiring probability {} built", p);
        Ok(network)
    }

    /// Build a network with purely modular excitatory connectivity.
    /// Returns the network and the connections to be visited by the rewiring pass.
    pub fn build_unrewired<R: Rng>(
        config: NetworkConfig,
        rng: &mut R,
    ) -> Result<(Self, RewiringRecord), SNNError> {
        config.validate()?;

        let mut network = Self::allocate(config, rng);
        network.connect_inhibitory(rng);
        network.clear_excitatory_to_inhibitory();
        network.connect_excitatory_to_inhibitory(rng)?;
        let record = network.connect_modules(rng)?;

        log::debug!(
            "Modular network allocated with {} layers and {} neurons",
            network.num_layers(),
            network.num_neurons()
        );
        Ok((network, record))
    }

    fn allocate<R: Rng>(config: NetworkConfig, rng: &mut R) -> Self {
        let sizes = config.layer_sizes();

        let mut inhibitory = Layer::new(Population::Inhibitory, config.num_inhibitory, &sizes);
        parameterize_inhibitory(&mut inhibitory, &config, rng);

        let mut layers = Vec::with_capacity(sizes.len());
        layers.push(inhibitory);
        for module in 0..config.num_modules {
            let mut layer = Layer::new(
                Population::Excitatory(module),
                config.excitatory_per_module,
                &sizes,
            );
            parameterize_excitatory(&mut layer, &config, rng);
            layers.push(layer);
        }

        ModularNetwork { config, layers }
    }

    /// Inhibitory neurons project to every neuron, with weights uniform in [-1, 0).
    fn connect_inhibitory<R: Rng>(&mut self, rng: &mut R) {
        let weight_dist = Uniform::new(-1.0, 0.0);
        let num_inhibitory = self.config.num_inhibitory;

        for (id, layer) in self.layers.iter_mut().enumerate() {
            let mut weights = DMatrix::from_fn(layer.num_neurons(), num_inhibitory, |_, _| {
                weight_dist.sample(rng)
            });
            if id == INHIBITORY_LAYER && self.config.remove_inhibitory_self_loops {
                weights.fill_diagonal(0.0);
            }
            layer.weights[INHIBITORY_LAYER] = weights;
        }
    }

    fn clear_excitatory_to_inhibitory(&mut self) {
        let inhibitory = &mut self.layers[INHIBITORY_LAYER];
        for module in 0..self.config.num_modules {
            inhibitory.weights[module_layer(module)].fill(0.0);
        }
    }

    /// Each inhibitory neuron receives `inhibitory_inputs` distinct excitatory inputs with weights uniform in [0, 1).
    fn connect_excitatory_to_inhibitory<R: Rng>(&mut self, rng: &mut R) -> Result<(), SNNError> {
        let num_modules = self.config.num_modules;
        let num_excitatory = self.config.excitatory_per_module;
        let num_inputs = self.config.inhibitory_inputs;
        let weight_dist = Uniform::new(0.0, 1.0);

        let inputs: Vec<(usize, usize, usize)> = match self.config.input_assignment {
            InputAssignment::Balanced => {
                let mut slots: Vec<usize> = (0..self.config.num_inhibitory * num_inputs)
                    .map(|slot| slot % num_modules)
                    .collect();
                slots.shuffle(rng);

                let mut sources: Vec<Vec<usize>> = (0..num_modules)
                    .map(|_| {
                        let mut ids: Vec<usize> = (0..num_excitatory).collect();
                        ids.shuffle(rng);
                        ids
                    })
                    .collect();

                slots
                    .into_iter()
                    .enumerate()
                    .map(|(slot, module)| {
                        let source_id = sources[module].pop().ok_or_else(|| {
                            SNNError::InvariantViolation(format!(
                                "module {} ran out of distinct sources for the inhibitory population",
                                module
                            ))
                        })?;
                        Ok::<_, SNNError>((slot / num_inputs, module, source_id))
                    })
                    .collect::<Result<_, SNNError>>()?
            }
            InputAssignment::SingleModule => {
                let mut inputs = Vec::with_capacity(self.config.num_inhibitory * num_inputs);
                for target_id in 0..self.config.num_inhibitory {
                    let module = rng.gen_range(0..num_modules);
                    for source_id in index::sample(rng, num_excitatory, num_inputs) {
                        inputs.push((target_id, module, source_id));
                    }
                }
                inputs
            }
        };

        let inhibitory = &mut self.layers[INHIBITORY_LAYER];
        for (target_id, module, source_id) in inputs {
            let weight = &mut inhibitory.weights[module_layer(module)][(target_id, source_id)];
            if *weight != 0.0 {
                return Err(SNNError::InvariantViolation(format!(
                    "excitatory neuron {} of module {} already projects to inhibitory neuron {}",
                    source_id, module, target_id
                )));
            }
            *weight = weight_dist.sample(rng);
        }

        Ok(())
    }

    /// Draw the intra-module connections; excitatory neurons do not project to other modules yet.
    fn connect_modules<R: Rng>(&mut self, rng: &mut R) -> Result<RewiringRecord, SNNError> {
        let num_modules = self.config.num_modules;
        let num_excitatory = self.config.excitatory_per_module;
        let mut record = RewiringRecord::new();

        for module in 0..num_modules {
            let (weights, connections) = generate_connections(
                num_excitatory,
                self.config.connections_per_module,
                self.config.max_attempts,
                rng,
            )?;

            let layer = &mut self.layers[module_layer(module)];
            for other in 0..num_modules {
                layer.weights[module_layer(other)].fill(0.0);
            }
            layer.weights[module_layer(module)] = weights;

            record.insert(module, connections);
        }

        Ok(record)
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn num_modules(&self) -> usize {
        self.config.num_modules
    }

    pub fn num_neurons(&self) -> usize {
        self.layers.iter().map(|layer| layer.num_neurons()).sum()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn inhibitory(&self) -> &Layer {
        &self.layers[INHIBITORY_LAYER]
    }

    /// The layer of an excitatory module.
    /// Returns `None` if the module does not exist.
    pub fn module(&self, module: usize) -> Option<&Layer> {
        if module < self.config.num_modules {
            self.layers.get(module_layer(module))
        } else {
            None
        }
    }

    /// Put every neuron at rest and clear the firing logs, keeping the topology.
    pub fn reset_state(&mut self) {
        self.layers.iter_mut().for_each(|layer| layer.reset_state());
    }

    /// The number of connections sourced from `module` and landing in any excitatory module.
    pub fn module_edge_count(&self, module: usize) -> Result<usize, SNNError> {
        if module >= self.config.num_modules {
            return Err(SNNError::OutOfBounds(format!(
                "module {} does not exist, the network has {} modules",
                module, self.config.num_modules
            )));
        }
        self.layers[1..]
            .iter()
            .map(|layer| layer.num_synapses_from(module_layer(module)))
            .sum()
    }

    /// The number of connections from excitatory modules to the inhibitory population.
    pub fn excitatory_to_inhibitory_count(&self) -> usize {
        self.inhibitory().weights[1..]
            .iter()
            .map(|weights| weights.iter().filter(|&&w| w != 0.0).count())
            .sum()
    }

    /// The number of excitatory inputs of an inhibitory neuron.
    pub fn inhibitory_inputs(&self, neuron_id: usize) -> Result<usize, SNNError> {
        let inhibitory = self.inhibitory();
        if neuron_id >= inhibitory.num_neurons() {
            return Err(SNNError::OutOfBounds(format!(
                "inhibitory neuron {} does not exist, the population has {} neurons",
                neuron_id,
                inhibitory.num_neurons()
            )));
        }
        Ok(inhibitory.weights[1..]
            .iter()
            .map(|weights| weights.row(neuron_id).iter().filter(|&&w| w != 0.0).count())
            .sum())
    }

    /// The global index of the first neuron of a layer.
    pub fn layer_offset(&self, layer: usize) -> usize {
        self.layers[..layer]
            .iter()
            .map(|layer| layer.num_neurons())
            .sum()
    }

    /// The global connectivity matrix, with one row per source neuron and one column per target neuron.
    /// Neurons are ordered by layer: inhibitory first, then every module.
    pub fn connectivity_matrix(&self) -> DMatrix<f64> {
        let num_neurons = self.num_neurons();
        let offsets: Vec<usize> = (0..self.num_layers())
            .map(|layer| self.layer_offset(layer))
            .collect();

        let mut matrix = DMatrix::zeros(num_neurons, num_neurons);
        for (target_layer, layer) in self.layers.iter().enumerate() {
            for (source_layer, weights) in layer.weights.iter().enumerate() {
                let (num_targets, num_sources) = weights.shape();
                for target_id in 0..num_targets {
                    for source_id in 0..num_sources {
                        matrix[(
                            offsets[source_layer] + source_id,
                            offsets[target_layer] + target_id,
                        )] = weights[(target_id, source_id)];
                    }
                }
            }
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    #[test]
    fn test_build_invalid_probability() {
        let mut rng = StdRng::seed_from_u64(42);
        assert!(matches!(
            ModularNetwork::build(1.5, NetworkConfig::default(), &mut rng),
            Err(SNNError::InvalidParameter(_))
        ));
        assert!(matches!(
            ModularNetwork::build(-0.5, NetworkConfig::default(), &mut rng),
            Err(SNNError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_inhibitory_broadcast() {
        let mut rng = StdRng::seed_from_u64(42);
        let (network, _) =
            ModularNetwork::build_unrewired(NetworkConfig::default(), &mut rng).unwrap();

        for (id, layer) in network.layers().iter().enumerate() {
            let weights = &layer.weights[INHIBITORY_LAYER];
            assert_eq!(weights.shape(), (layer.num_neurons(), 200));
            for (target_id, source_id) in itertools::iproduct!(0..weights.nrows(), 0..200) {
                let w = weights[(target_id, source_id)];
                if id == INHIBITORY_LAYER && target_id == source_id {
                    assert_eq!(w, 0.0);
                } else {
                    assert!((-1.0..0.0).contains(&w));
                }
            }
        }
    }

    #[test]
    fn test_inhibitory_self_loops_kept() {
        let mut rng = StdRng::seed_from_u64(42);
        let config = NetworkConfig {
            remove_inhibitory_self_loops: false,
            ..Default::default()
        };
        let (network, _) = ModularNetwork::build_unrewired(config, &mut rng).unwrap();
        let weights = &network.inhibitory().weights[INHIBITORY_LAYER];
        assert!((0..200).all(|i| weights[(i, i)] < 0.0));
    }

    #[test]
    fn test_excitatory_to_inhibitory_balanced() {
        let mut rng = StdRng::seed_from_u64(42);
        let (network, _) =
            ModularNetwork::build_unrewired(NetworkConfig::default(), &mut rng).unwrap();

        assert_eq!(network.excitatory_to_inhibitory_count(), 800);
        assert!((0..200).all(|i| network.inhibitory_inputs(i) == Ok(4)));

        // Every excitatory neuron feeds at most one inhibitory neuron, 100 per module.
        for module in 0..8 {
            let weights = &network.inhibitory().weights[module_layer(module)];
            assert_eq!(
                network.inhibitory().num_synapses_from(module_layer(module)),
                Ok(100)
            );
            for source_id in 0..100 {
                assert!(weights.column(source_id).iter().filter(|&&w| w != 0.0).count() <= 1);
            }
            assert!(weights.iter().all(|&w| (0.0..1.0).contains(&w)));
        }
    }

    #[test]
    fn test_excitatory_to_inhibitory_single_module() {
        let mut rng = StdRng::seed_from_u64(42);
        let config = NetworkConfig {
            input_assignment: InputAssignment::SingleModule,
            ..Default::default()
        };
        let (network, _) = ModularNetwork::build_unrewired(config, &mut rng).unwrap();

        assert_eq!(network.excitatory_to_inhibitory_count(), 800);
        for target_id in 0..200 {
            assert_eq!(network.inhibitory_inputs(target_id), Ok(4));
            let modules: Vec<usize> = (0..8)
                .filter(|&m| {
                    network.inhibitory().weights[module_layer(m)]
                        .row(target_id)
                        .iter()
                        .any(|&w| w != 0.0)
                })
                .collect();
            assert_eq!(modules.len(), 1);
        }
    }

    #[test]
    fn test_modular_connections() {
        let mut rng = StdRng::seed_from_u64(42);
        let (network, record) =
            ModularNetwork::build_unrewired(NetworkConfig::default(), &mut rng).unwrap();

        assert_eq!(record.len(), 8);
        for (&module, connections) in record.iter() {
            assert_eq!(connections.len(), 1000);
            assert!(connections.iter().all(|c| c.source_id != c.target_id));
            let unique: HashSet<&Connection> = connections.iter().collect();
            assert_eq!(unique.len(), 1000);

            let layer = network.module(module).unwrap();
            assert_eq!(layer.num_synapses_from(module_layer(module)), Ok(1000));
            for other in (0..8).filter(|&other| other != module) {
                assert_eq!(layer.num_synapses_from(module_layer(other)), Ok(0));
            }
            assert_eq!(network.module_edge_count(module), Ok(1000));
        }
    }

    #[test]
    fn test_out_of_range_accessors() {
        let mut rng = StdRng::seed_from_u64(42);
        let network = ModularNetwork::build(0.0, NetworkConfig::default(), &mut rng).unwrap();

        assert!(network.module(8).is_none());
        assert!(matches!(
            network.module_edge_count(8),
            Err(SNNError::OutOfBounds(_))
        ));
        assert!(matches!(
            network.inhibitory_inputs(200),
            Err(SNNError::OutOfBounds(_))
        ));
        assert_eq!(network.inhibitory_inputs(199), Ok(4));
    }

    #[test]
    fn test_connectivity_matrix() {
        let mut rng = StdRng::seed_from_u64(42);
        let network = ModularNetwork::build(0.0, NetworkConfig::default(), &mut rng).unwrap();
        let matrix = network.connectivity_matrix();

        assert_eq!(matrix.shape(), (1000, 1000));
        assert_eq!(network.layer_offset(module_layer(0)), 200);
        assert_eq!(network.layer_offset(module_layer(7)), 900);

        // Excitatory-to-excitatory block only holds the modular connections.
        let excitatory_block = matrix.view((200, 200), (800, 800));
        assert_eq!(excitatory_block.iter().filter(|&&w| w != 0.0).count(), 8000);
        assert_eq!(excitatory_block.iter().filter(|&&w| w < 0.0).count(), 0);

        // Excitatory-to-inhibitory block.
        let feedback_block = matrix.view((200, 0), (800, 200));
        assert_eq!(feedback_block.iter().filter(|&&w| w != 0.0).count(), 800);
    }

    #[test]
    fn test_module_lookup() {
        let mut rng = StdRng::seed_from_u64(42);
        let network = ModularNetwork::build(0.0, NetworkConfig::default(), &mut rng).unwrap();
        assert_eq!(
            network.module(3).map(|layer| layer.population()),
            Some(Population::Excitatory(3))
        );
        assert!(network.module(8).is_none());
    }
}
