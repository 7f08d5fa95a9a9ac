//! This crate provides tools for building and simulating modular small-world spiking neural networks in Rust.
//!
//! # Building Networks
//!
//! A network is made of one inhibitory population shared by several excitatory modules. The
//! excitatory connections are first drawn within each module, then rewired between modules with
//! probability `p`.
//!
//! ```rust
//! use modular_snn::config::NetworkConfig;
//! use modular_snn::network::ModularNetwork;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let network = ModularNetwork::build(0.2, NetworkConfig::default(), &mut rng).unwrap();
//!
//! assert_eq!(network.num_neurons(), 1000);
//! assert!((0..8).all(|module| network.module_edge_count(module) == Ok(1000)));
//! assert_eq!(network.excitatory_to_inhibitory_count(), 800);
//! ```
//!
//! # Simulating Networks
//!
//! ```rust
//! use modular_snn::config::{NetworkConfig, RateConfig};
//! use modular_snn::integrator::IzhikevichIntegrator;
//! use modular_snn::network::ModularNetwork;
//! use modular_snn::rates::module_firing_rates;
//! use modular_snn::trial::run_simulation;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let mut network = ModularNetwork::build(0.1, NetworkConfig::default(), &mut rng).unwrap();
//! let mut integrator = IzhikevichIntegrator::for_config(network.config()).unwrap();
//!
//! // Drive the network with Poisson input for 100 ms
//! run_simulation(&mut network, &mut integrator, 100, 0.01, &mut rng).unwrap();
//!
//! // Mean firing rate of each module, in sliding windows of 50 ms every 20 ms
//! let series = module_firing_rates(&network, &RateConfig::default(), 100).unwrap();
//! assert_eq!(series.len(), 8);
//! ```

pub mod config;
pub mod drive;
pub mod error;
pub mod integrator;
pub mod layer;
pub mod network;
pub mod parameters;
pub mod persist;
pub mod rates;
pub mod rewire;
pub mod topology;
pub mod trial;
