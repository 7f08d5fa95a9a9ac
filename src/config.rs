//! Configuration of the modular network and of the firing-rate analysis.
//!
//! The defaults reproduce the classic modular small-world setup: 200 inhibitory neurons shared by
//! 8 excitatory modules of 100 neurons, each module holding 1000 internal connections.
//!
//! # Examples
//!
//! ```rust
//! use modular_snn::config::NetworkConfig;
//!
//! let config = NetworkConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.num_neurons(), 1000);
//! ```
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::SNNError;

/// How the excitatory inputs of the inhibitory neurons are spread over the modules.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum InputAssignment {
    /// All input slots are split as evenly as possible over the modules, then shuffled.
    /// Every excitatory neuron feeds at most one inhibitory neuron.
    Balanced,
    /// Each inhibitory neuron draws all its inputs from a single, uniformly chosen module.
    SingleModule,
}

/// Which populations receive the Poisson background drive.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum DriveTarget {
    /// Only the excitatory modules are driven, the inhibitory input is zero.
    Excitatory,
    /// Both the inhibitory population and the excitatory modules are driven.
    All,
}

/// Parameters of the modular network.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// The number of excitatory modules.
    pub num_modules: usize,
    /// The number of neurons in each excitatory module.
    pub excitatory_per_module: usize,
    /// The number of neurons in the inhibitory population.
    pub num_inhibitory: usize,
    /// The number of excitatory inputs of each inhibitory neuron.
    pub inhibitory_inputs: usize,
    /// The number of directed connections inside each excitatory module.
    pub connections_per_module: usize,
    /// Exclusive upper bound on excitatory-to-excitatory delays, also the depth of the delay line.
    pub max_delay: usize,
    /// The current injected per Poisson event.
    pub drive_current: f64,
    /// Scaling factor of the inhibitory-to-inhibitory path.
    pub inhibitory_to_inhibitory: f64,
    /// Scaling factor of the inhibitory-to-excitatory path.
    pub inhibitory_to_excitatory: f64,
    /// Scaling factor of the excitatory-to-inhibitory path.
    pub excitatory_to_inhibitory: f64,
    /// Scaling factor of the excitatory-to-excitatory path.
    pub excitatory_to_excitatory: f64,
    /// Whether inhibitory neurons are prevented from connecting to themselves.
    pub remove_inhibitory_self_loops: bool,
    /// The strategy used to wire the excitatory inputs of the inhibitory neurons.
    pub input_assignment: InputAssignment,
    /// The populations receiving the background drive.
    pub drive_target: DriveTarget,
    /// Safety cap on the number of draws of every rejection-sampling loop.
    pub max_attempts: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            num_modules: 8,
            excitatory_per_module: 100,
            num_inhibitory: 200,
            inhibitory_inputs: 4,
            connections_per_module: 1000,
            max_delay: 20,
            drive_current: 15.0,
            inhibitory_to_inhibitory: 1.0,
            inhibitory_to_excitatory: 2.0,
            excitatory_to_inhibitory: 50.0,
            excitatory_to_excitatory: 17.0,
            remove_inhibitory_self_loops: true,
            input_assignment: InputAssignment::Balanced,
            drive_target: DriveTarget::Excitatory,
            max_attempts: 1_000_000,
        }
    }
}

impl NetworkConfig {
    /// The number of layers, i.e., the inhibitory population followed by the modules.
    pub fn num_layers(&self) -> usize {
        self.num_modules + 1
    }

    /// The total number of neurons in the network.
    pub fn num_neurons(&self) -> usize {
        self.num_inhibitory + self.num_modules * self.excitatory_per_module
    }

    /// The size of every layer, in layer order.
    pub fn layer_sizes(&self) -> Vec<usize> {
        std::iter::once(self.num_inhibitory)
            .chain(std::iter::repeat(self.excitatory_per_module).take(self.num_modules))
            .collect()
    }

    /// Check the configuration, before any random number is drawn.
    pub fn validate(&self) -> Result<(), SNNError> {
        if self.num_modules == 0 || self.num_inhibitory == 0 {
            return Err(SNNError::InvalidParameter(
                "The network needs at least one module and one inhibitory neuron".to_string(),
            ));
        }
        if self.excitatory_per_module < 2 {
            return Err(SNNError::InvalidParameter(
                "Each module needs at least two neurons".to_string(),
            ));
        }

        let capacity = self.excitatory_per_module * (self.excitatory_per_module - 1);
        if self.connections_per_module > capacity {
            return Err(SNNError::IncompatibleTopology(format!(
                "{} connections do not fit in a module of {} neurons (at most {})",
                self.connections_per_module, self.excitatory_per_module, capacity
            )));
        }

        let max_sources = match self.input_assignment {
            InputAssignment::Balanced => {
                (self.num_inhibitory * self.inhibitory_inputs).div_ceil(self.num_modules)
            }
            InputAssignment::SingleModule => self.inhibitory_inputs,
        };
        if max_sources > self.excitatory_per_module {
            return Err(SNNError::IncompatibleTopology(format!(
                "{} distinct sources are needed per module but only {} neurons are available",
                max_sources, self.excitatory_per_module
            )));
        }

        if self.max_delay < 2 {
            return Err(SNNError::InvalidParameter(
                "The maximum delay must be at least 2".to_string(),
            ));
        }
        if !self.drive_current.is_finite() || self.drive_current < 0.0 {
            return Err(SNNError::InvalidParameter(
                "The drive current must be finite and non-negative".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(SNNError::InvalidParameter(
                "The attempt budget must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Load a configuration from a JSON file. Missing fields take their default value.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SNNError> {
        let file = File::open(path)?;
        let config: NetworkConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a JSON file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), SNNError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

/// Check that a rewiring probability lies in [0, 1].
pub fn validate_probability(p: f64) -> Result<(), SNNError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(SNNError::InvalidParameter(format!(
            "The rewiring probability must be in [0, 1], got {}",
            p
        )));
    }
    Ok(())
}

/// Where the averaging window sits relative to each sample point.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum WindowAlignment {
    /// The window ends at the sample point.
    Trailing,
    /// The window is centered on the sample point.
    Centered,
}

/// Parameters of the sliding-window firing-rate analysis (all in ms).
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Width of the averaging window.
    pub window: usize,
    /// Distance between two consecutive sample points.
    pub stride: usize,
    /// Initial transient discarded before the analysis.
    pub warmup: usize,
    /// Position of the window relative to the sample point.
    pub alignment: WindowAlignment,
}

impl Default for RateConfig {
    fn default() -> Self {
        RateConfig {
            window: 50,
            stride: 20,
            warmup: 0,
            alignment: WindowAlignment::Trailing,
        }
    }
}

impl RateConfig {
    pub fn validate(&self) -> Result<(), SNNError> {
        if self.window == 0 || self.stride == 0 {
            return Err(SNNError::InvalidParameter(
                "The window and the stride must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NetworkConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.num_layers(), 9);
        assert_eq!(config.layer_sizes()[0], 200);
        assert_eq!(config.layer_sizes()[1..], [100; 8]);
    }

    #[test]
    fn test_invalid_config() {
        let config = NetworkConfig {
            connections_per_module: 9901,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SNNError::IncompatibleTopology(_))
        ));

        let config = NetworkConfig {
            inhibitory_inputs: 5,
            num_modules: 2,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SNNError::IncompatibleTopology(_))
        ));

        let config = NetworkConfig {
            drive_current: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SNNError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_validate_probability() {
        assert_eq!(validate_probability(0.0), Ok(()));
        assert_eq!(validate_probability(1.0), Ok(()));
        assert!(validate_probability(1.5).is_err());
        assert!(validate_probability(-0.1).is_err());
        assert!(validate_probability(f64::NAN).is_err());
    }

    #[test]
    fn test_partial_json_config() {
        let config: NetworkConfig =
            serde_json::from_str(r#"{"num_modules": 4, "input_assignment": "SingleModule"}"#)
                .unwrap();
        assert_eq!(config.num_modules, 4);
        assert_eq!(config.input_assignment, InputAssignment::SingleModule);
        assert_eq!(config.excitatory_per_module, 100);
    }
}
