//! Error module for the modular network library.
use std::error::Error;
use std::fmt;

/// Error types for the library.
#[derive(Debug, PartialEq)]
pub enum SNNError {
    /// Error for invalid parameters, e.g., a rewiring probability outside [0, 1].
    InvalidParameter(String),
    /// Error for a requested number of connections that cannot fit the population.
    IncompatibleTopology(String),
    /// Error for a broken topology invariant, e.g., a collision while wiring or a missing edge while rewiring.
    InvariantViolation(String),
    /// Error for a rejection-sampling loop that exhausted its attempt budget.
    RetryLimitExceeded(String),
    /// Error for an out-of-range module, layer or neuron index.
    OutOfBounds(String),
    /// Error for firing-rate series of different lengths.
    SeriesLengthMismatch { expected: usize, found: usize },
    /// Error for I/O operations.
    IOError(String),
    /// Error while parsing persisted data or configuration files.
    ParseError(String),
}

impl fmt::Display for SNNError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SNNError::InvalidParameter(e) => write!(f, "Invalid parameters: {}", e),
            SNNError::IncompatibleTopology(e) => write!(f, "Incompatible topology: {}", e),
            SNNError::InvariantViolation(e) => write!(f, "Topology invariant violated: {}", e),
            SNNError::RetryLimitExceeded(e) => write!(f, "Retry limit exceeded: {}", e),
            SNNError::OutOfBounds(e) => write!(f, "Index out of bounds: {}", e),
            SNNError::SeriesLengthMismatch { expected, found } => write!(
                f,
                "Firing-rate series have different lengths: expected {}, found {}",
                expected, found
            ),
            SNNError::IOError(e) => write!(f, "I/O error: {}", e),
            SNNError::ParseError(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl Error for SNNError {}

impl From<std::io::Error> for SNNError {
    fn from(e: std::io::Error) -> Self {
        SNNError::IOError(e.to_string())
    }
}

impl From<serde_json::Error> for SNNError {
    fn from(e: serde_json::Error) -> Self {
        SNNError::ParseError(e.to_string())
    }
}
