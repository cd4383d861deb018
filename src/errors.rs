//! Errors
//!
//! Custom error types used throughout the `consolidated_trees` crate.
use thiserror::Error;

/// Errors that can occur while configuring, fitting or using a consolidated tree.
#[derive(Debug, Error)]
pub enum ConsolidatedError {
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Two or more options that cannot be combined.
    #[error("Incompatible parameters: {0}")]
    IncompatibleParameters(String),
    /// A class distribution change that cannot be honoured for this dataset.
    #[error("Unsupported class distribution change: {0}")]
    UnsupportedClassDistribution(String),
    /// Malformed dataset.
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// Prediction was requested before fitting.
    #[error("The model has not been fitted yet.")]
    ModelNotFitted,
    /// Unable to write configuration to file.
    #[error("Unable to write configuration to file: {0}")]
    UnableToWrite(String),
    /// Unable to read configuration from file.
    #[error("Unable to read configuration from a file {0}")]
    UnableToRead(String),
}
