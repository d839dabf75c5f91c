//! Error types for the noisy TSP genetic algorithm.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type GaResult<T> = Result<T, GaError>;

/// Everything that can go wrong while loading an instance, configuring a run
/// or exporting results.
///
/// A run itself is a pure computation: once the instance and configuration
/// have been validated, the only failures left are programming defects.
#[derive(Debug, Error)]
pub enum GaError {
    /// The distance matrix or tour size cannot describe a TSP instance.
    #[error("invalid instance: {reason}")]
    InvalidInstance { reason: String },

    /// A probability, pressure or size is outside its valid range.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    /// A gene refers to a city outside the distance matrix.
    #[error("gene {gene} is out of range for a tour of size {tour_size}")]
    GeneOutOfRange { gene: usize, tour_size: usize },

    /// A genome is not a permutation of `0..len`.
    #[error("genome of length {len} is not a permutation")]
    InvalidPermutation { len: usize },

    /// Selection was asked to compare an individual with no cached fitness.
    #[error("individual {index} has not been evaluated")]
    UnevaluatedIndividual { index: usize },

    /// The Gaussian noise distribution could not be built.
    #[error("noise model error: {0}")]
    Noise(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl GaError {
    pub fn invalid_instance(reason: impl Into<String>) -> Self {
        GaError::InvalidInstance { reason: reason.into() }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        GaError::Configuration { reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GaError::invalid_instance("matrix is not square");
        assert_eq!(err.to_string(), "invalid instance: matrix is not square");

        let err = GaError::configuration("crossover_prob must lie in [0, 1]");
        assert!(err.to_string().starts_with("configuration error"));

        let err = GaError::UnevaluatedIndividual { index: 3 };
        assert_eq!(err.to_string(), "individual 3 has not been evaluated");
    }
}
