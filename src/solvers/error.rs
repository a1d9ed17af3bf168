//! Error types for GLM fitting.

use crate::core::{Link, OptionsError};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during GLM fitting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GlmError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    #[error("design matrix is rank deficient: rank {rank} < {n_params} parameters")]
    SingularDesign { rank: usize, n_params: usize },

    #[error("IRLS diverged at iteration {iteration}: {reason}")]
    Convergence {
        iteration: usize,
        reason: DivergenceReason,
    },

    #[error("invalid options: {0}")]
    InvalidOptions(#[from] OptionsError),
}

/// Input problems detected before the first IRLS iteration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("dimension mismatch: {input} has {got} elements, expected {expected}")]
    DimensionMismatch {
        input: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("insufficient observations: need at least {needed}, got {got}")]
    InsufficientObservations { needed: usize, got: usize },

    #[error("design matrix has no columns")]
    EmptyDesign,

    #[error("sparse design matrix could not be built: {0}")]
    InvalidSparseDesign(String),

    #[error("{input} contains a non-finite value at index {index}")]
    NonFiniteValue { input: &'static str, index: usize },

    #[error("weights must be non-negative, got {value} at index {index}")]
    NegativeWeight { index: usize, value: f64 },

    #[error("exposure must be strictly positive, got {value} at index {index}")]
    NonPositiveExposure { index: usize, value: f64 },

    #[error("response {value} at index {index} is outside the valid range of the {family} family")]
    ResponseOutOfRange {
        family: &'static str,
        index: usize,
        value: f64,
    },

    #[error("link {link} is not supported by the {family} family")]
    UnsupportedLink { family: &'static str, link: Link },

    #[error("invalid {name} = {value} for the {family} family")]
    InvalidFamilyParameter {
        family: &'static str,
        name: &'static str,
        value: f64,
    },
}

/// Why the IRLS iteration was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivergenceReason {
    /// The deviance became NaN or infinite.
    NonFiniteDeviance,
    /// Working weights or working response were non-finite, or all weights vanished.
    DegenerateWeights,
    /// The deviance rose by more than the divergence tolerance after the first iteration.
    DevianceIncreasing,
}

impl fmt::Display for DivergenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            DivergenceReason::NonFiniteDeviance => "deviance is not finite",
            DivergenceReason::DegenerateWeights => "working weights degenerated",
            DivergenceReason::DevianceIncreasing => "deviance increased",
        };
        f.write_str(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GlmError::SingularDesign {
            rank: 2,
            n_params: 3,
        };
        assert_eq!(
            err.to_string(),
            "design matrix is rank deficient: rank 2 < 3 parameters"
        );

        let err = GlmError::Convergence {
            iteration: 7,
            reason: DivergenceReason::NonFiniteDeviance,
        };
        assert_eq!(
            err.to_string(),
            "IRLS diverged at iteration 7: deviance is not finite"
        );

        let err: GlmError = InputError::ResponseOutOfRange {
            family: "poisson",
            index: 3,
            value: -1.0,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "invalid input: response -1 at index 3 is outside the valid range of the poisson family"
        );

        let err = InputError::UnsupportedLink {
            family: "poisson",
            link: Link::Logit,
        };
        assert_eq!(
            err.to_string(),
            "link logit is not supported by the poisson family"
        );
    }

    #[test]
    fn test_options_error_conversion() {
        let err: GlmError = OptionsError::InvalidMaxIterations(0).into();
        assert!(matches!(err, GlmError::InvalidOptions(_)));
    }

    #[test]
    fn test_errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync + std::error::Error>() {}
        assert_send_sync::<GlmError>();
        assert_send_sync::<InputError>();
    }
}
