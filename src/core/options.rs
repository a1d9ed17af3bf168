//! Fitting options and configuration.

use thiserror::Error;

/// Configuration options for GLM fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct GlmOptions {
    /// Prepend a column of ones to the design matrix (default: false).
    pub with_intercept: bool,
    /// Whether to compute standard errors and inference statistics (default: true).
    pub compute_inference: bool,
    /// Confidence level for coefficient intervals (default: 0.95).
    pub confidence_level: f64,
    /// Maximum number of IRLS iterations (default: 100).
    pub max_iterations: usize,
    /// Relative deviance change below which IRLS is converged (default: 1e-8).
    pub tolerance: f64,
    /// Pivot ratio |R_jj|/‖√W xⱼ‖ at or below which a column counts as dependent (default: 1e-10).
    pub rank_tolerance: f64,
    /// Relative deviance increase tolerated between iterations (default: 1e-6).
    pub divergence_tolerance: f64,
}

impl Default for GlmOptions {
    fn default() -> Self {
        Self {
            with_intercept: false,
            compute_inference: true,
            confidence_level: 0.95,
            max_iterations: 100,
            tolerance: 1e-8,
            rank_tolerance: 1e-10,
            divergence_tolerance: 1e-6,
        }
    }
}

/// Errors that can occur when validating fitting options.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptionsError {
    #[error("tolerance must be positive and finite, got {0}")]
    InvalidTolerance(f64),
    #[error("max_iterations must be at least 1, got {0}")]
    InvalidMaxIterations(usize),
    #[error("rank_tolerance must be in [0, 1), got {0}")]
    InvalidRankTolerance(f64),
    #[error("confidence_level must be in (0, 1), got {0}")]
    InvalidConfidenceLevel(f64),
    #[error("divergence_tolerance must be non-negative and finite, got {0}")]
    InvalidDivergenceTolerance(f64),
}

impl GlmOptions {
    /// Create a new builder for GLM options.
    pub fn builder() -> GlmOptionsBuilder {
        GlmOptionsBuilder::default()
    }

    /// Validate the options and return an error if invalid.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(OptionsError::InvalidTolerance(self.tolerance));
        }
        if self.max_iterations < 1 {
            return Err(OptionsError::InvalidMaxIterations(self.max_iterations));
        }
        if !(0.0..1.0).contains(&self.rank_tolerance) {
            return Err(OptionsError::InvalidRankTolerance(self.rank_tolerance));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(OptionsError::InvalidConfidenceLevel(self.confidence_level));
        }
        if !(self.divergence_tolerance >= 0.0 && self.divergence_tolerance.is_finite()) {
            return Err(OptionsError::InvalidDivergenceTolerance(
                self.divergence_tolerance,
            ));
        }
        Ok(())
    }
}

/// Builder for `GlmOptions`.
#[derive(Debug, Clone, Default)]
pub struct GlmOptionsBuilder {
    options: GlmOptions,
}

impl GlmOptionsBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to prepend an intercept column.
    pub fn with_intercept(mut self, include: bool) -> Self {
        self.options.with_intercept = include;
        self
    }

    /// Set whether to compute inference statistics.
    pub fn compute_inference(mut self, compute: bool) -> Self {
        self.options.compute_inference = compute;
        self
    }

    /// Set the confidence level for confidence intervals.
    pub fn confidence_level(mut self, level: f64) -> Self {
        self.options.confidence_level = level;
        self
    }

    /// Set the maximum number of IRLS iterations.
    pub fn max_iterations(mut self, max_iter: usize) -> Self {
        self.options.max_iterations = max_iter;
        self
    }

    /// Set the convergence tolerance.
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.options.tolerance = tol;
        self
    }

    /// Set the rank tolerance of the least-squares factorization.
    pub fn rank_tolerance(mut self, tol: f64) -> Self {
        self.options.rank_tolerance = tol;
        self
    }

    /// Set the relative deviance increase tolerated between iterations.
    pub fn divergence_tolerance(mut self, tol: f64) -> Self {
        self.options.divergence_tolerance = tol;
        self
    }

    /// Build and validate the options.
    pub fn build(self) -> Result<GlmOptions, OptionsError> {
        self.options.validate()?;
        Ok(self.options)
    }

    /// Build the options without validation.
    pub fn build_unchecked(self) -> GlmOptions {
        self.options
    }
}
