//! Generalized linear model estimator.
//!
//! Fits any [`Family`]/[`Link`] pairing with IRLS on a dense or sparse
//! design matrix.
//!
//! # Example
//!
//! ```rust,ignore
//! use spglm::prelude::*;
//! use faer::{Col, Mat};
//!
//! let x = DesignMatrix::from(Mat::from_fn(4, 1, |i, _| (i + 1) as f64));
//! let y = Col::from_fn(4, |i| [2.0, 3.0, 5.0, 8.0][i]);
//!
//! let fit = GlmRegressor::poisson()
//!     .with_intercept(true)
//!     .build()?
//!     .fit(&x, &y)?;
//!
//! println!("β = {:?}, deviance = {}", fit.coefficients(), fit.deviance());
//! ```

use crate::core::{
    DesignMatrix, Family, FitContext, FitResult, GlmOptions, GlmOptionsBuilder, Link,
};
use crate::solvers::error::{GlmError, InputError};
use crate::solvers::irls::{IrlsProblem, IrlsSolver};
use crate::utils::{intercept_column, weighted_mean};
use faer::{Col, Mat};
use tracing::{debug, warn};

/// Tolerance for treating a design column as constant.
const CONSTANT_COLUMN_TOL: f64 = 1e-10;

/// GLM regression estimator.
///
/// # Model
///
/// - `E[Y] = μ = g⁻¹(Xβ + offset)` with link g
/// - `Var[Y] = φ·V(μ) / w` with the family's variance function V
#[derive(Debug, Clone)]
pub struct GlmRegressor {
    options: GlmOptions,
    family: Family,
    link: Link,
    offset: Option<Col<f64>>,
    exposure: Option<Col<f64>>,
    weights: Option<Col<f64>>,
}

impl GlmRegressor {
    /// Create a regressor with the family's default link and no offset or weights.
    pub fn new(family: Family, options: GlmOptions) -> Self {
        Self {
            options,
            family,
            link: family.default_link(),
            offset: None,
            exposure: None,
            weights: None,
        }
    }

    /// Create a builder for the given family.
    pub fn builder(family: Family) -> GlmRegressorBuilder {
        GlmRegressorBuilder::new(family)
    }

    /// Builder for ordinary (Gaussian, identity link) regression.
    pub fn gaussian() -> GlmRegressorBuilder {
        GlmRegressorBuilder::new(Family::Gaussian)
    }

    /// Builder for Poisson regression with the log link.
    pub fn poisson() -> GlmRegressorBuilder {
        GlmRegressorBuilder::new(Family::Poisson)
    }

    /// Builder for logistic regression (binomial family, logit link).
    pub fn logistic() -> GlmRegressorBuilder {
        GlmRegressorBuilder::new(Family::Binomial)
    }

    /// Builder for probit regression (binomial family, probit link).
    pub fn probit() -> GlmRegressorBuilder {
        GlmRegressorBuilder::new(Family::Binomial).link(Link::Probit)
    }

    /// Builder for Gamma regression with the log link.
    pub fn gamma() -> GlmRegressorBuilder {
        GlmRegressorBuilder::new(Family::Gamma)
    }

    /// Builder for negative binomial regression with fixed α.
    pub fn negative_binomial(alpha: f64) -> GlmRegressorBuilder {
        GlmRegressorBuilder::new(Family::negative_binomial(alpha))
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn link(&self) -> Link {
        self.link
    }

    pub fn options(&self) -> &GlmOptions {
        &self.options
    }

    /// Fit the model.
    ///
    /// Inputs are validated before any iteration runs. Rank deficiency and
    /// divergence are errors; hitting `max_iterations` is not, the result
    /// then reports `converged() == false`.
    #[tracing::instrument(
        skip(self, x, y),
        fields(family = %self.family, link = %self.link, n = x.nrows(), p = x.ncols())
    )]
    pub fn fit(&self, x: &DesignMatrix, y: &Col<f64>) -> Result<FitResult, GlmError> {
        self.options.validate()?;
        self.family.validate()?;
        self.family.check_link(&self.link)?;

        let n = x.nrows();
        let n_params = if self.options.with_intercept {
            x.ncols() + 1
        } else {
            x.ncols()
        };
        if n_params == 0 {
            return Err(InputError::EmptyDesign.into());
        }
        if n == 0 || n < n_params {
            return Err(InputError::InsufficientObservations {
                needed: n_params,
                got: n,
            }
            .into());
        }

        check_length("y", n, y.nrows())?;
        for (name, values) in [
            ("offset", &self.offset),
            ("exposure", &self.exposure),
            ("weights", &self.weights),
        ] {
            if let Some(v) = values {
                check_length(name, n, v.nrows())?;
            }
        }

        if let Some(index) = x.first_non_finite() {
            return Err(InputError::NonFiniteValue { input: "x", index }.into());
        }
        let y_vec: Vec<f64> = y.iter().copied().collect();
        check_finite("y", &y_vec)?;

        let prior_weights: Vec<f64> = match &self.weights {
            Some(w) => {
                let w: Vec<f64> = w.iter().copied().collect();
                check_finite("weights", &w)?;
                if let Some(index) = w.iter().position(|&v| v < 0.0) {
                    return Err(InputError::NegativeWeight {
                        index,
                        value: w[index],
                    }
                    .into());
                }
                w
            }
            None => vec![1.0; n],
        };

        let mut offset: Vec<f64> = match &self.offset {
            Some(o) => {
                let o: Vec<f64> = o.iter().copied().collect();
                check_finite("offset", &o)?;
                o
            }
            None => vec![0.0; n],
        };
        if let Some(exposure) = &self.exposure {
            for (i, &e) in exposure.iter().enumerate() {
                if !e.is_finite() {
                    return Err(InputError::NonFiniteValue {
                        input: "exposure",
                        index: i,
                    }
                    .into());
                }
                if e <= 0.0 {
                    return Err(InputError::NonPositiveExposure { index: i, value: e }.into());
                }
                offset[i] += e.ln();
            }
        }

        self.family.validate_response(&y_vec)?;

        let augmented;
        let design = if self.options.with_intercept {
            augmented = x.with_intercept()?;
            &augmented
        } else {
            x
        };

        let problem = IrlsProblem {
            x: design,
            y: &y_vec,
            offset: &offset,
            prior_weights: &prior_weights,
        };
        let solver = IrlsSolver::new(self.family, self.link, self.options.clone());
        let outcome = solver.solve(&problem)?;

        debug!(
            iterations = outcome.iterations,
            deviance = outcome.deviance,
            converged = outcome.converged(),
            "GLM fit finished"
        );

        let has_constant = self.options.with_intercept
            || intercept_column(design, CONSTANT_COLUMN_TOL).is_some();
        let null_mu = self.null_mean(&problem, has_constant);

        Ok(FitResult::new(
            outcome,
            FitContext {
                y: &y_vec,
                prior_weights: &prior_weights,
                family: self.family,
                link: self.link,
                options: &self.options,
                intercept_added: self.options.with_intercept,
                has_constant,
                null_mu,
            },
        ))
    }

    /// Mean of the null model used for the null deviance and null log-likelihood.
    ///
    /// With a constant column the null model is intercept-only: the weighted
    /// mean of y without an offset, an intercept-only IRLS fit with one.
    /// Without a constant column it is the offset-only model μ = g⁻¹(offset).
    fn null_mean(&self, problem: &IrlsProblem<'_>, has_constant: bool) -> Vec<f64> {
        let n = problem.y.len();
        let has_offset = problem.offset.iter().any(|&o| o != 0.0);

        if !has_constant {
            return problem
                .offset
                .iter()
                .map(|&o| self.family.valid_mu(self.link.inverse(o)))
                .collect();
        }
        if !has_offset {
            let mean = weighted_mean(problem.y, problem.prior_weights);
            return vec![self.family.valid_mu(mean); n];
        }

        let ones = DesignMatrix::Dense(Mat::from_fn(n, 1, |_, _| 1.0));
        let null_problem = IrlsProblem { x: &ones, ..*problem };
        match IrlsSolver::new(self.family, self.link, self.options.clone()).solve(&null_problem) {
            Ok(outcome) => outcome.mu,
            Err(err) => {
                warn!(error = %err, "intercept-only null model failed to fit");
                vec![f64::NAN; n]
            }
        }
    }
}

fn check_length(input: &'static str, expected: usize, got: usize) -> Result<(), InputError> {
    if expected != got {
        return Err(InputError::DimensionMismatch {
            input,
            expected,
            got,
        });
    }
    Ok(())
}

fn check_finite(input: &'static str, values: &[f64]) -> Result<(), InputError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(InputError::NonFiniteValue { input, index }),
        None => Ok(()),
    }
}

/// Builder for [`GlmRegressor`].
#[derive(Debug, Clone)]
pub struct GlmRegressorBuilder {
    options_builder: GlmOptionsBuilder,
    family: Family,
    link: Option<Link>,
    offset: Option<Col<f64>>,
    exposure: Option<Col<f64>>,
    weights: Option<Col<f64>>,
}

impl GlmRegressorBuilder {
    pub fn new(family: Family) -> Self {
        Self {
            options_builder: GlmOptionsBuilder::default(),
            family,
            link: None,
            offset: None,
            exposure: None,
            weights: None,
        }
    }

    /// Set the link function. Defaults to the family's default link.
    pub fn link(mut self, link: Link) -> Self {
        self.link = Some(link);
        self
    }

    /// Set the offset, added to the linear predictor: η = Xβ + offset.
    pub fn offset(mut self, offset: Col<f64>) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set the exposure. `ln(exposure)` is added to the offset.
    pub fn exposure(mut self, exposure: Col<f64>) -> Self {
        self.exposure = Some(exposure);
        self
    }

    /// Set non-negative prior weights (trial counts for binomial proportions).
    pub fn weights(mut self, weights: Col<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Prepend a column of ones to the design matrix.
    pub fn with_intercept(mut self, include: bool) -> Self {
        self.options_builder = self.options_builder.with_intercept(include);
        self
    }

    pub fn compute_inference(mut self, compute: bool) -> Self {
        self.options_builder = self.options_builder.compute_inference(compute);
        self
    }

    pub fn confidence_level(mut self, level: f64) -> Self {
        self.options_builder = self.options_builder.confidence_level(level);
        self
    }

    pub fn max_iterations(mut self, max_iter: usize) -> Self {
        self.options_builder = self.options_builder.max_iterations(max_iter);
        self
    }

    /// Set the convergence tolerance on the relative deviance change.
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.options_builder = self.options_builder.tolerance(tol);
        self
    }

    pub fn rank_tolerance(mut self, tol: f64) -> Self {
        self.options_builder = self.options_builder.rank_tolerance(tol);
        self
    }

    pub fn divergence_tolerance(mut self, tol: f64) -> Self {
        self.options_builder = self.options_builder.divergence_tolerance(tol);
        self
    }

    /// Build the regressor, validating the options, the family and the link.
    pub fn build(self) -> Result<GlmRegressor, GlmError> {
        let options = self.options_builder.build()?;
        self.family.validate()?;
        let link = self.link.unwrap_or_else(|| self.family.default_link());
        self.family.check_link(&link)?;

        Ok(GlmRegressor {
            options,
            family: self.family,
            link,
            offset: self.offset,
            exposure: self.exposure,
            weights: self.weights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OptionsError;
    use approx::assert_relative_eq;

    fn design(values: &[f64]) -> DesignMatrix {
        DesignMatrix::from(Mat::from_fn(values.len(), 1, |i, _| values[i]))
    }

    fn col(values: &[f64]) -> Col<f64> {
        Col::from_fn(values.len(), |i| values[i])
    }

    #[test]
    fn test_builder_defaults_to_family_link() {
        let model = GlmRegressor::logistic().build().unwrap();
        assert_eq!(model.link(), Link::Logit);
        assert_eq!(model.options(), &GlmOptions::default());

        let model = GlmRegressor::gamma().build().unwrap();
        assert_eq!(model.link(), Link::Log);
    }

    #[test]
    fn test_builder_rejects_invalid_configuration() {
        let err = GlmRegressor::poisson().tolerance(-1.0).build().unwrap_err();
        assert_eq!(err, GlmError::InvalidOptions(OptionsError::InvalidTolerance(-1.0)));

        let err = GlmRegressor::poisson().link(Link::Logit).build().unwrap_err();
        assert!(matches!(
            err,
            GlmError::InvalidInput(InputError::UnsupportedLink { family: "poisson", .. })
        ));

        let err = GlmRegressor::negative_binomial(0.0).build().unwrap_err();
        assert!(matches!(
            err,
            GlmError::InvalidInput(InputError::InvalidFamilyParameter { name: "alpha", .. })
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let model = GlmRegressor::poisson().with_intercept(true).build().unwrap();
        let err = model
            .fit(&design(&[1.0, 2.0, 3.0]), &col(&[1.0, 2.0]))
            .unwrap_err();
        assert_eq!(
            err,
            GlmError::InvalidInput(InputError::DimensionMismatch {
                input: "y",
                expected: 3,
                got: 2
            })
        );

        let model = GlmRegressor::poisson()
            .with_intercept(true)
            .offset(col(&[0.0, 0.0]))
            .build()
            .unwrap();
        let err = model
            .fit(&design(&[1.0, 2.0, 3.0]), &col(&[1.0, 2.0, 3.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            GlmError::InvalidInput(InputError::DimensionMismatch { input: "offset", .. })
        ));
    }

    #[test]
    fn test_empty_and_small_designs() {
        let model = GlmRegressor::gaussian().build().unwrap();
        let x = DesignMatrix::from(Mat::<f64>::zeros(3, 0));
        let err = model.fit(&x, &col(&[1.0, 2.0, 3.0])).unwrap_err();
        assert_eq!(err, GlmError::InvalidInput(InputError::EmptyDesign));

        let model = GlmRegressor::gaussian().with_intercept(true).build().unwrap();
        let x = DesignMatrix::from(Mat::from_fn(1, 2, |_, j| j as f64));
        let err = model.fit(&x, &col(&[1.0])).unwrap_err();
        assert_eq!(
            err,
            GlmError::InvalidInput(InputError::InsufficientObservations { needed: 3, got: 1 })
        );
    }

    #[test]
    fn test_invalid_values_rejected_before_iteration() {
        let x = design(&[1.0, 2.0, 3.0, 4.0]);

        let model = GlmRegressor::poisson().with_intercept(true).build().unwrap();
        let err = model.fit(&x, &col(&[1.0, f64::NAN, 2.0, 3.0])).unwrap_err();
        assert_eq!(
            err,
            GlmError::InvalidInput(InputError::NonFiniteValue { input: "y", index: 1 })
        );

        let model = GlmRegressor::poisson()
            .with_intercept(true)
            .weights(col(&[1.0, 1.0, -2.0, 1.0]))
            .build()
            .unwrap();
        let err = model.fit(&x, &col(&[1.0, 2.0, 2.0, 3.0])).unwrap_err();
        assert_eq!(
            err,
            GlmError::InvalidInput(InputError::NegativeWeight { index: 2, value: -2.0 })
        );

        let model = GlmRegressor::poisson()
            .with_intercept(true)
            .exposure(col(&[1.0, 0.0, 2.0, 1.0]))
            .build()
            .unwrap();
        let err = model.fit(&x, &col(&[1.0, 2.0, 2.0, 3.0])).unwrap_err();
        assert_eq!(
            err,
            GlmError::InvalidInput(InputError::NonPositiveExposure { index: 1, value: 0.0 })
        );

        let model = GlmRegressor::logistic().with_intercept(true).build().unwrap();
        let err = model.fit(&x, &col(&[0.0, 1.0, 1.5, 0.0])).unwrap_err();
        assert!(matches!(
            err,
            GlmError::InvalidInput(InputError::ResponseOutOfRange {
                family: "binomial",
                index: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_non_finite_design_entry() {
        let x = DesignMatrix::from(Mat::from_fn(3, 2, |i, j| {
            if i == 2 && j == 1 {
                f64::INFINITY
            } else {
                (i + j) as f64
            }
        }));
        let model = GlmRegressor::gaussian().build().unwrap();
        let err = model.fit(&x, &col(&[1.0, 2.0, 3.0])).unwrap_err();
        assert_eq!(
            err,
            GlmError::InvalidInput(InputError::NonFiniteValue { input: "x", index: 5 })
        );
    }

    #[test]
    fn test_null_model_with_intercept_is_weighted_mean() {
        let x = design(&[1.0, 2.0, 3.0, 4.0]);
        let y = col(&[2.0, 3.0, 5.0, 8.0]);
        let fit = GlmRegressor::poisson()
            .with_intercept(true)
            .build()
            .unwrap()
            .fit(&x, &y)
            .unwrap();

        let mean = 4.5;
        let expected: f64 = [2.0_f64, 3.0, 5.0, 8.0]
            .iter()
            .map(|&yi| 2.0 * (yi * (yi / mean).ln() - (yi - mean)))
            .sum();
        assert_relative_eq!(fit.null_deviance(), expected, epsilon = 1e-10);
        assert_eq!(fit.df_model(), 1);
        assert_eq!(fit.df_resid(), 2);
    }

    #[test]
    fn test_null_model_with_offset_matches_weighted_mean_without_covariates() {
        // An intercept-only fit with a constant offset absorbs the offset into the intercept.
        let x = design(&[1.0, 2.0, 3.0, 4.0]);
        let y = col(&[2.0, 3.0, 5.0, 8.0]);
        let plain = GlmRegressor::poisson()
            .with_intercept(true)
            .build()
            .unwrap()
            .fit(&x, &y)
            .unwrap();
        let shifted = GlmRegressor::poisson()
            .with_intercept(true)
            .offset(col(&[0.5; 4]))
            .build()
            .unwrap()
            .fit(&x, &y)
            .unwrap();

        assert_relative_eq!(shifted.null_deviance(), plain.null_deviance(), epsilon = 1e-6);
        assert_relative_eq!(shifted.deviance(), plain.deviance(), epsilon = 1e-8);
        assert_relative_eq!(
            shifted.coefficients()[0] + 0.5,
            plain.coefficients()[0],
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_without_constant_column_df_model_counts_all_parameters() {
        let x = design(&[1.0, 2.0, 3.0, 4.0]);
        let y = col(&[2.0, 3.0, 5.0, 8.0]);
        let fit = GlmRegressor::poisson().build().unwrap().fit(&x, &y).unwrap();

        assert_eq!(fit.df_model(), 1);
        assert_eq!(fit.df_resid(), 3);
        // Null model is μ = exp(0) = 1 everywhere.
        let expected: f64 = [2.0_f64, 3.0, 5.0, 8.0]
            .iter()
            .map(|&yi| 2.0 * (yi * yi.ln() - (yi - 1.0)))
            .sum();
        assert_relative_eq!(fit.null_deviance(), expected, epsilon = 1e-10);
        assert!(fit.intercept().is_none());
    }
}
