//! Fitted GLM results.

use crate::core::{DesignMatrix, Family, GlmOptions, Link};
use crate::diagnostics::{
    adjusted_deviance_r_squared, adjusted_mcfadden_r_squared, aic, anscombe_residuals, bic,
    deviance_r_squared, deviance_residuals, estimate_dispersion, loglike_scale,
    mcfadden_r_squared, pearson_chi_squared, pearson_residuals, response_residuals,
    working_residuals,
};
use crate::inference::{CoefficientInference, StatisticKind};
use crate::solvers::error::{GlmError, InputError};
use crate::solvers::irls::IrlsOutcome;
use faer::{Col, Mat};

/// Everything the result is derived from, borrowed from one `fit` call.
pub(crate) struct FitContext<'a> {
    pub y: &'a [f64],
    pub prior_weights: &'a [f64],
    pub family: Family,
    pub link: Link,
    pub options: &'a GlmOptions,
    /// Whether the fit prepended the intercept column itself.
    pub intercept_added: bool,
    /// Whether the design contains a constant column.
    pub has_constant: bool,
    /// Mean of the null model for each observation.
    pub null_mu: Vec<f64>,
}

/// Complete result from a GLM fit.
///
/// Immutable once built: every statistic is derived from the final IRLS
/// iterate when the fit finishes.
#[derive(Debug, Clone)]
pub struct FitResult {
    family: Family,
    link: Link,

    // ========== Coefficients ==========
    coefficients: Col<f64>,
    std_errors: Option<Col<f64>>,
    statistics: Option<Col<f64>>,
    statistic_kind: StatisticKind,
    p_values: Option<Col<f64>>,
    conf_interval_lower: Option<Col<f64>>,
    conf_interval_upper: Option<Col<f64>>,
    confidence_level: f64,
    covariance: Option<Mat<f64>>,

    // ========== Fit Statistics ==========
    dispersion: f64,
    deviance: f64,
    null_deviance: f64,
    pearson_chi2: f64,
    log_likelihood: f64,
    null_log_likelihood: f64,
    aic: f64,
    bic: f64,
    d_squared: f64,
    adj_d_squared: f64,
    mcfadden_r_squared: f64,
    adj_mcfadden_r_squared: f64,

    // ========== Dimensions ==========
    n_observations: usize,
    n_parameters: usize,
    rank: usize,
    df_model: usize,
    df_resid: usize,
    intercept_added: bool,

    // ========== Per-observation Values ==========
    fitted_values: Col<f64>,
    linear_predictor: Col<f64>,
    working_weights: Col<f64>,
    response_residuals: Col<f64>,
    working_residuals: Col<f64>,
    pearson_residuals: Col<f64>,
    deviance_residuals: Col<f64>,
    anscombe_residuals: Option<Col<f64>>,

    // ========== Convergence ==========
    iterations: usize,
    converged: bool,
    deviance_history: Vec<f64>,
}

impl FitResult {
    pub(crate) fn new(outcome: IrlsOutcome, ctx: FitContext<'_>) -> Self {
        let family = ctx.family;
        let y = ctx.y;
        let w = ctx.prior_weights;
        let mu = &outcome.mu;
        let p = outcome.coefficients.len();

        // Observations with zero prior weight do not count towards the sample size.
        let n_obs = w.iter().filter(|&&wi| wi > 0.0).count();
        let weight_sum: f64 = w.iter().sum();

        let deviance = outcome.deviance;
        let pearson_chi2 = pearson_chi_squared(y, mu, w, &family);
        let dispersion = estimate_dispersion(&family, deviance, pearson_chi2, n_obs, p);

        let null_deviance = family.deviance(y, &ctx.null_mu, w);
        let scale = loglike_scale(&family, deviance, weight_sum, dispersion);
        let null_scale = loglike_scale(&family, null_deviance, weight_sum, dispersion);
        let log_likelihood = family.loglike(y, mu, w, scale);
        let null_log_likelihood = family.loglike(y, &ctx.null_mu, w, null_scale);

        let df_resid = n_obs.saturating_sub(p);
        let df_model = if ctx.has_constant {
            p.saturating_sub(1)
        } else {
            p
        };

        let statistic_kind = match family.fixed_dispersion() {
            Some(_) => StatisticKind::Z,
            None => StatisticKind::T(df_resid as f64),
        };

        let coefficients = Col::from_fn(p, |j| outcome.coefficients[j]);

        let (covariance, std_errors, statistics, p_values, conf_interval_lower, conf_interval_upper) =
            if ctx.options.compute_inference {
                let cov = Mat::from_fn(p, p, |i, j| dispersion * outcome.xtwx_inverse[(i, j)]);
                let se = CoefficientInference::standard_errors(&cov);
                let stats = CoefficientInference::statistics(&coefficients, &se);
                let pv = CoefficientInference::p_values(&stats, statistic_kind);
                let (lower, upper) = CoefficientInference::confidence_intervals(
                    &coefficients,
                    &se,
                    statistic_kind,
                    ctx.options.confidence_level,
                );
                (Some(cov), Some(se), Some(stats), Some(pv), Some(lower), Some(upper))
            } else {
                (None, None, None, None, None, None)
            };

        let d_squared = deviance_r_squared(deviance, null_deviance);

        Self {
            family,
            link: ctx.link,
            coefficients,
            std_errors,
            statistics,
            statistic_kind,
            p_values,
            conf_interval_lower,
            conf_interval_upper,
            confidence_level: ctx.options.confidence_level,
            covariance,
            dispersion,
            deviance,
            null_deviance,
            pearson_chi2,
            log_likelihood,
            null_log_likelihood,
            aic: aic(log_likelihood, p),
            bic: bic(log_likelihood, p, n_obs),
            d_squared,
            adj_d_squared: adjusted_deviance_r_squared(d_squared, n_obs, p),
            mcfadden_r_squared: mcfadden_r_squared(log_likelihood, null_log_likelihood),
            adj_mcfadden_r_squared: adjusted_mcfadden_r_squared(
                log_likelihood,
                null_log_likelihood,
                p,
            ),
            n_observations: n_obs,
            n_parameters: p,
            rank: outcome.rank,
            df_model,
            df_resid,
            intercept_added: ctx.intercept_added,
            fitted_values: Col::from_fn(mu.len(), |i| mu[i]),
            linear_predictor: Col::from_fn(outcome.eta.len(), |i| outcome.eta[i]),
            working_weights: Col::from_fn(outcome.working_weights.len(), |i| {
                outcome.working_weights[i]
            }),
            response_residuals: response_residuals(y, mu),
            working_residuals: working_residuals(y, mu, &ctx.link),
            pearson_residuals: pearson_residuals(y, mu, w, &family),
            deviance_residuals: deviance_residuals(y, mu, w, &family),
            anscombe_residuals: anscombe_residuals(y, mu, w, &family),
            iterations: outcome.iterations,
            converged: outcome.converged(),
            deviance_history: outcome.deviance_history,
        }
    }

    /// Predict the linear predictor η = Xβ + offset for new data.
    ///
    /// `x_new` has the columns the model was fitted on; when the intercept
    /// was added by the fit, it is added again here.
    pub fn predict_linear(
        &self,
        x_new: &DesignMatrix,
        offset: Option<&Col<f64>>,
    ) -> Result<Col<f64>, GlmError> {
        let expected = if self.intercept_added {
            self.n_parameters - 1
        } else {
            self.n_parameters
        };
        if x_new.ncols() != expected {
            return Err(InputError::DimensionMismatch {
                input: "x_new columns",
                expected,
                got: x_new.ncols(),
            }
            .into());
        }
        let n = x_new.nrows();
        if let Some(off) = offset {
            if off.nrows() != n {
                return Err(InputError::DimensionMismatch {
                    input: "offset",
                    expected: n,
                    got: off.nrows(),
                }
                .into());
            }
        }

        let beta: Vec<f64> = self.coefficients.iter().copied().collect();
        let eta = if self.intercept_added {
            x_new.with_intercept()?.matvec(&beta)
        } else {
            x_new.matvec(&beta)
        };
        Ok(Col::from_fn(n, |i| {
            eta[i] + offset.map_or(0.0, |off| off[i])
        }))
    }

    /// Predict the mean response μ = g⁻¹(Xβ + offset) for new data.
    pub fn predict(
        &self,
        x_new: &DesignMatrix,
        offset: Option<&Col<f64>>,
    ) -> Result<Col<f64>, GlmError> {
        let eta = self.predict_linear(x_new, offset)?;
        Ok(Col::from_fn(eta.nrows(), |i| {
            self.family.valid_mu(self.link.inverse(eta[i]))
        }))
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn link(&self) -> Link {
        self.link
    }

    /// Estimated coefficients; the intercept comes first when it was added by the fit.
    pub fn coefficients(&self) -> &Col<f64> {
        &self.coefficients
    }

    /// Intercept estimate, if the fit prepended the intercept column.
    pub fn intercept(&self) -> Option<f64> {
        self.intercept_added.then(|| self.coefficients[0])
    }

    pub fn std_errors(&self) -> Option<&Col<f64>> {
        self.std_errors.as_ref()
    }

    /// Wald statistics β / SE (z or t, see [`FitResult::statistic_kind`]).
    pub fn statistics(&self) -> Option<&Col<f64>> {
        self.statistics.as_ref()
    }

    pub fn statistic_kind(&self) -> StatisticKind {
        self.statistic_kind
    }

    /// Two-sided p-values of the Wald statistics.
    pub fn p_values(&self) -> Option<&Col<f64>> {
        self.p_values.as_ref()
    }

    /// Lower and upper confidence bounds at [`FitResult::confidence_level`].
    pub fn confidence_intervals(&self) -> Option<(&Col<f64>, &Col<f64>)> {
        match (&self.conf_interval_lower, &self.conf_interval_upper) {
            (Some(lower), Some(upper)) => Some((lower, upper)),
            _ => None,
        }
    }

    pub fn confidence_level(&self) -> f64 {
        self.confidence_level
    }

    /// Coefficient covariance φ·(XᵀWX)⁻¹.
    pub fn covariance(&self) -> Option<&Mat<f64>> {
        self.covariance.as_ref()
    }

    pub fn dispersion(&self) -> f64 {
        self.dispersion
    }

    pub fn deviance(&self) -> f64 {
        self.deviance
    }

    pub fn null_deviance(&self) -> f64 {
        self.null_deviance
    }

    pub fn pearson_chi2(&self) -> f64 {
        self.pearson_chi2
    }

    /// Log-likelihood; NaN for the quasi-Poisson family and +∞ for a Gaussian
    /// or Gamma fit with zero deviance (AIC and BIC are then −∞).
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn null_log_likelihood(&self) -> f64 {
        self.null_log_likelihood
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn bic(&self) -> f64 {
        self.bic
    }

    /// Deviance pseudo-R²: 1 - D / D_null.
    pub fn deviance_r_squared(&self) -> f64 {
        self.d_squared
    }

    pub fn adjusted_deviance_r_squared(&self) -> f64 {
        self.adj_d_squared
    }

    pub fn mcfadden_r_squared(&self) -> f64 {
        self.mcfadden_r_squared
    }

    pub fn adjusted_mcfadden_r_squared(&self) -> f64 {
        self.adj_mcfadden_r_squared
    }

    /// Number of observations with positive prior weight.
    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    pub fn n_parameters(&self) -> usize {
        self.n_parameters
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Model degrees of freedom (p - 1 with a constant column, else p).
    pub fn df_model(&self) -> usize {
        self.df_model
    }

    /// Residual degrees of freedom (n - p).
    pub fn df_resid(&self) -> usize {
        self.df_resid
    }

    pub fn fitted_values(&self) -> &Col<f64> {
        &self.fitted_values
    }

    pub fn linear_predictor(&self) -> &Col<f64> {
        &self.linear_predictor
    }

    pub fn working_weights(&self) -> &Col<f64> {
        &self.working_weights
    }

    pub fn response_residuals(&self) -> &Col<f64> {
        &self.response_residuals
    }

    pub fn working_residuals(&self) -> &Col<f64> {
        &self.working_residuals
    }

    pub fn pearson_residuals(&self) -> &Col<f64> {
        &self.pearson_residuals
    }

    pub fn deviance_residuals(&self) -> &Col<f64> {
        &self.deviance_residuals
    }

    /// Anscombe residuals, `None` for the negative binomial family.
    pub fn anscombe_residuals(&self) -> Option<&Col<f64>> {
        self.anscombe_residuals.as_ref()
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// `false` when IRLS stopped at `max_iterations`.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Deviance at the starting mean followed by the deviance after each iteration.
    pub fn deviance_history(&self) -> &[f64] {
        &self.deviance_history
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{DesignMatrix, Family};
    use crate::inference::StatisticKind;
    use crate::solvers::{GlmError, GlmRegressor, InputError};
    use approx::assert_relative_eq;
    use faer::{Col, Mat};

    fn line_data() -> (DesignMatrix, Col<f64>) {
        let x = DesignMatrix::from(Mat::from_fn(5, 1, |i, _| i as f64));
        let y = Col::from_fn(5, |i| [0.1, 0.9, 2.2, 2.8, 4.0][i]);
        (x, y)
    }

    #[test]
    fn test_gaussian_statistics() {
        let (x, y) = line_data();
        let fit = GlmRegressor::gaussian()
            .with_intercept(true)
            .build()
            .unwrap()
            .fit(&x, &y)
            .unwrap();

        // Least squares: slope 0.97, intercept 0.06, RSS 0.091
        assert_relative_eq!(fit.coefficients()[0], 0.06, epsilon = 1e-10);
        assert_relative_eq!(fit.coefficients()[1], 0.97, epsilon = 1e-10);
        assert_relative_eq!(fit.deviance(), 0.091, epsilon = 1e-10);
        assert_relative_eq!(fit.dispersion(), 0.091 / 3.0, epsilon = 1e-10);
        assert_eq!(fit.statistic_kind(), StatisticKind::T(3.0));

        // SE(slope) = sqrt(σ² / Sxx) with Sxx = 10
        let se = fit.std_errors().unwrap();
        assert_relative_eq!(se[1], (0.091 / 3.0 / 10.0_f64).sqrt(), epsilon = 1e-10);

        // Gaussian log-likelihood at σ² = RSS / n
        let n = 5.0_f64;
        let ll = -0.5 * n * ((2.0 * std::f64::consts::PI * 0.091 / n).ln() + 1.0);
        assert_relative_eq!(fit.log_likelihood(), ll, epsilon = 1e-10);
        assert_relative_eq!(fit.aic(), -2.0 * ll + 4.0, epsilon = 1e-10);
        assert_relative_eq!(fit.bic(), -2.0 * ll + 2.0 * n.ln(), epsilon = 1e-10);

        // TSS = 9.5
        assert_relative_eq!(fit.null_deviance(), 9.5, epsilon = 1e-10);
        assert_relative_eq!(fit.deviance_r_squared(), 1.0 - 0.091 / 9.5, epsilon = 1e-10);
        assert_eq!(fit.intercept(), Some(fit.coefficients()[0]));
    }

    #[test]
    fn test_confidence_intervals_bracket_estimates() {
        let (x, y) = line_data();
        let fit = GlmRegressor::gaussian()
            .with_intercept(true)
            .confidence_level(0.9)
            .build()
            .unwrap()
            .fit(&x, &y)
            .unwrap();

        let (lower, upper) = fit.confidence_intervals().unwrap();
        for j in 0..2 {
            assert!(lower[j] < fit.coefficients()[j]);
            assert!(upper[j] > fit.coefficients()[j]);
            assert_relative_eq!(
                fit.coefficients()[j] - lower[j],
                upper[j] - fit.coefficients()[j],
                epsilon = 1e-12
            );
        }
        assert_relative_eq!(fit.confidence_level(), 0.9);
    }

    #[test]
    fn test_inference_disabled() {
        let (x, y) = line_data();
        let fit = GlmRegressor::gaussian()
            .with_intercept(true)
            .compute_inference(false)
            .build()
            .unwrap()
            .fit(&x, &y)
            .unwrap();

        assert!(fit.std_errors().is_none());
        assert!(fit.p_values().is_none());
        assert!(fit.covariance().is_none());
        assert!(fit.confidence_intervals().is_none());
        assert!(fit.deviance().is_finite());
    }

    #[test]
    fn test_predict_reapplies_intercept() {
        let x = DesignMatrix::from(Mat::from_fn(4, 1, |i, _| (i + 1) as f64));
        let y = Col::from_fn(4, |i| [2.0, 3.0, 5.0, 8.0][i]);
        let fit = GlmRegressor::poisson()
            .with_intercept(true)
            .build()
            .unwrap()
            .fit(&x, &y)
            .unwrap();

        let predicted = fit.predict(&x, None).unwrap();
        for i in 0..4 {
            assert_relative_eq!(predicted[i], fit.fitted_values()[i], epsilon = 1e-12);
        }

        let x_new = DesignMatrix::from(Mat::from_fn(1, 1, |_, _| 0.0));
        let offset = Col::from_fn(1, |_| 2.0_f64.ln());
        let eta = fit.predict_linear(&x_new, Some(&offset)).unwrap();
        assert_relative_eq!(eta[0], fit.coefficients()[0] + 2.0_f64.ln(), epsilon = 1e-12);
        let mu = fit.predict(&x_new, Some(&offset)).unwrap();
        assert_relative_eq!(mu[0], 2.0 * fit.coefficients()[0].exp(), epsilon = 1e-10);

        let wrong = DesignMatrix::from(Mat::from_fn(1, 2, |_, _| 0.0));
        assert_eq!(
            fit.predict(&wrong, None).unwrap_err(),
            GlmError::InvalidInput(InputError::DimensionMismatch {
                input: "x_new columns",
                expected: 1,
                got: 2
            })
        );
    }

    #[test]
    fn test_residual_identities() {
        let x = DesignMatrix::from(Mat::from_fn(4, 1, |i, _| (i + 1) as f64));
        let y = Col::from_fn(4, |i| [2.0, 3.0, 5.0, 8.0][i]);
        let fit = GlmRegressor::poisson()
            .with_intercept(true)
            .build()
            .unwrap()
            .fit(&x, &y)
            .unwrap();

        let dev: f64 = fit.deviance_residuals().iter().map(|r| r * r).sum();
        assert_relative_eq!(dev, fit.deviance(), epsilon = 1e-10);
        let chi2: f64 = fit.pearson_residuals().iter().map(|r| r * r).sum();
        assert_relative_eq!(chi2, fit.pearson_chi2(), epsilon = 1e-10);
        for i in 0..4 {
            assert_relative_eq!(
                fit.response_residuals()[i],
                y[i] - fit.fitted_values()[i],
                epsilon = 1e-12
            );
            // Log link: working residual = (y - μ) / μ
            assert_relative_eq!(
                fit.working_residuals()[i],
                (y[i] - fit.fitted_values()[i]) / fit.fitted_values()[i],
                epsilon = 1e-12
            );
        }
        assert!(fit.anscombe_residuals().is_some());
        assert_eq!(fit.family(), Family::Poisson);
        assert_eq!(fit.statistic_kind(), StatisticKind::Z);
        assert_relative_eq!(fit.dispersion(), 1.0);
    }
}
