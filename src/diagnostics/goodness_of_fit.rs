//! Likelihood-based goodness-of-fit measures.

use crate::core::Family;

/// Scale at which the log-likelihood is evaluated.
///
/// The Gaussian uses the maximum-likelihood variance D / Σw, the Gamma uses
/// the estimated dispersion and every other family ignores the scale.
pub fn loglike_scale(family: &Family, deviance: f64, weight_sum: f64, dispersion: f64) -> f64 {
    match family {
        Family::Gaussian if weight_sum > 0.0 => deviance / weight_sum,
        Family::Gamma => dispersion,
        _ => 1.0,
    }
}

/// Akaike information criterion: -2ℓ + 2k.
pub fn aic(log_likelihood: f64, n_params: usize) -> f64 {
    -2.0 * log_likelihood + 2.0 * n_params as f64
}

/// Bayesian information criterion: -2ℓ + k ln(n).
pub fn bic(log_likelihood: f64, n_params: usize, n_obs: usize) -> f64 {
    -2.0 * log_likelihood + n_params as f64 * (n_obs as f64).ln()
}

/// Deviance-based pseudo-R²: 1 - D / D_null.
pub fn deviance_r_squared(deviance: f64, null_deviance: f64) -> f64 {
    if null_deviance == 0.0 {
        return f64::NAN;
    }
    1.0 - deviance / null_deviance
}

/// Deviance R² adjusted for the residual degrees of freedom:
/// 1 - (1 - D²)(n - 1) / (n - p).
pub fn adjusted_deviance_r_squared(d_squared: f64, n_obs: usize, n_params: usize) -> f64 {
    if n_obs <= n_params {
        return f64::NAN;
    }
    1.0 - (1.0 - d_squared) * (n_obs as f64 - 1.0) / (n_obs - n_params) as f64
}

/// McFadden's pseudo-R²: 1 - ℓ / ℓ_null.
pub fn mcfadden_r_squared(log_likelihood: f64, null_log_likelihood: f64) -> f64 {
    if null_log_likelihood == 0.0 {
        return f64::NAN;
    }
    1.0 - log_likelihood / null_log_likelihood
}

/// Adjusted McFadden pseudo-R²: 1 - (ℓ - k) / ℓ_null.
pub fn adjusted_mcfadden_r_squared(
    log_likelihood: f64,
    null_log_likelihood: f64,
    n_params: usize,
) -> f64 {
    if null_log_likelihood == 0.0 {
        return f64::NAN;
    }
    1.0 - (log_likelihood - n_params as f64) / null_log_likelihood
}
