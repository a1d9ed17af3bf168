//! GLM-specific residual types and dispersion estimates.
//!
//! # Residual Types
//!
//! - **Response**: Raw residuals `(y - μ)`
//! - **Pearson**: `√w (y - μ) / sqrt(V(μ))`
//! - **Deviance**: `sign(y - μ) * sqrt(w d_i)` where `d_i` is unit deviance
//! - **Working**: `(y - μ) * (dη/dμ)` - used in IRLS
//! - **Anscombe**: variance-stabilizing transform of `y` and `μ`, where defined
//!
//! `w` are the prior weights.
//!
//! # Reference
//!
//! McCullagh, P. and Nelder, J.A. (1989). Generalized Linear Models, 2nd ed.

use crate::core::{Family, Link};
use faer::Col;

/// Compute response residuals: y - μ.
pub fn response_residuals(y: &[f64], mu: &[f64]) -> Col<f64> {
    Col::from_fn(y.len(), |i| y[i] - mu[i])
}

/// Compute Pearson residuals: √w (y - μ) / sqrt(V(μ)).
pub fn pearson_residuals(y: &[f64], mu: &[f64], weights: &[f64], family: &Family) -> Col<f64> {
    Col::from_fn(y.len(), |i| pearson_residual(y[i], mu[i], weights[i], family))
}

/// Compute deviance residuals: sign(y - μ) * sqrt(w d_i).
///
/// Their squares sum to the deviance.
pub fn deviance_residuals(y: &[f64], mu: &[f64], weights: &[f64], family: &Family) -> Col<f64> {
    Col::from_fn(y.len(), |i| family.deviance_residual(y[i], mu[i], weights[i]))
}

/// Compute working residuals: (y - μ) * (dη/dμ).
///
/// Related to the working response by z = η - offset + working_residual.
pub fn working_residuals(y: &[f64], mu: &[f64], link: &Link) -> Col<f64> {
    Col::from_fn(y.len(), |i| (y[i] - mu[i]) * link.derivative(mu[i]))
}

/// Compute Anscombe residuals, or `None` if the family has no closed form.
pub fn anscombe_residuals(
    y: &[f64],
    mu: &[f64],
    weights: &[f64],
    family: &Family,
) -> Option<Col<f64>> {
    let values: Option<Vec<f64>> = (0..y.len())
        .map(|i| family.anscombe_residual(y[i], mu[i], weights[i]))
        .collect();
    values.map(|v| Col::from_fn(v.len(), |i| v[i]))
}

/// Compute Pearson's chi-squared statistic: Σ w (y - μ)² / V(μ).
pub fn pearson_chi_squared(y: &[f64], mu: &[f64], weights: &[f64], family: &Family) -> f64 {
    (0..y.len())
        .map(|i| pearson_residual(y[i], mu[i], weights[i], family).powi(2))
        .sum()
}

/// Estimate the dispersion parameter φ.
///
/// Families with a fixed dispersion return it. Otherwise the quasi-Poisson
/// family uses X² / (n - p) and the Gaussian and Gamma families use D / (n - p).
/// A saturated model (n ≤ p) gets φ = 1.
pub fn estimate_dispersion(
    family: &Family,
    deviance: f64,
    pearson_chi2: f64,
    n_obs: usize,
    n_params: usize,
) -> f64 {
    if let Some(phi) = family.fixed_dispersion() {
        return phi;
    }
    if n_obs <= n_params {
        return 1.0;
    }
    let df = (n_obs - n_params) as f64;
    match family {
        Family::QuasiPoisson => pearson_chi2 / df,
        _ => deviance / df,
    }
}

fn pearson_residual(y: f64, mu: f64, weight: f64, family: &Family) -> f64 {
    let v = family.variance(mu);
    if v < 1e-300 {
        0.0
    } else {
        weight.sqrt() * (y - mu) / v.sqrt()
    }
}
