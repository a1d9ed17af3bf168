//! Residuals and goodness-of-fit measures for fitted GLMs.
//!
//! - **Residuals**: response, Pearson, deviance, working and Anscombe
//! - **Dispersion**: Pearson or deviance based estimate of φ
//! - **Goodness of fit**: log-likelihood scale, AIC/BIC and pseudo-R²

mod glm_residuals;
mod goodness_of_fit;

pub use glm_residuals::{
    anscombe_residuals, deviance_residuals, estimate_dispersion, pearson_chi_squared,
    pearson_residuals, response_residuals, working_residuals,
};
pub use goodness_of_fit::{
    adjusted_deviance_r_squared, adjusted_mcfadden_r_squared, aic, bic, deviance_r_squared,
    loglike_scale, mcfadden_r_squared,
};
