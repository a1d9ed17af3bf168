//! Generalized linear models fitted by iteratively reweighted least squares.
//!
//! This library fits Gaussian, Poisson, quasi-Poisson, binomial, Gamma and
//! negative binomial GLMs on dense or sparse design matrices and reports
//! coefficient inference (standard errors, z/t statistics, p-values and
//! confidence intervals), deviance, likelihood-based fit measures and residuals.
//!
//! # Example
//!
//! ```rust,ignore
//! use spglm::prelude::*;
//! use faer::{Col, Mat};
//!
//! let x = DesignMatrix::from(Mat::from_fn(4, 2, |i, j| if j == 0 { 1.0 } else { (i + 1) as f64 }));
//! let y = Col::from_fn(4, |i| [2.0, 3.0, 5.0, 8.0][i]);
//!
//! // Poisson regression with the default log link
//! let fit = spglm::fit(&x, &y, Family::Poisson)?;
//! println!("β = {:?}", fit.coefficients());
//! println!("deviance = {}, AIC = {}", fit.deviance(), fit.aic());
//!
//! // Rate model with exposure and a non-default link
//! let fit = GlmRegressor::poisson()
//!     .link(Link::Sqrt)
//!     .exposure(Col::from_fn(4, |i| (i + 1) as f64))
//!     .build()?
//!     .fit(&x, &y)?;
//! ```

pub mod core;
pub mod diagnostics;
pub mod inference;
pub mod solvers;
pub mod utils;

use faer::Col;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{
        DesignMatrix, Family, FitResult, GlmOptions, GlmOptionsBuilder, Link, OptionsError,
    };
    pub use crate::inference::StatisticKind;
    pub use crate::solvers::{
        DivergenceReason, GlmError, GlmRegressor, GlmRegressorBuilder, InputError,
    };
}

pub use crate::core::{DesignMatrix, Family, FitResult, GlmOptions, Link};
pub use crate::solvers::{GlmError, GlmRegressor};

/// Fit a GLM with the family's default link and default options.
///
/// Shorthand for `GlmRegressor::builder(family).build()?.fit(x, y)`.
pub fn fit(x: &DesignMatrix, y: &Col<f64>, family: Family) -> Result<FitResult, GlmError> {
    GlmRegressor::builder(family).build()?.fit(x, y)
}
