//! GLM estimation: the entry point, IRLS and the weighted least-squares step.

pub mod error;
pub mod irls;
pub mod wls;
mod glm;

pub use error::{DivergenceReason, GlmError, InputError};
pub use glm::{GlmRegressor, GlmRegressorBuilder};
pub use irls::{IrlsOutcome, IrlsProblem, IrlsSolver, IrlsStatus};
pub use wls::{WeightedLeastSquares, WlsSolution};
