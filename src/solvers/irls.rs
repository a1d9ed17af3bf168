//! Iteratively reweighted least squares.
//!
//! The solver is a small state machine:
//!
//! ```text
//! Initializing ──▶ Iterating ──▶ Converged
//!                      │   └───▶ MaxIterExceeded (returned with converged = false)
//!                      └───────▶ Diverged (GlmError::Convergence)
//! ```
//!
//! Each iteration computes the working weights w = prior / (g′(μ)²·V(μ)) and
//! the working response z = η − offset + (y − μ)·g′(μ), solves the weighted
//! least-squares problem for β, and maps η = Xβ + offset back to the mean.
//! Convergence is judged on the relative change of the deviance.

use crate::core::{DesignMatrix, Family, GlmOptions, Link};
use crate::solvers::error::{DivergenceReason, GlmError};
use crate::solvers::wls::WeightedLeastSquares;
use crate::utils::weighted_mean;
use faer::Mat;
use tracing::{debug, warn};

/// Added to |D_old| in the convergence ratio so a near-zero deviance still converges.
const CONVERGENCE_EPS: f64 = 0.1;

/// Read-only inputs of one IRLS run. All slices have length n.
#[derive(Debug, Clone, Copy)]
pub struct IrlsProblem<'a> {
    pub x: &'a DesignMatrix,
    pub y: &'a [f64],
    pub offset: &'a [f64],
    pub prior_weights: &'a [f64],
}

/// Terminal state of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrlsStatus {
    Converged,
    MaxIterExceeded,
}

/// Snapshot of the final iterate.
#[derive(Debug, Clone)]
pub struct IrlsOutcome {
    pub coefficients: Vec<f64>,
    pub eta: Vec<f64>,
    pub mu: Vec<f64>,
    /// Working weights of the last least-squares solve (prior weights included).
    pub working_weights: Vec<f64>,
    /// (XᵀWX)⁻¹ of the last least-squares solve.
    pub xtwx_inverse: Mat<f64>,
    pub deviance: f64,
    pub iterations: usize,
    pub status: IrlsStatus,
    /// Deviance after every iteration, starting with the deviance of the starting mean.
    pub deviance_history: Vec<f64>,
    pub rank: usize,
}

impl IrlsOutcome {
    pub fn converged(&self) -> bool {
        self.status == IrlsStatus::Converged
    }
}

/// Per-iteration state, overwritten in place and dropped at termination.
struct IrlsState {
    beta: Vec<f64>,
    eta: Vec<f64>,
    mu: Vec<f64>,
    deviance: f64,
    iteration: usize,
}

/// IRLS driver for one family/link pair.
#[derive(Debug, Clone)]
pub struct IrlsSolver {
    family: Family,
    link: Link,
    options: GlmOptions,
}

impl IrlsSolver {
    pub fn new(family: Family, link: Link, options: GlmOptions) -> Self {
        Self {
            family,
            link,
            options,
        }
    }

    /// Run IRLS to convergence, to `max_iterations`, or to divergence.
    pub fn solve(&self, problem: &IrlsProblem<'_>) -> Result<IrlsOutcome, GlmError> {
        let wls = WeightedLeastSquares::new(self.options.rank_tolerance);
        let mut state = self.initialize(problem);
        let mut history = vec![state.deviance];

        loop {
            state.iteration += 1;
            let iteration = state.iteration;

            let (weights, z) = self
                .working_quantities(problem, &state)
                .map_err(|reason| GlmError::Convergence { iteration, reason })?;

            let solution = wls.solve(problem.x, &z, &weights)?;

            let xb = problem.x.matvec(&solution.coefficients);
            for i in 0..xb.len() {
                state.eta[i] = xb[i] + problem.offset[i];
                state.mu[i] = self.family.valid_mu(self.link.inverse(state.eta[i]));
            }
            state.beta = solution.coefficients;

            let deviance_old = state.deviance;
            state.deviance = self.family.deviance(problem.y, &state.mu, problem.prior_weights);
            if !state.deviance.is_finite() {
                warn!(iteration, deviance = state.deviance, "IRLS deviance is not finite");
                return Err(GlmError::Convergence {
                    iteration,
                    reason: DivergenceReason::NonFiniteDeviance,
                });
            }
            history.push(state.deviance);

            let change = (state.deviance - deviance_old).abs() / (deviance_old.abs() + CONVERGENCE_EPS);
            debug!(iteration, deviance = state.deviance, change, "IRLS iteration");

            // The starting mean is not a fitted model, so only later steps must descend.
            let increase = (state.deviance - deviance_old) / (deviance_old.abs() + CONVERGENCE_EPS);
            if iteration >= 2 && increase > self.options.divergence_tolerance {
                warn!(iteration, deviance = state.deviance, deviance_old, "IRLS deviance increased");
                return Err(GlmError::Convergence {
                    iteration,
                    reason: DivergenceReason::DevianceIncreasing,
                });
            }

            let status = if self.family.is_linear_with(&self.link) || change < self.options.tolerance {
                Some(IrlsStatus::Converged)
            } else {
                (iteration >= self.options.max_iterations).then_some(IrlsStatus::MaxIterExceeded)
            };

            if let Some(status) = status {
                match status {
                    IrlsStatus::Converged => {
                        debug!(iterations = iteration, deviance = state.deviance, "IRLS converged");
                    }
                    IrlsStatus::MaxIterExceeded => {
                        warn!(
                            max_iterations = self.options.max_iterations,
                            deviance = state.deviance,
                            change,
                            "IRLS did not converge"
                        );
                    }
                }
                return Ok(IrlsOutcome {
                    coefficients: state.beta,
                    eta: state.eta,
                    mu: state.mu,
                    working_weights: weights,
                    xtwx_inverse: solution.xtwx_inverse,
                    deviance: state.deviance,
                    iterations: iteration,
                    status,
                    deviance_history: history,
                    rank: solution.rank,
                });
            }
        }
    }

    fn initialize(&self, problem: &IrlsProblem<'_>) -> IrlsState {
        let y_mean = weighted_mean(problem.y, problem.prior_weights);
        let mu: Vec<f64> = problem
            .y
            .iter()
            .map(|&yi| self.family.starting_mu(yi, y_mean))
            .collect();
        let eta: Vec<f64> = mu.iter().map(|&m| self.link.forward(m)).collect();
        let deviance = self.family.deviance(problem.y, &mu, problem.prior_weights);

        IrlsState {
            beta: vec![0.0; problem.x.ncols()],
            eta,
            mu,
            deviance,
            iteration: 0,
        }
    }

    /// Working weights and working response at the current iterate.
    fn working_quantities(
        &self,
        problem: &IrlsProblem<'_>,
        state: &IrlsState,
    ) -> Result<(Vec<f64>, Vec<f64>), DivergenceReason> {
        let n = problem.y.len();
        let mut weights = vec![0.0; n];
        let mut z = vec![0.0; n];

        for i in 0..n {
            let eta_base = state.eta[i] - problem.offset[i];
            let prior = problem.prior_weights[i];
            if prior == 0.0 {
                z[i] = eta_base;
                continue;
            }
            let mu = state.mu[i];
            let g_prime = self.link.derivative(mu);
            weights[i] = prior / (g_prime * g_prime * self.family.variance(mu));
            z[i] = eta_base + (problem.y[i] - mu) * g_prime;

            if !weights[i].is_finite() || !z[i].is_finite() {
                return Err(DivergenceReason::DegenerateWeights);
            }
        }

        if weights.iter().all(|&w| w <= 0.0) {
            return Err(DivergenceReason::DegenerateWeights);
        }
        Ok((weights, z))
    }
}
