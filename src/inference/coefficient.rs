//! Coefficient inference calculations.

use faer::{Col, Mat};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use std::fmt;

/// Reference distribution of the Wald statistic β/SE.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatisticKind {
    /// Standard normal, used when the dispersion is fixed.
    Z,
    /// Student t with the given degrees of freedom, used when the dispersion is estimated.
    T(f64),
}

impl fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatisticKind::Z => f.write_str("z"),
            StatisticKind::T(df) => write!(f, "t({df})"),
        }
    }
}

/// Reference distribution as a CDF, or `None` when it is undefined (df ≤ 0).
enum Reference {
    Normal(Normal),
    StudentsT(StudentsT),
}

impl Reference {
    fn new(kind: StatisticKind) -> Option<Self> {
        match kind {
            StatisticKind::Z => Normal::new(0.0, 1.0).ok().map(Reference::Normal),
            StatisticKind::T(df) if df > 0.0 => {
                StudentsT::new(0.0, 1.0, df).ok().map(Reference::StudentsT)
            }
            StatisticKind::T(_) => None,
        }
    }

    fn sf(&self, x: f64) -> f64 {
        match self {
            Reference::Normal(d) => d.sf(x),
            Reference::StudentsT(d) => d.sf(x),
        }
    }

    fn inverse_cdf(&self, p: f64) -> f64 {
        match self {
            Reference::Normal(d) => d.inverse_cdf(p),
            Reference::StudentsT(d) => d.inverse_cdf(p),
        }
    }
}

/// Computes inference statistics for GLM coefficients.
pub struct CoefficientInference;

impl CoefficientInference {
    /// Standard errors from the diagonal of a covariance matrix.
    ///
    /// SE(β_j) = sqrt(Σ_jj); negative or non-finite variances give NaN.
    pub fn standard_errors(covariance: &Mat<f64>) -> Col<f64> {
        Col::from_fn(covariance.nrows(), |j| {
            let var = covariance[(j, j)];
            if var >= 0.0 && var.is_finite() {
                var.sqrt()
            } else {
                f64::NAN
            }
        })
    }

    /// Wald statistics β_j / SE(β_j).
    pub fn statistics(coefficients: &Col<f64>, std_errors: &Col<f64>) -> Col<f64> {
        Col::from_fn(coefficients.nrows(), |j| {
            if std_errors[j].is_nan() || std_errors[j] == 0.0 {
                f64::NAN
            } else {
                coefficients[j] / std_errors[j]
            }
        })
    }

    /// Two-sided p-values p_j = 2·P(|S| > |s_j|).
    pub fn p_values(statistics: &Col<f64>, kind: StatisticKind) -> Col<f64> {
        let n = statistics.nrows();
        match Reference::new(kind) {
            Some(dist) => Col::from_fn(n, |j| {
                let s = statistics[j];
                if s.is_nan() {
                    f64::NAN
                } else {
                    (2.0 * dist.sf(s.abs())).min(1.0)
                }
            }),
            None => Col::from_fn(n, |_| f64::NAN),
        }
    }

    /// Two-sided Wald confidence intervals β_j ± q·SE(β_j).
    pub fn confidence_intervals(
        coefficients: &Col<f64>,
        std_errors: &Col<f64>,
        kind: StatisticKind,
        confidence_level: f64,
    ) -> (Col<f64>, Col<f64>) {
        let n = coefficients.nrows();
        let crit = Reference::new(kind)
            .map(|dist| dist.inverse_cdf(1.0 - (1.0 - confidence_level) / 2.0))
            .unwrap_or(f64::NAN);

        let margin = |j: usize| crit * std_errors[j];
        let lower = Col::from_fn(n, |j| coefficients[j] - margin(j));
        let upper = Col::from_fn(n, |j| coefficients[j] + margin(j));
        (lower, upper)
    }
}
