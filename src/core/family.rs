//! Exponential-family distributions for generalized linear models.
//!
//! A [`Family`] describes the variance function V(μ), the unit deviance and
//! the log-likelihood of a response distribution. It also owns the rules that
//! keep the mean inside the distribution's support ([`Family::valid_mu`]) and
//! decides which [`Link`] functions are admissible.
//!
//! # Reference
//!
//! - McCullagh, P. and Nelder, J.A. (1989). "Generalized Linear Models",
//!   2nd ed. Chapman & Hall. Chapter 2.
//! - Hilbe, J.M. (2011). "Negative Binomial Regression", 2nd ed.

use crate::core::link::{Link, FLOAT_EPS};
use crate::solvers::error::InputError;
use statrs::function::beta::{beta, checked_beta_reg};
use statrs::function::gamma::ln_gamma;
use std::f64::consts::PI;
use std::fmt;

/// Response distribution of a generalized linear model.
///
/// | Family | V(μ) | Default link | Dispersion |
/// |--------|------|--------------|------------|
/// | `Gaussian` | 1 | identity | estimated |
/// | `Poisson` | μ | log | 1 |
/// | `QuasiPoisson` | μ | log | estimated (Pearson) |
/// | `Binomial` | μ(1−μ) | logit | 1 |
/// | `Gamma` | μ² | log | estimated |
/// | `NegativeBinomial { alpha }` | μ + αμ² | log | 1 |
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Family {
    /// Normal response with constant variance.
    Gaussian,
    /// Count response with variance equal to the mean.
    Poisson,
    /// Poisson mean/variance relation with a free dispersion parameter.
    QuasiPoisson,
    /// Proportions in [0, 1]; prior weights act as trial counts.
    Binomial,
    /// Strictly positive continuous response with constant coefficient of variation.
    Gamma,
    /// Overdispersed counts with a fixed ancillary parameter α > 0.
    NegativeBinomial {
        /// Ancillary parameter α; the variance is μ + αμ².
        alpha: f64,
    },
}

impl Family {
    /// Negative binomial family with the given α.
    pub fn negative_binomial(alpha: f64) -> Self {
        Family::NegativeBinomial { alpha }
    }

    /// Short lowercase name of the family.
    pub fn name(&self) -> &'static str {
        match self {
            Family::Gaussian => "gaussian",
            Family::Poisson => "poisson",
            Family::QuasiPoisson => "quasipoisson",
            Family::Binomial => "binomial",
            Family::Gamma => "gamma",
            Family::NegativeBinomial { .. } => "negative_binomial",
        }
    }

    /// Link used when the caller does not choose one.
    pub fn default_link(&self) -> Link {
        match self {
            Family::Gaussian => Link::Identity,
            Family::Binomial => Link::Logit,
            Family::Poisson | Family::QuasiPoisson | Family::Gamma => Link::Log,
            Family::NegativeBinomial { .. } => Link::Log,
        }
    }

    /// Canonical link θ = g(μ) of the distribution.
    pub fn canonical_link(&self) -> Link {
        match self {
            Family::Gaussian => Link::Identity,
            Family::Poisson | Family::QuasiPoisson => Link::Log,
            Family::Binomial => Link::Logit,
            Family::Gamma => Link::Inverse,
            Family::NegativeBinomial { alpha } => Link::NegativeBinomial { alpha: *alpha },
        }
    }

    /// Whether `link` may be combined with this family.
    pub fn admits_link(&self, link: &Link) -> bool {
        match self {
            Family::Gaussian => matches!(link, Link::Identity | Link::Log | Link::Inverse),
            Family::Poisson | Family::QuasiPoisson => {
                matches!(link, Link::Log | Link::Identity | Link::Sqrt)
            }
            Family::Binomial => matches!(
                link,
                Link::Logit | Link::Probit | Link::Cauchy | Link::Log | Link::CLogLog | Link::Identity
            ),
            Family::Gamma => matches!(link, Link::Log | Link::Identity | Link::Inverse),
            Family::NegativeBinomial { .. } => matches!(
                link,
                Link::Log
                    | Link::CLogLog
                    | Link::Identity
                    | Link::NegativeBinomial { .. }
                    | Link::Power(_)
                    | Link::Sqrt
                    | Link::Inverse
                    | Link::InverseSquared
            ),
        }
    }

    /// Check the family's own parameters.
    pub fn validate(&self) -> Result<(), InputError> {
        if let Family::NegativeBinomial { alpha } = self {
            if !(alpha.is_finite() && *alpha > 0.0) {
                return Err(InputError::InvalidFamilyParameter {
                    family: self.name(),
                    name: "alpha",
                    value: *alpha,
                });
            }
        }
        Ok(())
    }

    /// Check that `link` is admissible and has valid parameters.
    pub fn check_link(&self, link: &Link) -> Result<(), InputError> {
        if !self.admits_link(link) || !link.has_valid_parameters() {
            return Err(InputError::UnsupportedLink {
                family: self.name(),
                link: *link,
            });
        }
        Ok(())
    }

    /// Whether the pairing is ordinary weighted least squares (one IRLS step is exact).
    pub fn is_linear_with(&self, link: &Link) -> bool {
        matches!(self, Family::Gaussian) && matches!(link, Link::Identity)
    }

    /// Dispersion fixed by the distribution, or `None` when it is estimated.
    pub fn fixed_dispersion(&self) -> Option<f64> {
        match self {
            Family::Poisson | Family::Binomial | Family::NegativeBinomial { .. } => Some(1.0),
            Family::Gaussian | Family::QuasiPoisson | Family::Gamma => None,
        }
    }

    /// Variance function V(μ).
    #[inline]
    pub fn variance(&self, mu: f64) -> f64 {
        match self {
            Family::Gaussian => 1.0,
            Family::Poisson | Family::QuasiPoisson => clip_positive(mu),
            Family::Binomial => {
                let p = clip_probability(mu);
                p * (1.0 - p)
            }
            Family::Gamma => {
                let m = clip_positive(mu);
                m * m
            }
            Family::NegativeBinomial { alpha } => {
                let m = clip_positive(mu);
                m + alpha * m * m
            }
        }
    }

    /// Derivative of the variance function V′(μ).
    #[inline]
    pub fn variance_derivative(&self, mu: f64) -> f64 {
        match self {
            Family::Gaussian => 0.0,
            Family::Poisson | Family::QuasiPoisson => 1.0,
            Family::Binomial => 1.0 - 2.0 * clip_probability(mu),
            Family::Gamma => 2.0 * clip_positive(mu),
            Family::NegativeBinomial { alpha } => 1.0 + 2.0 * alpha * clip_positive(mu),
        }
    }

    /// Project a mean into the family's support. NaN passes through unchanged.
    #[inline]
    pub fn valid_mu(&self, mu: f64) -> f64 {
        if mu.is_nan() {
            return mu;
        }
        match self {
            Family::Gaussian => mu,
            Family::Binomial => clip_probability(mu),
            _ => mu.max(FLOAT_EPS),
        }
    }

    /// Starting mean for one observation, given the weighted response mean.
    pub fn starting_mu(&self, y: f64, y_mean: f64) -> f64 {
        let mu = match self {
            Family::Gaussian => y,
            Family::Binomial => (y + 0.5) / 2.0,
            _ => (y + y_mean) / 2.0,
        };
        self.valid_mu(mu)
    }

    /// Whether a single response value lies in the family's support.
    pub fn admits_response(&self, y: f64) -> bool {
        if !y.is_finite() {
            return false;
        }
        match self {
            Family::Gaussian => true,
            Family::Poisson | Family::QuasiPoisson | Family::NegativeBinomial { .. } => y >= 0.0,
            Family::Binomial => (0.0..=1.0).contains(&y),
            Family::Gamma => y > 0.0,
        }
    }

    /// Check every response value, reporting the first one out of range.
    pub fn validate_response(&self, y: &[f64]) -> Result<(), InputError> {
        match y.iter().position(|&v| !self.admits_response(v)) {
            Some(index) => Err(InputError::ResponseOutOfRange {
                family: self.name(),
                index,
                value: y[index],
            }),
            None => Ok(()),
        }
    }

    /// Unit deviance d(y, μ).
    pub fn unit_deviance(&self, y: f64, mu: f64) -> f64 {
        match self {
            Family::Gaussian => {
                let r = y - mu;
                r * r
            }
            Family::Poisson | Family::QuasiPoisson => {
                let m = clip_positive(mu);
                if y == 0.0 {
                    2.0 * m
                } else {
                    2.0 * (y * (y / m).ln() - (y - m))
                }
            }
            Family::Binomial => {
                let p = clip_probability(mu);
                2.0 * (xlogy_ratio(y, p) + xlogy_ratio(1.0 - y, 1.0 - p))
            }
            Family::Gamma => {
                let m = clip_positive(mu);
                let ratio = clip_positive(y / m);
                2.0 * (-ratio.ln() + (y - m) / m)
            }
            Family::NegativeBinomial { alpha } => {
                let m = clip_positive(mu);
                if y == 0.0 {
                    2.0 / alpha * (alpha * m).ln_1p()
                } else {
                    let log_ratio = (alpha * y).ln_1p() - (alpha * m).ln_1p();
                    2.0 * (y * (y / m).ln() - (y + 1.0 / alpha) * log_ratio)
                }
            }
        }
    }

    /// Total deviance Σ wᵢ·d(yᵢ, μᵢ).
    pub fn deviance(&self, y: &[f64], mu: &[f64], weights: &[f64]) -> f64 {
        y.iter()
            .zip(mu)
            .zip(weights)
            .map(|((&yi, &mi), &wi)| wi * self.unit_deviance(yi, mi))
            .sum()
    }

    /// Signed deviance residual sign(y − μ)·√(w·d).
    pub fn deviance_residual(&self, y: f64, mu: f64, weight: f64) -> f64 {
        let d = (weight * self.unit_deviance(y, mu)).max(0.0);
        (y - mu).signum() * d.sqrt()
    }

    /// Log-likelihood contribution of one observation.
    ///
    /// Prior weights act as frequency weights, except for the binomial family
    /// where they are the number of trials behind the proportion `y`.
    /// `scale` is the dispersion (the variance for the Gaussian, the shape
    /// reciprocal for the Gamma) and is ignored by the other families.
    /// Quasi-Poisson has no likelihood and returns NaN.
    pub fn loglike_obs(&self, y: f64, mu: f64, weight: f64, scale: f64) -> f64 {
        if weight == 0.0 {
            return 0.0;
        }
        match self {
            Family::Gaussian => {
                let r = y - mu;
                weight * (-r * r / (2.0 * scale) - 0.5 * (2.0 * PI * scale).ln())
            }
            Family::Poisson => {
                let m = clip_positive(mu);
                weight * (y * m.ln() - m - ln_gamma(y + 1.0))
            }
            Family::QuasiPoisson => f64::NAN,
            Family::Binomial => {
                let p = clip_probability(mu);
                let successes = weight * y;
                let ln_choose = ln_gamma(weight + 1.0)
                    - ln_gamma(successes + 1.0)
                    - ln_gamma(weight - successes + 1.0);
                ln_choose + weight * (y * p.ln() + (1.0 - y) * (1.0 - p).ln())
            }
            Family::Gamma => {
                let m = clip_positive(mu);
                let nu = 1.0 / scale;
                let ratio = y / m;
                weight * (nu * (nu * ratio).ln() - nu * ratio - y.ln() - ln_gamma(nu))
            }
            Family::NegativeBinomial { alpha } => {
                let m = clip_positive(mu);
                let size = 1.0 / alpha;
                let am = alpha * m;
                weight
                    * (ln_gamma(y + size) - ln_gamma(size) - ln_gamma(y + 1.0)
                        + y * (am / (1.0 + am)).ln()
                        - size * am.ln_1p())
            }
        }
    }

    /// Total log-likelihood Σ ℓᵢ.
    ///
    /// A zero Gaussian or Gamma scale only arises from a fit with zero
    /// deviance, where the likelihood is unbounded; the result is then +∞.
    pub fn loglike(&self, y: &[f64], mu: &[f64], weights: &[f64], scale: f64) -> f64 {
        if scale == 0.0 && matches!(self, Family::Gaussian | Family::Gamma) {
            return f64::INFINITY;
        }
        y.iter()
            .zip(mu)
            .zip(weights)
            .map(|((&yi, &mi), &wi)| self.loglike_obs(yi, mi, wi, scale))
            .sum()
    }

    /// Anscombe residual, or `None` where the family has no closed form.
    ///
    /// The binomial residual uses the Cox-Snell form B(2/3, 2/3)·I_x(2/3, 2/3)
    /// and is scaled by the square root of the number of trials.
    pub fn anscombe_residual(&self, y: f64, mu: f64, weight: f64) -> Option<f64> {
        const TWO_THIRDS: f64 = 2.0 / 3.0;
        match self {
            Family::Gaussian => Some(y - mu),
            Family::Poisson | Family::QuasiPoisson => {
                let m = clip_positive(mu);
                Some(1.5 * (y.powf(TWO_THIRDS) - m.powf(TWO_THIRDS)) / m.powf(1.0 / 6.0))
            }
            Family::Gamma => {
                let m = clip_positive(mu);
                Some(3.0 * (y.cbrt() - m.cbrt()) / m.cbrt())
            }
            Family::Binomial => {
                let p = clip_probability(mu);
                let scale = beta(TWO_THIRDS, TWO_THIRDS);
                let cox_snell = |x: f64| {
                    checked_beta_reg(TWO_THIRDS, TWO_THIRDS, x)
                        .ok()
                        .map(|b| b * scale)
                };
                let diff = cox_snell(y)? - cox_snell(p)?;
                Some(weight.sqrt() * diff / (p * (1.0 - p)).powf(1.0 / 6.0))
            }
            Family::NegativeBinomial { .. } => None,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::NegativeBinomial { alpha } => write!(f, "negative_binomial(alpha={alpha})"),
            other => f.write_str(other.name()),
        }
    }
}

#[inline]
fn clip_probability(p: f64) -> f64 {
    p.clamp(FLOAT_EPS, 1.0 - FLOAT_EPS)
}

#[inline]
fn clip_positive(x: f64) -> f64 {
    x.max(FLOAT_EPS)
}

/// x·ln(x/m) with the convention 0·ln(0) = 0.
#[inline]
fn xlogy_ratio(x: f64, m: f64) -> f64 {
    if x <= 0.0 {
        0.0
    } else {
        x * (x / m).ln()
    }
}
