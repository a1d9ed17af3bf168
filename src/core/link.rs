//! Link functions for generalized linear models.
//!
//! A link g maps the mean response μ onto the linear predictor η = g(μ).
//! Every variant provides the same small set of operations: the forward
//! transform, its inverse, the derivative dη/dμ (which drives the IRLS
//! weights), the derivative of the inverse dμ/dη and the second derivative.
//!
//! Inputs outside a link's domain are clipped by machine epsilon instead of
//! producing infinities, and inverses are kept inside the link's natural
//! range. Out-of-range values are a common cause of IRLS divergence, so
//! they are clipped rather than rejected.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use std::f64::consts::PI;
use std::fmt;

/// Margin used to keep μ away from the boundary of a link's domain.
pub(crate) const FLOAT_EPS: f64 = f64::EPSILON;

/// Largest argument handed to `exp` (ln(f64::MAX) ≈ 709.78).
const MAX_EXP_ARG: f64 = 709.0;

/// Link function g(μ) = η.
///
/// # Variants
///
/// | Link | g(μ) | Natural range of μ |
/// |------|------|--------------------|
/// | `Identity` | μ | ℝ |
/// | `Log` | ln μ | (0, ∞) |
/// | `Logit` | ln(μ/(1−μ)) | (0, 1) |
/// | `Probit` | Φ⁻¹(μ) | (0, 1) |
/// | `Cauchy` | tan(π(μ − ½)) | (0, 1) |
/// | `CLogLog` | ln(−ln(1−μ)) | (0, 1) |
/// | `Inverse` | 1/μ | μ ≠ 0 |
/// | `InverseSquared` | 1/μ² | (0, ∞) |
/// | `Sqrt` | √μ | [0, ∞) |
/// | `Power(k)` | μᵏ | depends on k |
/// | `NegativeBinomial { alpha }` | ln(μ/(μ + 1/α)) | (0, ∞) |
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Link {
    /// Identity link: g(μ) = μ.
    Identity,
    /// Log link: g(μ) = ln(μ).
    Log,
    /// Logit link: g(μ) = ln(μ/(1−μ)).
    Logit,
    /// Probit link: g(μ) = Φ⁻¹(μ), the standard normal quantile.
    Probit,
    /// Cauchy link: g(μ) = tan(π(μ − ½)), the standard Cauchy quantile.
    Cauchy,
    /// Complementary log-log link: g(μ) = ln(−ln(1−μ)).
    CLogLog,
    /// Reciprocal link: g(μ) = 1/μ.
    Inverse,
    /// Inverse-squared link: g(μ) = 1/μ².
    InverseSquared,
    /// Square-root link: g(μ) = √μ.
    Sqrt,
    /// Power link: g(μ) = μ^k for a non-zero exponent k.
    Power(f64),
    /// Canonical negative binomial link: g(μ) = ln(μ/(μ + 1/α)).
    NegativeBinomial {
        /// Ancillary parameter α > 0.
        alpha: f64,
    },
}

impl Link {
    /// Short lowercase name of the link.
    pub fn name(&self) -> &'static str {
        match self {
            Link::Identity => "identity",
            Link::Log => "log",
            Link::Logit => "logit",
            Link::Probit => "probit",
            Link::Cauchy => "cauchy",
            Link::CLogLog => "cloglog",
            Link::Inverse => "inverse",
            Link::InverseSquared => "inverse_squared",
            Link::Sqrt => "sqrt",
            Link::Power(_) => "power",
            Link::NegativeBinomial { .. } => "nbinom",
        }
    }

    /// Exponent of a power-type link, if this link belongs to the power family.
    pub fn power_exponent(&self) -> Option<f64> {
        match self {
            Link::Identity => Some(1.0),
            Link::Inverse => Some(-1.0),
            Link::InverseSquared => Some(-2.0),
            Link::Sqrt => Some(0.5),
            Link::Power(k) => Some(*k),
            _ => None,
        }
    }

    /// Check the link's own parameters (power exponent, negative binomial α).
    pub fn has_valid_parameters(&self) -> bool {
        match self {
            Link::Power(k) => k.is_finite() && *k != 0.0,
            Link::NegativeBinomial { alpha } => alpha.is_finite() && *alpha > 0.0,
            _ => true,
        }
    }

    /// Compute the link function η = g(μ).
    #[inline]
    pub fn forward(&self, mu: f64) -> f64 {
        match self {
            Link::Identity => mu,
            Link::Log => clip_positive(mu).ln(),
            Link::Logit => {
                let p = clip_probability(mu);
                (p / (1.0 - p)).ln()
            }
            Link::Probit => normal_quantile(clip_probability(mu)),
            Link::Cauchy => (PI * (clip_probability(mu) - 0.5)).tan(),
            Link::CLogLog => {
                let p = clip_probability(mu);
                (-(-p).ln_1p()).ln()
            }
            Link::NegativeBinomial { alpha } => {
                let m = clip_positive(mu);
                (m / (m + 1.0 / alpha)).ln()
            }
            _ => {
                let k = self.power_exponent().unwrap_or(1.0);
                power_forward(mu, k)
            }
        }
    }

    /// Compute the inverse link μ = g⁻¹(η), clamped into the link's range.
    #[inline]
    pub fn inverse(&self, eta: f64) -> f64 {
        match self {
            Link::Identity => eta,
            Link::Log => eta.min(MAX_EXP_ARG).exp().max(FLOAT_EPS),
            Link::Logit => clip_probability(1.0 / (1.0 + (-eta).min(MAX_EXP_ARG).exp())),
            Link::Probit => clip_probability(normal_cdf(eta)),
            Link::Cauchy => clip_probability(0.5 + eta.atan() / PI),
            Link::CLogLog => clip_probability(-(-eta.min(MAX_EXP_ARG).exp()).exp_m1()),
            Link::NegativeBinomial { alpha } => {
                // η = ln(αμ/(1+αμ)) < 0, so μ = 1/(α(e^{-η} − 1))
                let t = eta.min(-FLOAT_EPS);
                clip_positive(1.0 / (alpha * (-t).min(MAX_EXP_ARG).exp_m1()))
            }
            _ => {
                let k = self.power_exponent().unwrap_or(1.0);
                power_inverse(eta, k)
            }
        }
    }

    /// Compute the derivative of the link dη/dμ = g′(μ).
    #[inline]
    pub fn derivative(&self, mu: f64) -> f64 {
        match self {
            Link::Identity => 1.0,
            Link::Log => 1.0 / clip_positive(mu),
            Link::Logit => {
                let p = clip_probability(mu);
                1.0 / (p * (1.0 - p))
            }
            Link::Probit => {
                let z = normal_quantile(clip_probability(mu));
                1.0 / normal_pdf(z)
            }
            Link::Cauchy => {
                let a = PI * (clip_probability(mu) - 0.5);
                PI / (a.cos() * a.cos())
            }
            Link::CLogLog => {
                let p = clip_probability(mu);
                -1.0 / ((1.0 - p) * (-p).ln_1p())
            }
            Link::NegativeBinomial { alpha } => {
                let m = clip_positive(mu);
                1.0 / (m + alpha * m * m)
            }
            _ => {
                let k = self.power_exponent().unwrap_or(1.0);
                let m = power_domain(mu, k);
                k * m.powf(k - 1.0)
            }
        }
    }

    /// Compute the derivative of the inverse link dμ/dη.
    #[inline]
    pub fn inverse_derivative(&self, eta: f64) -> f64 {
        match self {
            Link::Identity => 1.0,
            Link::Log => eta.min(MAX_EXP_ARG).exp(),
            Link::Logit => {
                let t = (-eta.abs()).exp();
                t / ((1.0 + t) * (1.0 + t))
            }
            Link::Probit => normal_pdf(eta),
            Link::Cauchy => 1.0 / (PI * (1.0 + eta * eta)),
            Link::CLogLog => (eta - eta.min(MAX_EXP_ARG).exp()).exp(),
            Link::NegativeBinomial { alpha } => {
                let t = eta.min(-FLOAT_EPS).exp();
                t / (alpha * (1.0 - t) * (1.0 - t))
            }
            _ => {
                let k = self.power_exponent().unwrap_or(1.0);
                let e = if needs_positive_domain(1.0 / k) {
                    clip_positive(eta)
                } else {
                    eta
                };
                e.powf(1.0 / k - 1.0) / k
            }
        }
    }

    /// Compute the second derivative of the link g″(μ).
    pub fn second_derivative(&self, mu: f64) -> f64 {
        match self {
            Link::Identity => 0.0,
            Link::Log => {
                let m = clip_positive(mu);
                -1.0 / (m * m)
            }
            Link::Logit => {
                let p = clip_probability(mu);
                let v = p * (1.0 - p);
                (2.0 * p - 1.0) / (v * v)
            }
            Link::Probit => {
                let z = normal_quantile(clip_probability(mu));
                let pdf = normal_pdf(z);
                z / (pdf * pdf)
            }
            Link::Cauchy => {
                let a = PI * (clip_probability(mu) - 0.5);
                2.0 * PI * PI * a.sin() / a.cos().powi(3)
            }
            Link::CLogLog => {
                let p = clip_probability(mu);
                let fl = (-p).ln_1p();
                -(1.0 + 1.0 / fl) / ((1.0 - p) * (1.0 - p) * fl)
            }
            Link::NegativeBinomial { alpha } => {
                let m = clip_positive(mu);
                let denom = m + alpha * m * m;
                -(1.0 + 2.0 * alpha * m) / (denom * denom)
            }
            _ => {
                let k = self.power_exponent().unwrap_or(1.0);
                let m = power_domain(mu, k);
                k * (k - 1.0) * m.powf(k - 2.0)
            }
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Link::Power(k) => write!(f, "power({k})"),
            Link::NegativeBinomial { alpha } => write!(f, "nbinom(alpha={alpha})"),
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
    if x.is_nan() {
        x
    } else {
        x.max(FLOAT_EPS)
    }
}

/// Fractional or negative exponents are only defined (finite) for μ > 0.
#[inline]
fn needs_positive_domain(k: f64) -> bool {
    k < 0.0 || k.fract() != 0.0
}

#[inline]
fn power_domain(mu: f64, k: f64) -> f64 {
    if needs_positive_domain(k) && k != -1.0 {
        clip_positive(mu)
    } else {
        mu
    }
}

#[inline]
fn power_forward(mu: f64, k: f64) -> f64 {
    if k == 1.0 {
        mu
    } else if k == -1.0 {
        1.0 / mu
    } else {
        power_domain(mu, k).powf(k)
    }
}

#[inline]
fn power_inverse(eta: f64, k: f64) -> f64 {
    let inv = 1.0 / k;
    if k == 1.0 {
        eta
    } else if k == -1.0 {
        1.0 / eta
    } else if inv.fract() == 0.0 && inv > 0.0 {
        eta.powi(inv as i32)
    } else {
        clip_positive(eta).powf(inv)
    }
}

#[inline]
fn normal_cdf(x: f64) -> f64 {
    Normal::standard().cdf(x)
}

#[inline]
fn normal_pdf(x: f64) -> f64 {
    Normal::standard().pdf(x)
}

/// Φ⁻¹(p) for p in (0, 1).
#[inline]
fn normal_quantile(p: f64) -> f64 {
    Normal::standard().inverse_cdf(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_links() -> Vec<Link> {
        vec![
            Link::Identity,
            Link::Log,
            Link::Logit,
            Link::Probit,
            Link::Cauchy,
            Link::CLogLog,
            Link::Inverse,
            Link::InverseSquared,
            Link::Sqrt,
            Link::Power(1.5),
            Link::Power(-0.5),
            Link::NegativeBinomial { alpha: 0.7 },
        ]
    }

    #[test]
    fn test_roundtrip_interior() {
        for link in all_links() {
            for mu in [0.05, 0.2, 0.5, 0.8, 0.95] {
                let eta = link.forward(mu);
                let back = link.inverse(eta);
                assert!(
                    (back - mu).abs() < 1e-9,
                    "roundtrip failed for {link} at mu={mu}: got {back}"
                );
            }
        }
    }

    #[test]
    fn test_roundtrip_positive_links_large_mean() {
        let links = [
            Link::Log,
            Link::Inverse,
            Link::InverseSquared,
            Link::Sqrt,
            Link::NegativeBinomial { alpha: 2.0 },
        ];
        for link in links {
            for mu in [1.5, 7.0, 120.0] {
                let back = link.inverse(link.forward(mu));
                assert!((back - mu).abs() / mu < 1e-9, "{link} at mu={mu}");
            }
        }
    }

    #[test]
    fn test_derivative_times_inverse_derivative_is_one() {
        for link in all_links() {
            for mu in [0.1, 0.4, 0.6, 0.9] {
                let eta = link.forward(mu);
                let product = link.derivative(mu) * link.inverse_derivative(eta);
                assert!(
                    (product - 1.0).abs() < 1e-7,
                    "{link} at mu={mu}: product={product}"
                );
            }
        }
    }

    #[test]
    fn test_second_derivative_matches_finite_difference() {
        let h = 1e-6;
        for link in all_links() {
            for mu in [0.2, 0.5, 0.7] {
                let numeric = (link.derivative(mu + h) - link.derivative(mu - h)) / (2.0 * h);
                let analytic = link.second_derivative(mu);
                let scale = analytic.abs().max(1.0);
                assert!(
                    (numeric - analytic).abs() / scale < 1e-4,
                    "{link} at mu={mu}: numeric={numeric}, analytic={analytic}"
                );
            }
        }
    }

    #[test]
    fn test_logit_values() {
        let link = Link::Logit;
        assert!(link.forward(0.5).abs() < 1e-12);
        assert!((link.inverse(0.0) - 0.5).abs() < 1e-12);
        // 1/(0.2 * 0.8) = 6.25
        assert!((link.derivative(0.2) - 6.25).abs() < 1e-10);
        assert!((link.inverse_derivative(0.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_probit_values() {
        let link = Link::Probit;
        assert!(link.forward(0.5).abs() < 1e-12);
        assert!((link.forward(0.975) - 1.959963984540054).abs() < 1e-9);
        assert!((link.inverse(1.959963984540054) - 0.975).abs() < 1e-9);
        let expected = 1.0 / (2.0 * PI).sqrt();
        assert!((link.inverse_derivative(0.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_cloglog_values() {
        // ln(-ln(0.5)) = ln(ln 2)
        let expected = 2.0_f64.ln().ln();
        assert!((Link::CLogLog.forward(0.5) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_power_aliases_agree() {
        for mu in [0.3, 2.0, 9.0] {
            assert!((Link::Sqrt.forward(mu) - Link::Power(0.5).forward(mu)).abs() < 1e-12);
            assert!((Link::Inverse.forward(mu) - Link::Power(-1.0).forward(mu)).abs() < 1e-12);
            assert!(
                (Link::InverseSquared.forward(mu) - Link::Power(-2.0).forward(mu)).abs() < 1e-12
            );
            assert!((Link::Identity.forward(mu) - Link::Power(1.0).forward(mu)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_inverse_clamps_probability_links() {
        for link in [Link::Logit, Link::Probit, Link::Cauchy, Link::CLogLog] {
            for eta in [-1e4, -800.0, -50.0, 50.0, 800.0, 1e4] {
                let mu = link.inverse(eta);
                assert!(mu > 0.0 && mu < 1.0, "{link} at eta={eta}: mu={mu}");
            }
        }
    }

    #[test]
    fn test_log_inverse_floored_and_finite() {
        assert!(Link::Log.inverse(-1e4) > 0.0);
        assert!(Link::Log.inverse(1e4).is_finite());
        assert!(Link::NegativeBinomial { alpha: 1.0 }.inverse(0.5) > 0.0);
        assert!(Link::NegativeBinomial { alpha: 1.0 }.inverse(0.5).is_finite());
    }

    #[test]
    fn test_forward_at_boundaries_is_finite() {
        for link in [Link::Log, Link::Logit, Link::Probit, Link::Cauchy, Link::CLogLog] {
            assert!(link.forward(0.0).is_finite(), "{link} at 0");
        }
        for link in [Link::Logit, Link::Probit, Link::Cauchy, Link::CLogLog] {
            assert!(link.forward(1.0).is_finite(), "{link} at 1");
            assert!(link.derivative(1.0).is_finite(), "{link} derivative at 1");
            assert!(link.derivative(0.0).is_finite(), "{link} derivative at 0");
        }
    }

    #[test]
    fn test_parameter_validation() {
        assert!(Link::Log.has_valid_parameters());
        assert!(Link::Power(2.0).has_valid_parameters());
        assert!(!Link::Power(0.0).has_valid_parameters());
        assert!(!Link::Power(f64::NAN).has_valid_parameters());
        assert!(!Link::NegativeBinomial { alpha: 0.0 }.has_valid_parameters());
        assert!(!Link::NegativeBinomial { alpha: -1.0 }.has_valid_parameters());
    }

    #[test]
    fn test_display() {
        assert_eq!(Link::Logit.to_string(), "logit");
        assert_eq!(Link::Power(1.5).to_string(), "power(1.5)");
        assert_eq!(
            Link::NegativeBinomial { alpha: 0.5 }.to_string(),
            "nbinom(alpha=0.5)"
        );
    }
}
