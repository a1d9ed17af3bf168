//! # Logistic Regression
//!
//! Binary outcomes and grouped proportions with the binomial family.
//!
//! ## Key Features
//! - Logit, probit and complementary log-log links
//! - Proportions with trial counts as prior weights
//! - Pseudo-R² and residual diagnostics
//!
//! Run with: `cargo run --example logistic`

use faer::{Col, Mat};
use spglm::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), GlmError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("=== Logistic Regression ===\n");

    binary_outcomes()?;
    grouped_proportions()?;
    Ok(())
}

fn binary_outcomes() -> Result<(), GlmError> {
    println!("--- Binary outcomes, link comparison ---\n");

    let n = 30;
    let x = DesignMatrix::from(Mat::from_fn(n, 1, |i, _| -3.0 + 6.0 * i as f64 / (n - 1) as f64));
    let outcomes = [
        0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0,
        1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
    ];
    let y = Col::from_fn(n, |i| outcomes[i]);

    for link in [Link::Logit, Link::Probit, Link::CLogLog] {
        let fit = GlmRegressor::logistic()
            .link(link)
            .with_intercept(true)
            .build()?
            .fit(&x, &y)?;
        println!(
            "{:<8} β = ({:>7.4}, {:>7.4})  deviance = {:>8.4}  McFadden R² = {:.4}",
            link.to_string(),
            fit.coefficients()[0],
            fit.coefficients()[1],
            fit.deviance(),
            fit.mcfadden_r_squared()
        );
    }
    println!();
    Ok(())
}

fn grouped_proportions() -> Result<(), GlmError> {
    println!("--- Grouped proportions with trial weights ---\n");

    let doses = [0.0, 1.0, 2.0, 3.0, 4.0];
    let trials = [20.0, 20.0, 20.0, 20.0, 20.0];
    let deaths = [1.0, 4.0, 9.0, 13.0, 18.0];

    let x = DesignMatrix::from(Mat::from_fn(5, 1, |i, _| doses[i]));
    let y = Col::from_fn(5, |i| deaths[i] / trials[i]);

    let fit = GlmRegressor::logistic()
        .with_intercept(true)
        .weights(Col::from_fn(5, |i| trials[i]))
        .build()?
        .fit(&x, &y)?;

    let (lower, upper) = fit
        .confidence_intervals()
        .map(|(l, u)| (l[1], u[1]))
        .unwrap_or((f64::NAN, f64::NAN));
    println!(
        "Dose effect: {:.4} (95% CI {:.4} to {:.4})",
        fit.coefficients()[1],
        lower,
        upper
    );
    println!("LD50: {:.4}", -fit.coefficients()[0] / fit.coefficients()[1]);
    println!("Deviance: {:.4} on {} df\n", fit.deviance(), fit.df_resid());

    println!("{:>6} {:>10} {:>10} {:>10}", "dose", "observed", "fitted", "deviance");
    for i in 0..5 {
        println!(
            "{:>6.1} {:>10.3} {:>10.3} {:>10.3}",
            doses[i],
            y[i],
            fit.fitted_values()[i],
            fit.deviance_residuals()[i]
        );
    }
    Ok(())
}
