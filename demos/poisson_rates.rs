//! # Poisson Rate Models
//!
//! Counts observed over different amounts of exposure (person-years, area,
//! time at risk) are modelled as rates: log(μ / exposure) = Xβ.
//!
//! ## Key Features
//! - `exposure(..)` adds ln(exposure) to the linear predictor
//! - Quasi-Poisson for overdispersed counts
//! - Negative binomial with a fixed α
//!
//! Run with: `RUST_LOG=spglm=debug cargo run --example poisson_rates`

use faer::{Col, Mat};
use spglm::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), GlmError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("=== Poisson Rate Models ===\n");

    let (x, y, exposure) = regional_counts();
    rate_model(&x, &y, &exposure)?;
    overdispersion(&x, &y, &exposure)?;
    Ok(())
}

/// Twenty regions, one covariate, exposures between 10 and 40 units.
fn regional_counts() -> (DesignMatrix, Col<f64>, Col<f64>) {
    let counts = [
        18.0, 26.0, 49.0, 63.0, 19.0, 54.0, 72.0, 129.0, 29.0, 77.0, 134.0, 144.0, 53.0, 108.0,
        175.0, 249.0, 74.0, 137.0, 240.0, 397.0,
    ];
    let x = DesignMatrix::from(Mat::from_fn(20, 1, |i, _| (i + 1) as f64));
    let y = Col::from_fn(20, |i| counts[i]);
    let exposure = Col::from_fn(20, |i| 10.0 * ((i % 4) + 1) as f64);
    (x, y, exposure)
}

fn rate_model(x: &DesignMatrix, y: &Col<f64>, exposure: &Col<f64>) -> Result<(), GlmError> {
    println!("--- Poisson with exposure ---\n");

    let fit = GlmRegressor::poisson()
        .with_intercept(true)
        .exposure(exposure.clone())
        .build()?
        .fit(x, y)?;

    print_coefficients(&fit);
    println!("Deviance: {:.4} on {} df", fit.deviance(), fit.df_resid());
    println!("Null deviance: {:.4}", fit.null_deviance());
    println!("AIC: {:.4}", fit.aic());
    println!("Iterations: {}\n", fit.iterations());

    // Expected count for a region with x = 21 and 25 units of exposure
    let x_new = DesignMatrix::from(Mat::from_fn(1, 1, |_, _| 21.0));
    let offset = Col::from_fn(1, |_| 25.0_f64.ln());
    let mu = fit.predict(&x_new, Some(&offset))?;
    println!("Predicted count at x = 21, exposure 25: {:.2}\n", mu[0]);
    Ok(())
}

fn overdispersion(x: &DesignMatrix, y: &Col<f64>, exposure: &Col<f64>) -> Result<(), GlmError> {
    println!("--- Overdispersion ---\n");

    let quasi = GlmRegressor::builder(Family::QuasiPoisson)
        .with_intercept(true)
        .exposure(exposure.clone())
        .build()?
        .fit(x, y)?;
    println!("Quasi-Poisson dispersion: {:.4}", quasi.dispersion());
    print_coefficients(&quasi);

    let nb = GlmRegressor::negative_binomial(0.05)
        .with_intercept(true)
        .exposure(exposure.clone())
        .build()?
        .fit(x, y)?;
    println!("Negative binomial (α = 0.05):");
    print_coefficients(&nb);
    println!("AIC: {:.4}", nb.aic());
    Ok(())
}

fn print_coefficients(fit: &FitResult) {
    let names = ["(Intercept)", "x"];
    let se = fit.std_errors();
    let p = fit.p_values();
    println!(
        "{:<12} {:>10} {:>10} {:>10}",
        "term", "estimate", "std.err", "p-value"
    );
    for (j, name) in names.iter().enumerate() {
        println!(
            "{:<12} {:>10.4} {:>10.4} {:>10.4}",
            name,
            fit.coefficients()[j],
            se.map_or(f64::NAN, |s| s[j]),
            p.map_or(f64::NAN, |p| p[j])
        );
    }
    println!();
}
