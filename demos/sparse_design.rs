//! # Sparse Design Matrices
//!
//! Region fixed effects produce wide, mostly-zero designs. Passing them as
//! a `SparseColMat` keeps the weighted least-squares step sparse.
//!
//! Run with: `RUST_LOG=spglm=debug cargo run --example sparse_design`

use faer::Col;
use spglm::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), GlmError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("=== Sparse Design Matrices ===\n");

    // 400 observations in 40 regions; one indicator per region plus a covariate
    let n = 400;
    let n_regions = 40;
    let mut triplets = Vec::with_capacity(2 * n);
    let mut covariate = Vec::with_capacity(n);
    for i in 0..n {
        let region = i % n_regions;
        let xi = ((i as f64) * 0.37).sin();
        triplets.push((i, region, 1.0));
        triplets.push((i, n_regions, xi));
        covariate.push(xi);
    }
    let x = DesignMatrix::from_triplets(n, n_regions + 1, &triplets)?;
    println!(
        "Design: {} × {} with {} stored entries\n",
        x.nrows(),
        x.ncols(),
        x.nnz()
    );

    // Counts with region effects between 0.5 and 1.5 on the log scale
    let y = Col::from_fn(n, |i| {
        let region = (i % n_regions) as f64;
        let eta = 0.5 + region / n_regions as f64 + 0.6 * covariate[i];
        (eta.exp() + ((i as f64) * 1.3).cos()).round().max(0.0)
    });

    let fit = spglm::fit(&x, &y, Family::Poisson)?;

    println!("Converged: {} after {} iterations", fit.converged(), fit.iterations());
    println!("Deviance history: {:?}", fit.deviance_history());
    println!(
        "Covariate effect: {:.4} (se {:.4})",
        fit.coefficients()[n_regions],
        fit.std_errors().map_or(f64::NAN, |s| s[n_regions])
    );
    println!("Deviance R²: {:.4}", fit.deviance_r_squared());
    Ok(())
}
