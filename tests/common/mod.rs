//! Common test utilities and data generators.

#![allow(dead_code)]

use faer::{Col, Mat};

/// Deterministic uniform draws in [0, 1) for reproducible data.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn uniform(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((self.0 >> 33) as f64) / ((1u64 << 31) as f64)
    }

    /// Uniform draw in [-1, 1).
    pub fn symmetric(&mut self) -> f64 {
        2.0 * self.uniform() - 1.0
    }

    /// Poisson draw by inversion of the CDF.
    pub fn poisson(&mut self, mu: f64) -> f64 {
        let u = self.uniform();
        let mut k = 0.0;
        let mut p = (-mu).exp();
        let mut cdf = p;
        while u > cdf && k < 1000.0 {
            k += 1.0;
            p *= mu / k;
            cdf += p;
        }
        k
    }
}

/// Design with a leading column of ones and `n_features` uniform covariates.
pub fn design_with_ones(n_samples: usize, n_features: usize, seed: u64) -> Mat<f64> {
    let mut rng = Lcg::new(seed);
    let mut x = Mat::zeros(n_samples, n_features + 1);
    for i in 0..n_samples {
        x[(i, 0)] = 1.0;
        for j in 1..=n_features {
            x[(i, j)] = rng.symmetric();
        }
    }
    x
}

/// Linear predictor Xβ for a dense design.
pub fn linear_predictor(x: &Mat<f64>, beta: &[f64]) -> Vec<f64> {
    (0..x.nrows())
        .map(|i| (0..x.ncols()).map(|j| x[(i, j)] * beta[j]).sum())
        .collect()
}

/// Counts y ~ Poisson(exp(0.5 + 0.8 x₁ - 0.4 x₂)), design includes the ones column.
pub fn generate_poisson_data(n_samples: usize, seed: u64) -> (Mat<f64>, Col<f64>) {
    let x = design_with_ones(n_samples, 2, seed);
    let eta = linear_predictor(&x, &[0.5, 0.8, -0.4]);
    let mut rng = Lcg::new(seed.wrapping_add(7));
    let y = Col::from_fn(n_samples, |i| rng.poisson(eta[i].exp()));
    (x, y)
}

/// Bernoulli y with logit(p) = -0.3 + 1.2 x₁, design includes the ones column.
pub fn generate_binary_data(n_samples: usize, seed: u64) -> (Mat<f64>, Col<f64>) {
    let x = design_with_ones(n_samples, 1, seed);
    let eta = linear_predictor(&x, &[-0.3, 1.2]);
    let mut rng = Lcg::new(seed.wrapping_add(11));
    let y = Col::from_fn(n_samples, |i| {
        let p = 1.0 / (1.0 + (-eta[i]).exp());
        if rng.uniform() < p {
            1.0
        } else {
            0.0
        }
    });
    (x, y)
}

/// Positive skewed y with log mean 1.0 + 0.5 x₁, design includes the ones column.
pub fn generate_positive_data(n_samples: usize, seed: u64) -> (Mat<f64>, Col<f64>) {
    let x = design_with_ones(n_samples, 1, seed);
    let eta = linear_predictor(&x, &[1.0, 0.5]);
    let mut rng = Lcg::new(seed.wrapping_add(13));
    let y = Col::from_fn(n_samples, |i| {
        // Exponential draw scaled by the mean, kept away from zero
        let e = -(1.0 - rng.uniform()).ln();
        eta[i].exp() * e.max(1e-3)
    });
    (x, y)
}

/// Non-zero entries of a dense matrix as (row, col, value) triplets.
pub fn to_triplets(x: &Mat<f64>) -> Vec<(usize, usize, f64)> {
    let mut triplets = Vec::new();
    for j in 0..x.ncols() {
        for i in 0..x.nrows() {
            if x[(i, j)] != 0.0 {
                triplets.push((i, j, x[(i, j)]));
            }
        }
    }
    triplets
}

pub fn col(values: &[f64]) -> Col<f64> {
    Col::from_fn(values.len(), |i| values[i])
}
