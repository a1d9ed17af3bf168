//! Weighted least-squares step of IRLS.
//!
//! Minimizes Σ wᵢ (zᵢ − xᵢᵀβ)² for a dense or sparse design and returns the
//! coefficients together with (XᵀWX)⁻¹, which the fit result scales by the
//! dispersion to obtain the coefficient covariance.
//!
//! Dense designs are factored as √W·X = QR. Q is never formed: β comes from
//! the corrected semi-normal equations RᵀRβ = XᵀWz followed by one step of
//! iterative refinement, which recovers the accuracy of a Q-based solve.
//!
//! Sparse designs accumulate XᵀWX and XᵀWz straight from the CSC structure
//! and solve the p × p system by a Jacobi-scaled Cholesky factorization.
//!
//! Both paths use the same rank criterion: the ratio between a pivot and the
//! weighted norm of its column. For QR that is |R_jj|/‖√W xⱼ‖ and for the
//! scaled Cholesky it is the diagonal of the factor; the two quantities are
//! identical in exact arithmetic.

use crate::core::DesignMatrix;
use crate::solvers::error::GlmError;
use faer::linalg::solvers::{Llt, LltError, Solve};
use faer::linalg::triangular_solve::solve_upper_triangular_in_place;
use faer::sparse::SparseColMat;
use faer::{Col, Mat, Par, Side};

/// Smallest pivot ratio the normal equations resolve: forming XᵀWX squares
/// the conditioning, so roundoff in the scaled Gram matrix sits near ε.
const GRAM_PIVOT_FLOOR: f64 = 1e-7;

/// Output of one weighted least-squares solve.
#[derive(Debug, Clone)]
pub struct WlsSolution {
    /// Coefficient vector β.
    pub coefficients: Vec<f64>,
    /// (XᵀWX)⁻¹, the unscaled coefficient covariance.
    pub xtwx_inverse: Mat<f64>,
    /// Numerical rank of √W·X (equal to p on success).
    pub rank: usize,
}

/// Weighted least-squares solver with a fixed rank tolerance.
#[derive(Debug, Clone, Copy)]
pub struct WeightedLeastSquares {
    rank_tolerance: f64,
}

impl WeightedLeastSquares {
    pub fn new(rank_tolerance: f64) -> Self {
        Self { rank_tolerance }
    }

    /// Solve the weighted problem for working response `z` and weights `w`.
    ///
    /// Fails with [`GlmError::SingularDesign`] when √W·X has rank < p.
    pub fn solve(&self, x: &DesignMatrix, z: &[f64], w: &[f64]) -> Result<WlsSolution, GlmError> {
        let n = x.nrows();
        let p = x.ncols();

        if n < p {
            return Err(GlmError::SingularDesign {
                rank: n,
                n_params: p,
            });
        }

        match x {
            DesignMatrix::Dense(matrix) => self.solve_dense(matrix, z, w),
            DesignMatrix::Sparse(matrix) => {
                let (gram, rhs) = normal_equations(matrix, z, w);
                self.solve_gram(gram, rhs)
            }
        }
    }

    fn solve_dense(&self, x: &Mat<f64>, z: &[f64], w: &[f64]) -> Result<WlsSolution, GlmError> {
        let n = x.nrows();
        let p = x.ncols();

        let sqrt_w = Col::from_fn(n, |i| w[i].max(0.0).sqrt());
        let xw = Mat::from_fn(n, p, |i, j| sqrt_w[i] * x[(i, j)]);
        let zw = Col::from_fn(n, |i| sqrt_w[i] * z[i]);

        let qr = xw.qr();
        let r = qr.R();

        let rank = (0..p)
            .filter(|&j| {
                let norm = xw.col(j).norm_l2();
                norm > 0.0 && r[(j, j)].abs() / norm > self.rank_tolerance
            })
            .count();
        if rank < p {
            return Err(GlmError::SingularDesign { rank, n_params: p });
        }

        let mut r_inv = Mat::<f64>::identity(p, p);
        solve_upper_triangular_in_place(r.get(..p, ..p), r_inv.as_mut(), Par::Seq);
        let xtwx_inverse = r_inv.as_ref() * r_inv.transpose();

        let xtz = xw.transpose() * zw.as_ref();
        let beta = xtwx_inverse.as_ref() * xtz.as_ref();

        // One refinement step on the residual of the weighted system.
        let fitted = xw.as_ref() * beta.as_ref();
        let resid = zw.as_ref() - fitted.as_ref();
        let xtr = xw.transpose() * resid.as_ref();
        let delta = xtwx_inverse.as_ref() * xtr.as_ref();
        let beta = beta.as_ref() + delta.as_ref();

        Ok(WlsSolution {
            coefficients: beta.iter().copied().collect(),
            xtwx_inverse,
            rank,
        })
    }

    fn solve_gram(&self, gram: Mat<f64>, rhs: Col<f64>) -> Result<WlsSolution, GlmError> {
        let p = gram.nrows();

        let scale: Vec<f64> = (0..p).map(|j| gram[(j, j)].max(0.0).sqrt()).collect();
        let zero_cols = scale.iter().filter(|&&s| s == 0.0).count();
        if zero_cols > 0 {
            return Err(GlmError::SingularDesign {
                rank: p - zero_cols,
                n_params: p,
            });
        }
        let scaled = Mat::from_fn(p, p, |i, j| gram[(i, j)] / (scale[i] * scale[j]));

        let llt = match Llt::new(scaled.as_ref(), Side::Lower) {
            Ok(llt) => llt,
            Err(LltError::NonPositivePivot { index }) => {
                return Err(GlmError::SingularDesign {
                    rank: index,
                    n_params: p,
                });
            }
        };

        let tolerance = self.rank_tolerance.max(GRAM_PIVOT_FLOOR);
        let lower = llt.L();
        let rank = (0..p).filter(|&j| lower[(j, j)] > tolerance).count();
        if rank < p {
            return Err(GlmError::SingularDesign { rank, n_params: p });
        }

        let scaled_inverse = llt.solve(Mat::<f64>::identity(p, p).as_ref());
        let xtwx_inverse = Mat::from_fn(p, p, |i, j| scaled_inverse[(i, j)] / (scale[i] * scale[j]));

        let coefficients = xtwx_inverse.as_ref() * rhs.as_ref();

        Ok(WlsSolution {
            coefficients: coefficients.iter().copied().collect(),
            xtwx_inverse,
            rank,
        })
    }
}

/// Accumulate XᵀWX and XᵀWz from the CSC structure of X.
fn normal_equations(x: &SparseColMat<usize, f64>, z: &[f64], w: &[f64]) -> (Mat<f64>, Col<f64>) {
    let n = x.nrows();
    let p = x.ncols();
    let mut gram = Mat::<f64>::zeros(p, p);
    let mut rhs = Col::<f64>::zeros(p);

    let (symbolic, values) = x.parts();
    let col_ptr = symbolic.col_ptr();
    let row_idx = symbolic.row_idx();
    // Column j scattered as wᵢxᵢⱼ, then dotted with every earlier column.
    let mut work = vec![0.0; n];
    for j in 0..p {
        let col_j = col_ptr[j]..col_ptr[j + 1];
        for idx in col_j.clone() {
            let row = row_idx[idx];
            work[row] = w[row] * values[idx];
            rhs[j] += work[row] * z[row];
        }
        for k in 0..=j {
            let dot = (col_ptr[k]..col_ptr[k + 1])
                .map(|idx| values[idx] * work[row_idx[idx]])
                .sum::<f64>();
            gram[(j, k)] = dot;
            gram[(k, j)] = dot;
        }
        for idx in col_j {
            work[row_idx[idx]] = 0.0;
        }
    }

    (gram, rhs)
}
