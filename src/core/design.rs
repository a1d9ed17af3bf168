//! Dense and sparse design matrices.
//!
//! The solver never densifies a sparse design: products with the coefficient
//! vector use faer's sparse × dense kernel and the weighted normal equations
//! are accumulated straight from the compressed-column structure.

use crate::solvers::error::InputError;
use faer::sparse::{SparseColMat, Triplet};
use faer::{Col, Mat};
use std::fmt;

/// Design matrix X (n observations × p parameters).
#[derive(Clone)]
pub enum DesignMatrix {
    /// Column-major dense storage.
    Dense(Mat<f64>),
    /// Compressed sparse column storage.
    Sparse(SparseColMat<usize, f64>),
}

impl DesignMatrix {
    /// Build a sparse design from `(row, col, value)` triplets.
    ///
    /// Duplicate entries are summed.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        entries: &[(usize, usize, f64)],
    ) -> Result<Self, InputError> {
        let triplets: Vec<Triplet<usize, usize, f64>> = entries
            .iter()
            .map(|&(row, col, value)| Triplet::new(row, col, value))
            .collect();
        SparseColMat::try_new_from_triplets(nrows, ncols, &triplets)
            .map(DesignMatrix::Sparse)
            .map_err(|err| InputError::InvalidSparseDesign(format!("{err:?}")))
    }

    pub fn nrows(&self) -> usize {
        match self {
            Self::Dense(matrix) => matrix.nrows(),
            Self::Sparse(matrix) => matrix.nrows(),
        }
    }

    pub fn ncols(&self) -> usize {
        match self {
            Self::Dense(matrix) => matrix.ncols(),
            Self::Sparse(matrix) => matrix.ncols(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_))
    }

    /// Number of stored entries (n·p for a dense matrix).
    pub fn nnz(&self) -> usize {
        match self {
            Self::Dense(matrix) => matrix.nrows() * matrix.ncols(),
            Self::Sparse(matrix) => matrix.parts().1.len(),
        }
    }

    /// Compute Xβ.
    pub fn matvec(&self, beta: &[f64]) -> Vec<f64> {
        let beta = Col::from_fn(beta.len(), |j| beta[j]);
        let product = match self {
            Self::Dense(matrix) => matrix.as_ref() * beta.as_ref(),
            Self::Sparse(matrix) => matrix.as_ref() * beta.as_ref(),
        };
        product.iter().copied().collect()
    }

    /// First non-finite stored entry, as a linear index into column-major storage.
    pub(crate) fn first_non_finite(&self) -> Option<usize> {
        match self {
            Self::Dense(matrix) => {
                let n = matrix.nrows();
                for j in 0..matrix.ncols() {
                    for i in 0..n {
                        if !matrix[(i, j)].is_finite() {
                            return Some(j * n + i);
                        }
                    }
                }
                None
            }
            Self::Sparse(matrix) => {
                let n = matrix.nrows();
                let (symbolic, values) = matrix.parts();
                let col_ptr = symbolic.col_ptr();
                let row_idx = symbolic.row_idx();
                for col in 0..matrix.ncols() {
                    for idx in col_ptr[col]..col_ptr[col + 1] {
                        if !values[idx].is_finite() {
                            return Some(col * n + row_idx[idx]);
                        }
                    }
                }
                None
            }
        }
    }

    /// Copy with a column of ones prepended at index 0.
    pub fn with_intercept(&self) -> Result<Self, InputError> {
        match self {
            Self::Dense(matrix) => {
                let n = matrix.nrows();
                let p = matrix.ncols();
                Ok(Self::Dense(Mat::from_fn(n, p + 1, |i, j| {
                    if j == 0 {
                        1.0
                    } else {
                        matrix[(i, j - 1)]
                    }
                })))
            }
            Self::Sparse(matrix) => {
                let n = matrix.nrows();
                let (symbolic, values) = matrix.parts();
                let col_ptr = symbolic.col_ptr();
                let row_idx = symbolic.row_idx();
                let mut triplets = Vec::with_capacity(n + values.len());
                triplets.extend((0..n).map(|row| Triplet::new(row, 0, 1.0)));
                for col in 0..matrix.ncols() {
                    for idx in col_ptr[col]..col_ptr[col + 1] {
                        triplets.push(Triplet::new(row_idx[idx], col + 1, values[idx]));
                    }
                }
                SparseColMat::try_new_from_triplets(n, matrix.ncols() + 1, &triplets)
                    .map(Self::Sparse)
                    .map_err(|err| InputError::InvalidSparseDesign(format!("{err:?}")))
            }
        }
    }
}

impl fmt::Debug for DesignMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_sparse() { "Sparse" } else { "Dense" };
        f.debug_struct("DesignMatrix")
            .field("kind", &kind)
            .field("nrows", &self.nrows())
            .field("ncols", &self.ncols())
            .field("nnz", &self.nnz())
            .finish()
    }
}

impl From<Mat<f64>> for DesignMatrix {
    fn from(value: Mat<f64>) -> Self {
        Self::Dense(value)
    }
}

impl From<&Mat<f64>> for DesignMatrix {
    fn from(value: &Mat<f64>) -> Self {
        Self::Dense(value.clone())
    }
}

impl From<SparseColMat<usize, f64>> for DesignMatrix {
    fn from(value: SparseColMat<usize, f64>) -> Self {
        Self::Sparse(value)
    }
}

impl From<&SparseColMat<usize, f64>> for DesignMatrix {
    fn from(value: &SparseColMat<usize, f64>) -> Self {
        Self::Sparse(value.clone())
    }
}
