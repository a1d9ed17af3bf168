//! Matrix utility functions.

use crate::core::DesignMatrix;

/// Detect columns that are constant (zero variance).
pub fn detect_constant_columns(x: &DesignMatrix, tolerance: f64) -> Vec<bool> {
    let n_cols = x.ncols();
    let n_rows = x.nrows();

    if n_rows == 0 {
        return vec![true; n_cols];
    }

    match x {
        DesignMatrix::Dense(matrix) => (0..n_cols)
            .map(|j| {
                let first = matrix[(0, j)];
                (1..n_rows).all(|i| (matrix[(i, j)] - first).abs() < tolerance)
            })
            .collect(),
        DesignMatrix::Sparse(matrix) => {
            let (symbolic, values) = matrix.parts();
            let col_ptr = symbolic.col_ptr();
            (0..n_cols)
                .map(|j| {
                    let stored = &values[col_ptr[j]..col_ptr[j + 1]];
                    // A column with implicit zeros is constant only if every stored value is zero.
                    let first = if stored.len() < n_rows { 0.0 } else { stored[0] };
                    stored.iter().all(|&v| (v - first).abs() < tolerance)
                })
                .collect()
        }
    }
}

/// Index of the first constant non-zero column, the one playing the intercept.
pub fn intercept_column(x: &DesignMatrix, tolerance: f64) -> Option<usize> {
    let constant = detect_constant_columns(x, tolerance);
    constant.iter().enumerate().find_map(|(j, &is_const)| {
        if is_const && first_value(x, j).abs() >= tolerance {
            Some(j)
        } else {
            None
        }
    })
}

fn first_value(x: &DesignMatrix, col: usize) -> f64 {
    match x {
        DesignMatrix::Dense(matrix) => matrix[(0, col)],
        DesignMatrix::Sparse(matrix) => {
            let (symbolic, values) = matrix.parts();
            let col_ptr = symbolic.col_ptr();
            let row_idx = symbolic.row_idx();
            let start = col_ptr[col];
            if start < col_ptr[col + 1] && row_idx[start] == 0 {
                values[start]
            } else {
                0.0
            }
        }
    }
}

/// Weighted mean Σwᵢyᵢ / Σwᵢ, or the plain mean when all weights vanish.
pub fn weighted_mean(y: &[f64], weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        y.iter().zip(weights).map(|(&yi, &wi)| wi * yi).sum::<f64>() / total
    } else if y.is_empty() {
        0.0
    } else {
        y.iter().sum::<f64>() / y.len() as f64
    }
}
