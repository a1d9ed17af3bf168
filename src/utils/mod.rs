//! Utility functions.

mod matrix;

pub use matrix::{detect_constant_columns, intercept_column, weighted_mean};
