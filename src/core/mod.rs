//! Core types: links, families, design matrices, options and fit results.

mod design;
mod family;
mod link;
mod options;
mod result;

pub use design::DesignMatrix;
pub use family::Family;
pub use link::Link;
pub use options::{GlmOptions, GlmOptionsBuilder, OptionsError};
pub(crate) use result::FitContext;
pub use result::FitResult;
