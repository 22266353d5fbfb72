//! Error types for cell construction.

use thiserror::Error;

/// Errors raised when primitive parameters are out of range.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    /// Principal axis index outside `0..3`.
    #[error("invalid axis index {0} (expected 0, 1 or 2)")]
    InvalidAxis(usize),

    /// A length parameter is negative, NaN or infinite.
    #[error("invalid {name}: {value} (must be finite and non-negative)")]
    InvalidParameter {
        /// Parameter name, e.g. `"radius"`.
        name: &'static str,
        /// Offending value, narrowed to `f64`.
        value: f64,
    },
}

impl ShapeError {
    /// Create an invalid parameter error.
    pub fn parameter(name: &'static str, value: f64) -> Self {
        Self::InvalidParameter { name, value }
    }
}
