//! Facade error type.

use geocell_cells::ShapeError;
use geocell_io::{ReadError, WriteError};
use geocell_math::TransformError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result alias for facade operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure surfaced by the geocell facade.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A stored tree could not be decoded.
    #[error("read failed: {0}")]
    Read(#[from] ReadError),

    /// A tree could not be encoded.
    #[error("write failed: {0}")]
    Write(#[from] WriteError),

    /// Primitive parameters are out of range.
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// A matrix is not a rigid motion.
    #[error(transparent)]
    Transform(#[from] TransformError),
}
