//! Error types for reading and writing geometry trees.

use geocell_cells::ShapeError;
use geocell_math::TransformError;
use thiserror::Error;

/// Errors that can occur while decoding a geometry tree.
///
/// A failed read never yields a partial tree.
#[derive(Error, Debug)]
pub enum ReadError {
    /// I/O error reading the input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input ended in the middle of a value.
    #[error("truncated input at byte {offset}: needed {needed} more bytes")]
    Truncated {
        /// Byte offset where the read started.
        offset: usize,
        /// Bytes required by the value.
        needed: usize,
    },

    /// The first four bytes are not the format magic.
    #[error("bad magic {0:02x?} (expected \"GEOC\")")]
    BadMagic([u8; 4]),

    /// Unknown format version.
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),

    /// Scalar width byte is neither 1 nor 2.
    #[error("unsupported scalar width {0}")]
    BadScalarWidth(u8),

    /// A slot starts with a tag that names no cell kind.
    #[error("unknown cell tag {tag:#04x} at byte {offset}")]
    UnknownTag {
        /// The tag byte.
        tag: u8,
        /// Byte offset of the tag.
        offset: usize,
    },

    /// Back-reference to a registry index that was never assigned.
    #[error("reference to cell #{index}, but only {registered} cells are registered")]
    DanglingReference {
        /// Referenced index.
        index: u32,
        /// Registry size at the point of the reference.
        registered: usize,
    },

    /// Back-reference to a record that is still being read (a cycle).
    #[error("reference to cell #{0} from inside its own record")]
    IncompleteReference(u32),

    /// A record's transform is not a rigid motion.
    #[error("cell #{index} has an invalid transform: {source}")]
    InvalidTransform {
        /// Registry index of the record.
        index: usize,
        /// Validation failure.
        source: TransformError,
    },

    /// A record's shape parameters are out of range.
    #[error("cell #{index} has invalid parameters: {source}")]
    InvalidShape {
        /// Registry index of the record.
        index: usize,
        /// Validation failure.
        source: ShapeError,
    },

    /// Records nest deeper than the configured limit.
    #[error("tree nests deeper than {max_depth} levels")]
    TooDeep {
        /// Configured limit.
        max_depth: usize,
    },

    /// A composite declares more children than the configured limit.
    #[error("composite declares {count} children (limit {max})")]
    TooManyChildren {
        /// Declared child count.
        count: u32,
        /// Configured limit.
        max: u32,
    },

    /// Bytes remain after the root slot.
    #[error("{len} trailing bytes after the root cell at byte {offset}")]
    TrailingData {
        /// Offset of the first unread byte.
        offset: usize,
        /// Number of unread bytes.
        len: usize,
    },
}

impl ReadError {
    /// Create a truncation error.
    pub fn truncated(offset: usize, needed: usize) -> Self {
        Self::Truncated { offset, needed }
    }
}

/// Errors that can occur while encoding a geometry tree.
///
/// Limit and transform checks run before any byte is written.
#[derive(Error, Debug)]
pub enum WriteError {
    /// I/O error writing the output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The tree nests deeper than the configured limit.
    #[error("tree nests deeper than {max_depth} levels")]
    TooDeep {
        /// Configured limit.
        max_depth: usize,
    },

    /// A composite has more children than the limit or the format allows.
    #[error("composite has {count} children (limit {max})")]
    TooManyChildren {
        /// Actual child count.
        count: usize,
        /// Configured limit.
        max: u32,
    },

    /// A cell's transform is outside the configured rigid tolerance.
    #[error("cell #{index} has an invalid transform: {source}")]
    InvalidTransform {
        /// Registry index the cell would receive.
        index: usize,
        /// Validation failure.
        source: TransformError,
    },
}
