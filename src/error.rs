use std::io;

use thiserror::Error;

/// Errors raised while building or evaluating rigs and deformation systems.
#[derive(Debug, Error)]
pub enum Error {
    /// Two arrays that must line up have different lengths.
    #[error("length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An index refers past the end of the array it addresses.
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// The parent graph contains a cycle, so some bones never reach a root.
    #[error("bone hierarchy is cyclic: {unreachable} bone(s) not reachable from a root")]
    CyclicHierarchy { unreachable: usize },

    /// A parent entry is neither a valid bone index nor the root sentinel.
    #[error("bone {bone} has invalid parent {parent}")]
    InvalidParent { bone: usize, parent: i64 },

    #[error("channel for bone {bone} has no keyframes")]
    EmptyChannel { bone: usize },

    #[error("channel for bone {bone} has decreasing time at keyframe {index}")]
    UnsortedKeyframes { bone: usize, index: usize },

    #[error("channel for bone {bone} has a non-finite value at keyframe {index}")]
    NonFiniteKeyframe { bone: usize, index: usize },

    /// The deformation system needs at least one constrained vertex.
    #[error("at least one constrained vertex is required")]
    NoConstraints,

    #[error("constraint weight must be finite and positive, got {0}")]
    InvalidWeight(f64),

    /// Sparse factorization of the constrained system failed.
    #[error("factorization failed: {0}")]
    Factorization(String),

    #[error("triangle {0} has zero area")]
    DegenerateTriangle(usize),

    #[error("vertex {0} has a vanishing normal")]
    DegenerateNormal(usize),

    /// Malformed text or document content.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Structurally invalid glTF asset.
    #[error("invalid glTF: {0}")]
    Gltf(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<gltf::Error> for Error {
    fn from(e: gltf::Error) -> Self {
        match e {
            gltf::Error::Io(e) => Error::Io(e),
            other => Error::Gltf(other.to_string()),
        }
    }
}

impl Error {
    pub(crate) fn length(what: &'static str, expected: usize, actual: usize) -> Self {
        Error::LengthMismatch {
            what,
            expected,
            actual,
        }
    }

    pub(crate) fn out_of_range(what: &'static str, index: usize, len: usize) -> Self {
        Error::IndexOutOfRange { what, index, len }
    }

    pub(crate) fn parse(line: usize, message: impl ToString) -> Self {
        Error::Parse {
            line,
            message: message.to_string(),
        }
    }
}
