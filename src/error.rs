//! Typed errors for descriptor handling and YAML emission.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while merging descriptors.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A required key is absent from a descriptor.
    #[error("{}: descriptor #{index} is missing required field `{field}`", file.display())]
    MissingField {
        file: PathBuf,
        index: usize,
        field: &'static str,
    },

    /// A required key is present but holds the wrong kind of value.
    #[error("{}: descriptor #{index} field `{field}` must be {expected}", file.display())]
    InvalidField {
        file: PathBuf,
        index: usize,
        field: &'static str,
        expected: &'static str,
    },

    /// The emitter cannot place a dash with the requested indentation.
    #[error("sequence indent ({sequence}) must be greater than sequence offset ({offset})")]
    InvalidIndent { sequence: usize, offset: usize },

    /// Only scalar mapping keys are written in block style.
    #[error("cannot emit non-scalar mapping key")]
    UnsupportedKey,

    #[error("failed to render YAML scalar: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to escape string: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reasons a single discovery file is skipped.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error("expected a sequence of descriptors, found {0}")]
    NotASequence(&'static str),

    #[error("item #{0} is not a mapping")]
    NotAMapping(usize),
}

/// Convenience alias for results carrying a [`MergeError`].
pub type MergeResult<T> = std::result::Result<T, MergeError>;
