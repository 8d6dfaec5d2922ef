//! Error types for pdksync-gemfile.

use std::path::PathBuf;

use thiserror::Error;

use crate::editor::GemField;

/// All errors that can arise while editing a Gemfile.
#[derive(Debug, Error)]
pub enum GemfileError {
    /// Reading or writing the Gemfile failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No `gem` declaration mentions the target gem.
    #[error("Couldn't find gem '{gem}' in the Gemfile")]
    GemNotFound { gem: String },

    /// The finder text for a sub-field is not on the gem's line.
    #[error("Couldn't find {field}: {finder} for gem '{gem}'")]
    FinderNotFound {
        gem: String,
        field: GemField,
        finder: String,
    },

    /// A finder/replacer pair was given with only one half.
    #[error("gem_{field}_finder and gem_{field}_replacer must be given together")]
    IncompletePair { field: GemField },

    /// Neither a replacement line nor any finder/replacer pair was given.
    #[error("Needs a gem_line or a gem_sha, gem_version or gem_branch finder/replacer pair")]
    NothingToDo,

    #[error("invalid substitution pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> GemfileError {
    GemfileError::Io {
        path: path.into(),
        source,
    }
}
