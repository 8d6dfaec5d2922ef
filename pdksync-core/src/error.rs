//! Error types for pdksync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from configuration and module-list operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, with the path that was being touched.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.pdksync.yml`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The managed module list is missing or has zero length.
    #[error("File '{path}' is empty/does not exist")]
    ModuleListMissing { path: PathBuf },

    /// The managed module list parsed, but every entry is commented out.
    #[error("No modules found in '{path}'")]
    NoModules { path: PathBuf },

    /// `modules enable|disable` named a module that is not in the list file.
    #[error("module '{name}' is not listed in {path}")]
    ModuleNotListed { name: String, path: PathBuf },

    /// Module-entry pattern failed to compile.
    #[error("invalid module pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A step name that is not part of the pipeline.
    #[error("unknown step '{0}'; expected one of: {steps}", steps = crate::types::Step::names().join(", "))]
    UnknownStep(String),
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
