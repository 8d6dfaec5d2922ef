//! Error types for pdksync-steps.

use std::path::PathBuf;

use thiserror::Error;

use pdksync_core::{ConfigError, Step};
use pdksync_gemfile::GemfileError;
use pdksync_remote::RemoteError;
use pdksync_renderer::RenderError;

/// All errors that can arise from a pipeline run.
#[derive(Debug, Error)]
pub enum StepError {
    /// A step's required argument is absent. The message is user facing.
    #[error("{0}")]
    MissingArgument(String),

    /// The argument payload has a shape the step cannot act on.
    #[error("no method `{step}` accepting {shape} arguments")]
    Dispatch { step: Step, shape: &'static str },

    /// An argument is present but not one the step understands.
    #[error("invalid argument for {step}: {message}")]
    InvalidArgument { step: Step, message: String },

    /// The requested label is not defined on the repository.
    #[error("Ensure label is valid: '{label}' does not exist on {repo}")]
    InvalidLabel { label: String, repo: String },

    /// A step that calls the hosting API was requested without a token.
    #[error("{0} needs the hosting API; set GITHUB_TOKEN")]
    HostRequired(Step),

    #[error("Could not find the following repositories: {0:?}")]
    UnknownRepositories(Vec<String>),

    /// A replacer names a branch or version that does not exist upstream.
    #[error("Couldn't find {field}: {value} in your repository: {gem}")]
    UnknownGemSource {
        gem: String,
        field: &'static str,
        value: String,
    },

    /// An external command exited non-zero.
    #[error("`{command}` failed in {dir} (status {status}): {stderr}")]
    CommandFailed {
        command: String,
        dir: PathBuf,
        status: String,
        stderr: String,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Gemfile error: {0}")]
    Gemfile(#[from] GemfileError),

    #[error("{0}")]
    Remote(#[from] RemoteError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),
}

/// Convenience constructor for [`StepError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StepError {
    StepError::Io {
        path: path.into(),
        source,
    }
}
