//! Error types for pdksync-remote.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from git subprocesses and HTTP calls.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// `git` could not be spawned at all.
    #[error("failed to run `{command}` in {dir}: {source}")]
    Spawn {
        command: String,
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `git` ran and exited non-zero.
    #[error("`{command}` failed in {dir} (status {status}): {stderr}")]
    GitFailed {
        command: String,
        dir: PathBuf,
        status: String,
        stderr: String,
    },

    /// The API rejected the token.
    #[error("Token is invalid: {0}")]
    TokenInvalid(String),

    /// Non-success HTTP status.
    #[error("{method} {url} returned {status}: {body}")]
    Http {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    /// DNS, TLS, connection, or timeout failure.
    #[error("{method} {url} failed: {message}")]
    Transport {
        method: &'static str,
        url: String,
        message: String,
    },

    /// Response body was not the JSON we expected.
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: std::io::Error,
    },
}
