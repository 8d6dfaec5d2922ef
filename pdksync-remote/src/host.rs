//! Hosting-service seam.
//!
//! The pipeline only talks to the hosting service through [`GitHost`], so
//! runs can be driven against an in-memory host in tests.

use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// A pull request to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    /// Branch containing the changes.
    pub head: String,
    /// Branch the changes merge into.
    pub base: String,
}

/// An opened pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
}

/// Operations pdksync needs from the service hosting module repositories.
///
/// `repo` is always the `<namespace>/<module>` slug.
pub trait GitHost {
    /// Login name of the authenticated user; fails if the token is invalid.
    fn login(&self) -> Result<String, RemoteError>;

    fn repository_exists(&self, repo: &str) -> Result<bool, RemoteError>;

    /// Names of every label defined on the repository.
    fn labels(&self, repo: &str) -> Result<Vec<String>, RemoteError>;

    fn create_pull_request(
        &self,
        repo: &str,
        pr: &NewPullRequest,
    ) -> Result<PullRequest, RemoteError>;

    fn add_labels(&self, repo: &str, number: u64, labels: &[String]) -> Result<(), RemoteError>;

    /// Delete a remote branch.
    fn delete_branch(&self, repo: &str, branch: &str) -> Result<(), RemoteError>;
}
