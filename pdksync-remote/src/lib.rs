//! # pdksync-remote
//!
//! Everything pdksync does outside the local filesystem:
//!
//! - [`git`]: the `git` CLI, run as a subprocess per module working copy
//! - [`host`]: the [`GitHost`] seam used for pull requests, labels and branches
//! - [`github`]: [`GitHubClient`], the GitHub REST implementation of [`GitHost`]
//! - [`rubygems`]: published-version lookup for Gemfile validation

pub mod error;
pub mod git;
pub mod github;
pub mod host;
pub mod rubygems;

pub use error::RemoteError;
pub use git::Git;
pub use github::GitHubClient;
pub use host::{GitHost, NewPullRequest, PullRequest};
pub use rubygems::RubyGems;
