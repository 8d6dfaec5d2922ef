//! Published-version lookup against the RubyGems API.

use std::time::Duration;

use serde::Deserialize;

use crate::error::RemoteError;
use crate::github::{decode, http_err};

pub const DEFAULT_ENDPOINT: &str = "https://rubygems.org";

#[derive(Deserialize)]
struct GemVersion {
    number: String,
}

pub struct RubyGems {
    agent: ureq::Agent,
    endpoint: String,
}

impl Default for RubyGems {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl RubyGems {
    pub fn new(endpoint: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        Self {
            agent,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Every published version of `gem`. An unknown gem has none.
    pub fn versions(&self, gem: &str) -> Result<Vec<String>, RemoteError> {
        let url = format!("{}/api/v1/versions/{gem}.json", self.endpoint);
        match self.agent.get(&url).call() {
            Ok(resp) => {
                let versions: Vec<GemVersion> = decode(&url, resp)?;
                Ok(versions.into_iter().map(|v| v.number).collect())
            }
            Err(ureq::Error::Status(404, _)) => Ok(vec![]),
            Err(e) => Err(http_err("GET", &url, e)),
        }
    }

    /// True when every version named in `constraint` (e.g. `">= 1.0, < 2.0"`)
    /// has been published.
    pub fn constraint_is_published(&self, gem: &str, constraint: &str) -> Result<bool, RemoteError> {
        let wanted = constraint_versions(constraint);
        if wanted.is_empty() {
            return Ok(false);
        }
        let published = self.versions(gem)?;
        Ok(wanted.iter().all(|w| published.iter().any(|p| p == w)))
    }
}

/// Bare version numbers from a constraint list: `"<= 1.4.11, > 1.0"` → `["1.4.11", "1.0"]`.
pub fn constraint_versions(constraint: &str) -> Vec<String> {
    constraint
        .split(',')
        .map(|part| {
            part.trim()
                .trim_matches(|c| c == '\'' || c == '"')
                .trim_start_matches(|c: char| matches!(c, '~' | '>' | '<' | '=' | '!') || c.is_whitespace())
                .trim()
                .to_string()
        })
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_operators_are_stripped() {
        assert_eq!(constraint_versions("<= 1.4.11"), vec!["1.4.11"]);
        assert_eq!(constraint_versions("'~> 0.18', '>= 0.18.1'"), vec!["0.18", "0.18.1"]);
        assert_eq!(constraint_versions("=0.1.0"), vec!["0.1.0"]);
        assert!(constraint_versions(" , ").is_empty());
    }
}
