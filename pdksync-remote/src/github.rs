//! GitHub REST implementation of [`GitHost`].
//!
//! Blocking `ureq` calls, one request per operation:
//!
//! | operation              | request                                        |
//! |------------------------|------------------------------------------------|
//! | `login`                | `GET /user`                                    |
//! | `repository_exists`    | `GET /repos/{repo}` (404 → false)              |
//! | `labels`               | `GET /repos/{repo}/labels?per_page=100&page=N` |
//! | `create_pull_request`  | `POST /repos/{repo}/pulls`                     |
//! | `add_labels`           | `POST /repos/{repo}/issues/{number}/labels`    |
//! | `delete_branch`        | `DELETE /repos/{repo}/git/refs/heads/{branch}` |

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::error::RemoteError;
use crate::host::{GitHost, NewPullRequest, PullRequest};

const USER_AGENT: &str = concat!("pdksync/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: usize = 100;

#[derive(Deserialize)]
struct User {
    login: String,
}

#[derive(Deserialize)]
struct Label {
    name: String,
}

/// Authenticated GitHub API client.
pub struct GitHubClient {
    agent: ureq::Agent,
    endpoint: String,
    token: String,
}

impl GitHubClient {
    pub fn new(endpoint: &str, token: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(TIMEOUT)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", "2022-11-28")
    }
}

impl GitHost for GitHubClient {
    fn login(&self) -> Result<String, RemoteError> {
        let url = self.url("/user");
        let resp = match self.request("GET", &url).call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(401, resp)) => {
                return Err(RemoteError::TokenInvalid(
                    resp.into_string().unwrap_or_default(),
                ))
            }
            Err(e) => return Err(http_err("GET", &url, e)),
        };
        let user: User = decode(&url, resp)?;
        tracing::debug!("authenticated as {}", user.login);
        Ok(user.login)
    }

    fn repository_exists(&self, repo: &str) -> Result<bool, RemoteError> {
        let url = self.url(&format!("/repos/{repo}"));
        match self.request("GET", &url).call() {
            Ok(_) => Ok(true),
            Err(ureq::Error::Status(404, _)) => Ok(false),
            Err(e) => Err(http_err("GET", &url, e)),
        }
    }

    fn labels(&self, repo: &str) -> Result<Vec<String>, RemoteError> {
        let mut names = Vec::new();
        for page in 1.. {
            let url = self.url(&format!(
                "/repos/{repo}/labels?per_page={PAGE_SIZE}&page={page}"
            ));
            let resp = self
                .request("GET", &url)
                .call()
                .map_err(|e| http_err("GET", &url, e))?;
            let labels: Vec<Label> = decode(&url, resp)?;
            let done = labels.len() < PAGE_SIZE;
            names.extend(labels.into_iter().map(|l| l.name));
            if done {
                break;
            }
        }
        Ok(names)
    }

    fn create_pull_request(
        &self,
        repo: &str,
        pr: &NewPullRequest,
    ) -> Result<PullRequest, RemoteError> {
        let url = self.url(&format!("/repos/{repo}/pulls"));
        let resp = self
            .request("POST", &url)
            .send_json(json!({
                "title": pr.title,
                "body": pr.body,
                "head": pr.head,
                "base": pr.base,
            }))
            .map_err(|e| http_err("POST", &url, e))?;
        let created: PullRequest = decode(&url, resp)?;
        tracing::info!("opened {} for {repo}", created.html_url);
        Ok(created)
    }

    fn add_labels(&self, repo: &str, number: u64, labels: &[String]) -> Result<(), RemoteError> {
        let url = self.url(&format!("/repos/{repo}/issues/{number}/labels"));
        self.request("POST", &url)
            .send_json(json!({ "labels": labels }))
            .map_err(|e| http_err("POST", &url, e))?;
        Ok(())
    }

    fn delete_branch(&self, repo: &str, branch: &str) -> Result<(), RemoteError> {
        let url = self.url(&format!("/repos/{repo}/git/refs/heads/{branch}"));
        self.request("DELETE", &url)
            .call()
            .map_err(|e| http_err("DELETE", &url, e))?;
        tracing::info!("deleted branch {branch} on {repo}");
        Ok(())
    }
}

pub(crate) fn http_err(method: &'static str, url: &str, err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(status, resp) => RemoteError::Http {
            method,
            url: url.to_string(),
            status,
            body: resp.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(t) => RemoteError::Transport {
            method,
            url: url.to_string(),
            message: t.to_string(),
        },
    }
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    url: &str,
    resp: ureq::Response,
) -> Result<T, RemoteError> {
    resp.into_json().map_err(|e| RemoteError::Decode {
        url: url.to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let client = GitHubClient::new("https://api.github.com/", "t");
        assert_eq!(client.url("/user"), "https://api.github.com/user");
    }

    #[test]
    fn pull_request_decodes_from_api_shape() {
        let pr: PullRequest = serde_json::from_str(
            r#"{"number": 42, "html_url": "https://github.com/o/r/pull/42", "state": "open"}"#,
        )
        .unwrap();
        assert_eq!(pr.number, 42);
        assert!(pr.html_url.ends_with("/pull/42"));
    }

    #[test]
    fn unreachable_endpoint_is_a_transport_error() {
        let client = GitHubClient::new("http://127.0.0.1:9", "t");
        let err = client.repository_exists("o/r").unwrap_err();
        assert!(matches!(err, RemoteError::Transport { .. }), "got: {err}");
    }
}
