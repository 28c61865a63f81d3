//! Ref resolution through the GitHub REST API

use super::RefResolver;
use crate::error::{BuildchainError, BuildchainResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Public GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Debug, Deserialize)]
struct RefObject {
    sha: String,
}

/// Pull the commit out of a `GET /repos/{owner}/{repo}/git/ref/{ref}` body
pub fn parse_ref_response(body: &str) -> BuildchainResult<String> {
    let parsed: RefResponse = serde_json::from_str(body)?;
    Ok(parsed.object.sha)
}

/// Resolves branches and tags with `GET /repos/{owner}/{repo}/git/ref/{ref}`
pub struct GithubRefResolver {
    api_url: String,
    token: Option<String>,
}

impl GithubRefResolver {
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn ref_url(&self, owner: &str, repo: &str, git_ref: &str) -> String {
        format!(
            "{}/repos/{}/{}/git/ref/{}",
            self.api_url, owner, repo, git_ref
        )
    }

    fn fetch(url: &str, token: Option<&str>) -> Result<String, String> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();

        let mut request = agent
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", concat!("buildchain/", env!("CARGO_PKG_VERSION")));
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let mut response = request.call().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| e.to_string())?;

        if status != 200 {
            return Err(format!("HTTP {}", status));
        }
        Ok(body)
    }
}

impl Default for GithubRefResolver {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, None)
    }
}

#[async_trait]
impl RefResolver for GithubRefResolver {
    async fn resolve_ref(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> BuildchainResult<String> {
        let url = self.ref_url(owner, repo, git_ref);
        debug!("GET {}", url);

        let token = self.token.clone();
        let fetch_url = url.clone();
        let body = tokio::task::spawn_blocking(move || Self::fetch(&fetch_url, token.as_deref()))
            .await
            .map_err(BuildchainError::from_join)?
            .map_err(|reason| BuildchainError::Resolution {
                repository: repo.to_string(),
                reason,
            })?;

        parse_ref_response(&body).map_err(|e| BuildchainError::Resolution {
            repository: repo.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_url_layout() {
        let resolver = GithubRefResolver::new("https://api.github.com/", None);
        assert_eq!(
            resolver.ref_url("ecmwf", "eckit", "heads/develop"),
            "https://api.github.com/repos/ecmwf/eckit/git/ref/heads/develop"
        );
    }

    #[test]
    fn parses_object_sha() {
        let body = r#"{
            "ref": "refs/heads/develop",
            "node_id": "MDM6UmVm",
            "url": "https://api.github.com/repos/ecmwf/eckit/git/refs/heads/develop",
            "object": {
                "sha": "4f1c2b7d9e0a3c5b6d8e9f0a1b2c3d4e5f6a7b8c",
                "type": "commit",
                "url": "https://api.github.com/repos/ecmwf/eckit/git/commits/4f1c2b7d"
            }
        }"#;
        assert_eq!(
            parse_ref_response(body).unwrap(),
            "4f1c2b7d9e0a3c5b6d8e9f0a1b2c3d4e5f6a7b8c"
        );
    }

    #[test]
    fn body_without_object_is_an_error() {
        assert!(parse_ref_response(r#"{"message":"Not Found"}"#).is_err());
    }

    #[tokio::test]
    async fn unreachable_api_is_a_resolution_error() {
        let resolver = GithubRefResolver::new("http://127.0.0.1:1", None);
        let err = resolver
            .resolve_ref("ecmwf", "eckit", "heads/develop")
            .await
            .unwrap_err();
        assert!(matches!(err, BuildchainError::Resolution { ref repository, .. } if repository == "eckit"));
    }
}
