//! Shallow source checkout with the git CLI

use super::process::Invocation;
use super::SourceFetcher;
use crate::error::BuildchainResult;
use crate::package::PackageIdentity;
use async_trait::async_trait;
use std::path::Path;
use tracing::{info, warn};

/// Public GitHub clone endpoint
pub const DEFAULT_GIT_URL: &str = "https://github.com";

/// Fetches exactly one commit into an empty directory
pub struct GitSourceFetcher {
    git_url: String,
    token: Option<String>,
}

impl GitSourceFetcher {
    pub fn new(git_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            git_url: git_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Clone URL without credentials, safe to log
    pub fn public_url(&self, identity: &PackageIdentity) -> String {
        format!("{}/{}.git", self.git_url, identity.slug())
    }

    fn authenticated_url(&self, identity: &PackageIdentity) -> String {
        let public = self.public_url(identity);
        match (&self.token, public.split_once("://")) {
            (Some(token), Some((scheme, rest))) => {
                format!("{}://x-access-token:{}@{}", scheme, token, rest)
            }
            _ => public,
        }
    }
}

impl Default for GitSourceFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_GIT_URL, None)
    }
}

#[async_trait]
impl SourceFetcher for GitSourceFetcher {
    async fn fetch(
        &self,
        identity: &PackageIdentity,
        head_sha: &str,
        dest: &Path,
    ) -> BuildchainResult<bool> {
        let public = self.public_url(identity);
        info!("Fetching {} at {}", public, head_sha);

        if let Err(e) = tokio::fs::create_dir_all(dest).await {
            warn!("Could not create {}: {}", dest.display(), e);
            return Ok(false);
        }

        let steps = [
            Invocation::new("git", ["init", "--quiet"]),
            Invocation::new(
                "git",
                [
                    "fetch".to_string(),
                    "--quiet".to_string(),
                    "--depth".to_string(),
                    "1".to_string(),
                    self.authenticated_url(identity),
                    head_sha.to_string(),
                ],
            )
            .display_as(format!("git fetch --depth 1 {} {}", public, head_sha)),
            Invocation::new("git", ["checkout", "--quiet", "FETCH_HEAD"]),
        ];

        for step in steps {
            if let Err(e) = step.current_dir(dest).run().await {
                warn!("{}", e);
                return Ok(false);
            }
        }

        info!("Checked out {} into {}", identity.slug(), dest.display());
        Ok(true)
    }
}
