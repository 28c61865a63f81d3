//! Collaborator interfaces used by the orchestrator
//!
//! The orchestrator never talks to the network, the filesystem stores, git or
//! the build tool directly. It goes through these traits so each backend can be
//! swapped (local directories in a self-hosted runner, fakes in tests).

mod factory;
#[cfg(test)]
pub(crate) mod fakes;
pub mod git;
pub mod github;
pub mod local;
mod process;
pub mod size;
pub mod toolchain;

pub use factory::create_services;
pub use git::GitSourceFetcher;
pub use github::GithubRefResolver;
pub use local::{LocalArtifactStore, LocalCacheStore};
pub use size::WalkdirSizer;
pub use toolchain::{BuildTool, CmakeBuilder};

use crate::env::{BuildEnvironment, Toolchain};
use crate::error::BuildchainResult;
use crate::package::{PackageIdentity, PackageName};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Resolves a branch or tag to a commit on the hosting service
#[async_trait]
pub trait RefResolver: Send + Sync {
    /// `git_ref` is already in `heads/<name>` or `tags/<name>` form
    async fn resolve_ref(&self, owner: &str, repo: &str, git_ref: &str)
        -> BuildchainResult<String>;
}

/// Keyed cache of build outputs
///
/// `Ok(false)` and `Err` both mean nothing was restored or saved; the error
/// only adds detail for the log.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn restore(&self, paths: &[PathBuf], key: &str) -> BuildchainResult<bool>;

    async fn save(&self, paths: &[PathBuf], key: &str) -> BuildchainResult<bool>;
}

/// Named build outputs published by earlier runs
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Download artifact `name` into `dest`; `Ok(false)` when it does not exist
    async fn fetch(&self, name: &str, dest: &Path) -> BuildchainResult<bool>;

    async fn publish(&self, name: &str, path: &Path) -> BuildchainResult<bool>;
}

/// Checks out package sources
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(
        &self,
        identity: &PackageIdentity,
        head_sha: &str,
        dest: &Path,
    ) -> BuildchainResult<bool>;
}

/// Everything the build tool needs for one package
#[derive(Debug)]
pub struct BuildRequest<'a> {
    pub package: &'a PackageName,
    pub source_dir: &'a Path,
    pub install_dir: &'a Path,
    pub options: Option<&'a str>,
    pub env: &'a BuildEnvironment,
    /// Forwarded to the build tool, not used for scheduling
    pub parallelism: u32,
    pub run_tests: bool,
    pub coverage: bool,
}

/// Coverage output of a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageReport {
    pub file: PathBuf,
    pub dir: PathBuf,
}

/// Result of one build invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub succeeded: bool,
    pub coverage: Option<CoverageReport>,
}

impl BuildReport {
    pub fn success() -> Self {
        Self {
            succeeded: true,
            coverage: None,
        }
    }

    pub fn failure() -> Self {
        Self::default()
    }
}

/// Configures, builds and installs a package
#[async_trait]
pub trait PackageBuilder: Send + Sync {
    async fn build(&self, request: &BuildRequest<'_>) -> BuildchainResult<BuildReport>;
}

/// Measures the size of a build output
#[async_trait]
pub trait DirectorySizer: Send + Sync {
    /// Total size in bytes, `None` when it cannot be measured
    async fn measure(&self, path: &Path) -> Option<u64>;
}

/// Prepares the initial build environment
#[async_trait]
pub trait EnvironmentDetector: Send + Sync {
    /// `Ok(None)` means no usable environment could be prepared
    async fn detect(
        &self,
        os: &str,
        toolchain: &Toolchain,
    ) -> BuildchainResult<Option<BuildEnvironment>>;
}

/// The full set of collaborators for one run
pub struct Services {
    pub resolver: Box<dyn RefResolver>,
    pub cache: Box<dyn CacheStore>,
    pub artifacts: Box<dyn ArtifactStore>,
    pub sources: Box<dyn SourceFetcher>,
    pub builder: Box<dyn PackageBuilder>,
    pub sizer: Box<dyn DirectorySizer>,
    pub detector: Box<dyn EnvironmentDetector>,
}
