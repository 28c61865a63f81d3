//! Scripted in-memory collaborators for tests
//!
//! All fakes of one [`FakeServices`] share a [`CallLog`], so tests can assert
//! on the exact order in which the orchestrator touched its collaborators.

use super::{
    ArtifactStore, BuildReport, BuildRequest, CacheStore, CoverageReport, DirectorySizer,
    EnvironmentDetector, PackageBuilder, RefResolver, Services, SourceFetcher,
};
use crate::env::{BuildEnvironment, Toolchain};
use crate::error::{BuildchainError, BuildchainResult};
use crate::package::PackageIdentity;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Shared, ordered record of collaborator calls
#[derive(Debug, Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Entries starting with `prefix`
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.matching(prefix).len()
    }
}

/// Outcome of a scripted boolean operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scripted {
    Yes,
    No,
    Fail,
}

impl Scripted {
    fn result(self, err: impl FnOnce() -> BuildchainError) -> BuildchainResult<bool> {
        match self {
            Scripted::Yes => Ok(true),
            Scripted::No => Ok(false),
            Scripted::Fail => Err(err()),
        }
    }
}

/// Resolver answering from a fixed table
#[derive(Debug, Default)]
pub(crate) struct FakeResolver {
    refs: HashMap<String, String>,
    fallback: Option<String>,
    log: CallLog,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every ref to `sha`
    pub fn answering(sha: impl Into<String>) -> Self {
        Self {
            fallback: Some(sha.into()),
            ..Self::default()
        }
    }

    pub fn with_ref(mut self, slug: &str, git_ref: &str, sha: impl Into<String>) -> Self {
        self.refs.insert(format!("{} {}", slug, git_ref), sha.into());
        self
    }

    fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// `owner/repo ref` of every call so far
    pub fn calls(&self) -> Vec<String> {
        self.log
            .matching("resolve ")
            .into_iter()
            .map(|e| e.trim_start_matches("resolve ").to_string())
            .collect()
    }
}

#[async_trait]
impl RefResolver for FakeResolver {
    async fn resolve_ref(&self, owner: &str, repo: &str, git_ref: &str) -> BuildchainResult<String> {
        let key = format!("{}/{} {}", owner, repo, git_ref);
        self.log.push(format!("resolve {}", key));
        self.refs
            .get(&key)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| BuildchainError::Resolution {
                repository: repo.to_string(),
                reason: "HTTP 404".to_string(),
            })
    }
}

struct FakeCache {
    restore: Scripted,
    save: Scripted,
    log: CallLog,
}

#[async_trait]
impl CacheStore for FakeCache {
    async fn restore(&self, _paths: &[PathBuf], key: &str) -> BuildchainResult<bool> {
        self.log.push(format!("cache.restore {}", key));
        self.restore.result(|| BuildchainError::CacheRestore {
            package: key.to_string(),
            reason: "scripted failure".to_string(),
        })
    }

    async fn save(&self, _paths: &[PathBuf], key: &str) -> BuildchainResult<bool> {
        self.log.push(format!("cache.save {}", key));
        self.save.result(|| BuildchainError::CacheSave {
            package: key.to_string(),
            reason: "scripted failure".to_string(),
        })
    }
}

struct FakeArtifacts {
    fetch: Scripted,
    publish: Scripted,
    log: CallLog,
}

#[async_trait]
impl ArtifactStore for FakeArtifacts {
    async fn fetch(&self, name: &str, _dest: &Path) -> BuildchainResult<bool> {
        self.log.push(format!("artifact.fetch {}", name));
        self.fetch.result(|| {
            BuildchainError::io(
                format!("fetching artifact {}", name),
                std::io::ErrorKind::Other.into(),
            )
        })
    }

    async fn publish(&self, name: &str, _path: &Path) -> BuildchainResult<bool> {
        self.log.push(format!("artifact.publish {}", name));
        self.publish.result(|| BuildchainError::Publish {
            name: name.to_string(),
            reason: "scripted failure".to_string(),
        })
    }
}

struct FakeSources {
    fetch: Scripted,
    log: CallLog,
}

#[async_trait]
impl SourceFetcher for FakeSources {
    async fn fetch(
        &self,
        identity: &PackageIdentity,
        head_sha: &str,
        _dest: &Path,
    ) -> BuildchainResult<bool> {
        self.log
            .push(format!("source.fetch {} {}", identity.slug(), head_sha));
        self.fetch
            .result(|| BuildchainError::command_exec("git fetch", "remote ref not found"))
    }
}

struct FakeBuilder {
    failing: Vec<String>,
    log: CallLog,
}

#[async_trait]
impl PackageBuilder for FakeBuilder {
    async fn build(&self, request: &BuildRequest<'_>) -> BuildchainResult<BuildReport> {
        self.log.push(format!(
            "build {} options={} tests={} coverage={}",
            request.package,
            request.options.unwrap_or_default(),
            request.run_tests,
            request.coverage
        ));

        if self.failing.iter().any(|p| p == request.package.as_str()) {
            return Ok(BuildReport::failure());
        }

        let build = request.source_dir.join("build");
        Ok(BuildReport {
            succeeded: true,
            coverage: request.coverage.then(|| CoverageReport {
                file: build.join("coverage.info"),
                dir: build.join("coverage"),
            }),
        })
    }
}

struct FakeSizer {
    size: Option<u64>,
    log: CallLog,
}

#[async_trait]
impl DirectorySizer for FakeSizer {
    async fn measure(&self, path: &Path) -> Option<u64> {
        self.log.push(format!("measure {}", path.display()));
        self.size
    }
}

struct FakeDetector {
    environment: Option<BuildEnvironment>,
    log: CallLog,
}

#[async_trait]
impl EnvironmentDetector for FakeDetector {
    async fn detect(
        &self,
        os: &str,
        toolchain: &Toolchain,
    ) -> BuildchainResult<Option<BuildEnvironment>> {
        self.log.push(format!("detect {}", os));
        Ok(self.environment.clone().map(|env| {
            let mut fresh = BuildEnvironment::new(toolchain.clone());
            if let Some(version) = env.cmake_version() {
                fresh = fresh.with_cmake_version(version);
            }
            if let Some(path) = env.path() {
                fresh = fresh.with_path(path);
            }
            fresh
        }))
    }
}

/// Script for a full set of collaborators
///
/// Defaults describe a cold run: nothing cached or published yet, every
/// fetch, build, save and publish succeeds.
#[derive(Debug, Clone)]
pub(crate) struct FakeServices {
    pub log: CallLog,
    pub head_sha: Option<String>,
    pub artifact_fetch: Scripted,
    pub artifact_publish: Scripted,
    pub cache_restore: Scripted,
    pub cache_save: Scripted,
    pub source_fetch: Scripted,
    pub failing_builds: Vec<String>,
    pub size: Option<u64>,
    pub environment: Option<BuildEnvironment>,
}

impl Default for FakeServices {
    fn default() -> Self {
        Self {
            log: CallLog::default(),
            head_sha: Some("f".repeat(40)),
            artifact_fetch: Scripted::No,
            artifact_publish: Scripted::Yes,
            cache_restore: Scripted::No,
            cache_save: Scripted::Yes,
            source_fetch: Scripted::Yes,
            failing_builds: Vec::new(),
            size: Some(1024),
            environment: Some(
                BuildEnvironment::default()
                    .with_cmake_version("3.28.1")
                    .with_path("/usr/bin"),
            ),
        }
    }
}

impl FakeServices {
    pub fn services(&self) -> Services {
        let resolver = match &self.head_sha {
            Some(sha) => FakeResolver::answering(sha.clone()),
            None => FakeResolver::new(),
        };

        Services {
            resolver: Box::new(resolver.with_log(self.log.clone())),
            cache: Box::new(FakeCache {
                restore: self.cache_restore,
                save: self.cache_save,
                log: self.log.clone(),
            }),
            artifacts: Box::new(FakeArtifacts {
                fetch: self.artifact_fetch,
                publish: self.artifact_publish,
                log: self.log.clone(),
            }),
            sources: Box::new(FakeSources {
                fetch: self.source_fetch,
                log: self.log.clone(),
            }),
            builder: Box::new(FakeBuilder {
                failing: self.failing_builds.clone(),
                log: self.log.clone(),
            }),
            sizer: Box::new(FakeSizer {
                size: self.size,
                log: self.log.clone(),
            }),
            detector: Box::new(FakeDetector {
                environment: self.environment.clone(),
                log: self.log.clone(),
            }),
        }
    }
}
