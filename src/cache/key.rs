//! Cache key derivation
//!
//! The hash input is a `::`-delimited string:
//!
//! ```text
//! version=<tool><suffix>::cmake=<cmake>::options=<sorted,options>::<package>=<sha>
//!     ::<dep>=<sha>[::<dep>-options=<sorted,options>]...
//! ```
//!
//! Dependencies come from the environment's dependency map in name order.
//! A dependency is left out when it is the package itself, or when the tree
//! knows it but it is not reachable from the package. Any change to this
//! layout changes every key, so existing cache entries stop matching.

use crate::env::BuildEnvironment;
use crate::error::{BuildchainError, BuildchainResult};
use crate::options::normalize_options;
use crate::package::{DependencyOptions, PackageIdentity, PackageName, RefSpec};
use crate::services::RefResolver;
use crate::tree::DependencyTree;
use sha1::{Digest, Sha1};
use std::fmt::{self, Write};
use tracing::{debug, info};

/// Version folded into every key
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runner description used as the key prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub compiler: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, compiler: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            compiler: compiler.into(),
        }
    }
}

/// Inputs shared by every key computed in one run
#[derive(Debug, Clone, Copy)]
pub struct KeyContext<'a> {
    pub tool_version: &'a str,
    pub cache_suffix: Option<&'a str>,
    pub env: &'a BuildEnvironment,
    pub tree: &'a DependencyTree,
    pub dependency_options: &'a DependencyOptions,
}

impl<'a> KeyContext<'a> {
    pub fn new(
        env: &'a BuildEnvironment,
        tree: &'a DependencyTree,
        dependency_options: &'a DependencyOptions,
    ) -> Self {
        Self {
            tool_version: TOOL_VERSION,
            cache_suffix: None,
            env,
            tree,
            dependency_options,
        }
    }

    pub fn with_cache_suffix(mut self, suffix: Option<&'a str>) -> Self {
        self.cache_suffix = suffix;
        self
    }

    pub fn with_tool_version(mut self, version: &'a str) -> Self {
        self.tool_version = version;
        self
    }
}

/// Identity of one package's build output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheObject {
    pub cache_key: String,
    pub head_sha: String,
}

impl fmt::Display for CacheObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.cache_key, self.head_sha)
    }
}

/// Build the string that gets hashed
///
/// Absent values (suffix, CMake version, commit) are rendered as empty.
pub fn hash_input(
    ctx: &KeyContext<'_>,
    package: &PackageName,
    build_options: Option<&str>,
    head_sha: Option<&str>,
) -> String {
    let mut input = format!(
        "version={}{}::cmake={}::options={}::{}={}",
        ctx.tool_version,
        ctx.cache_suffix.unwrap_or_default(),
        ctx.env.cmake_version().unwrap_or_default(),
        normalize_options(build_options),
        package,
        head_sha.unwrap_or_default(),
    );

    let relevant = ctx.tree.flatten(package.as_str());

    for (dep, sha) in ctx.env.dependencies() {
        if dep == package {
            continue;
        }
        if ctx.tree.contains(dep.as_str()) && !relevant.contains(dep) {
            continue;
        }

        let _ = write!(input, "::{}={}", dep, sha);

        if let Some(options) = ctx.dependency_options.get(dep).filter(|o| !o.is_empty()) {
            let _ = write!(
                input,
                "::{}-options={}",
                dep,
                normalize_options(Some(options))
            );
        }
    }

    input
}

/// SHA-1 of `input` as 40 lowercase hex characters
pub fn digest_hex(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Deterministic hash over everything that affects a package's build output
pub fn compute_hash(
    ctx: &KeyContext<'_>,
    package: &PackageName,
    build_options: Option<&str>,
    head_sha: Option<&str>,
) -> String {
    let input = hash_input(ctx, package, build_options, head_sha);
    debug!("Cache key input: {}", input);
    digest_hex(&input)
}

/// Resolve the package's commit and compose `<os>-<compiler>-<package>-<hash>`
///
/// A 40-character hex ref is used as the commit directly; anything else is
/// looked up through `resolver`.
pub async fn compute_key(
    resolver: &dyn RefResolver,
    identity: &PackageIdentity,
    platform: &Platform,
    ctx: &KeyContext<'_>,
    build_options: Option<&str>,
) -> BuildchainResult<CacheObject> {
    info!("Repository: {}", identity.slug());

    let head_sha = match identity.ref_spec() {
        RefSpec::Commit(sha) => {
            info!("Hash: {}", sha);
            sha
        }
        spec => {
            let api_ref = spec.api_ref().unwrap_or_default();
            info!("Branch: {}", spec);
            info!("Ref: {}", api_ref);
            resolver
                .resolve_ref(&identity.owner, &identity.repository, &api_ref)
                .await
                .map_err(|e| match e {
                    BuildchainError::Resolution { .. } => e,
                    other => BuildchainError::Resolution {
                        repository: identity.repository.clone(),
                        reason: other.message().unwrap_or_default(),
                    },
                })?
        }
    };
    info!("Head SHA: {}", head_sha);

    let hash = compute_hash(ctx, &identity.package, build_options, Some(&head_sha));
    let cache_key = format!(
        "{}-{}-{}-{}",
        platform.os, platform.compiler, identity.package, hash
    );
    info!("Cache key: {}", cache_key);

    Ok(CacheObject {
        cache_key,
        head_sha,
    })
}
