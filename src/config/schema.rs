//! Configuration schema for buildchain
//!
//! Every section is optional in the file; missing keys fall back to the
//! defaults below.

use crate::services::github::DEFAULT_API_URL;
use crate::services::git::DEFAULT_GIT_URL;
use crate::services::BuildTool;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Runner description used in cache keys
    pub platform: PlatformConfig,

    /// Working and storage directories
    pub paths: PathsConfig,

    /// Hosting service endpoints
    pub github: GithubConfig,

    /// Build tool settings
    pub build: BuildConfig,

    /// Cache key settings
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Write a JSON-lines journal of every run
    pub journal: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            journal: true,
        }
    }
}

/// Runner platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Runner image name, e.g. `ubuntu-22.04` or `macos-13`
    pub os: String,

    /// Compiler family, e.g. `gnu-12`
    pub compiler: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            compiler: "gnu".to_string(),
        }
    }
}

/// Directory layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Install root; each package gets `<install_dir>/<package>`
    pub install_dir: PathBuf,

    /// Source checkouts; each dependency gets `<download_dir>/<package>`
    pub download_dir: PathBuf,

    /// Local cache store
    pub cache_dir: PathBuf,

    /// Local artifact store
    pub artifact_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data = super::ConfigManager::data_dir();
        Self {
            install_dir: PathBuf::from("install"),
            download_dir: PathBuf::from("download"),
            cache_dir: data.join("cache"),
            artifact_dir: data.join("artifacts"),
        }
    }
}

/// GitHub endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// REST API base (GitHub Enterprise uses `https://<host>/api/v3`)
    pub api_url: String,

    /// Clone base URL
    pub git_url: String,

    /// Environment variable holding the access token
    pub token_env: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            git_url: DEFAULT_GIT_URL.to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
        }
    }
}

impl GithubConfig {
    /// Token from the configured environment variable, if set and non-empty
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.is_empty())
    }
}

/// Build settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// `cmake` or `ecbuild`
    pub tool: BuildTool,

    /// Parallel jobs passed to the build tool
    pub parallelism: u32,

    /// Branch used for dependencies declared without `@branch`
    pub dependency_branch: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            tool: BuildTool::default(),
            parallelism: std::thread::available_parallelism()
                .map(|n| n.get() as u32)
                .unwrap_or(1),
            dependency_branch: "develop".to_string(),
        }
    }
}

/// Cache key settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Appended to the tool version in every key; change it to invalidate all entries
    pub suffix: Option<String>,
}
