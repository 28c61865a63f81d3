//! Environment setup through `cmake -E capabilities`

use super::{BuildEnvironment, Toolchain};
use crate::error::BuildchainResult;
use crate::services::EnvironmentDetector;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Reads the CMake version (and the Homebrew OpenSSL prefix on macOS)
pub struct CmakeDetector {
    cmake: String,
    brew: String,
}

impl CmakeDetector {
    pub fn new() -> Self {
        Self {
            cmake: "cmake".to_string(),
            brew: "brew".to_string(),
        }
    }

    /// Use a specific cmake executable
    pub fn with_cmake(mut self, cmake: impl Into<String>) -> Self {
        self.cmake = cmake.into();
        self
    }

    async fn capture(program: &str, args: &[&str]) -> std::io::Result<std::process::Output> {
        debug!("Executing: {} {:?}", program, args);
        Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
    }
}

impl Default for CmakeDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract `version.string` from `cmake -E capabilities` output
pub fn parse_cmake_version(capabilities: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(capabilities).ok()?;
    json.get("version")?
        .get("string")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl EnvironmentDetector for CmakeDetector {
    async fn detect(
        &self,
        os: &str,
        toolchain: &Toolchain,
    ) -> BuildchainResult<Option<BuildEnvironment>> {
        info!(
            cc = ?toolchain.cc,
            cxx = ?toolchain.cxx,
            fc = ?toolchain.fc,
            "Setting up build environment"
        );
        let mut env = BuildEnvironment::new(toolchain.clone());

        let output = match Self::capture(&self.cmake, &["-E", "capabilities"]).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Could not run {}: {}", self.cmake, e);
                return Ok(None);
            }
        };

        if !output.status.success() {
            warn!("CMake capabilities command failed");
            return Ok(Some(env));
        }

        match parse_cmake_version(&String::from_utf8_lossy(&output.stdout)) {
            Some(version) => {
                info!("CMake version: {}", version);
                env = env.with_cmake_version(version);
            }
            None => {
                warn!("CMake version string not found");
                return Ok(Some(env));
            }
        }

        // Linking against the system OpenSSL is not permitted on macOS runners
        if os.starts_with("macos-") {
            match Self::capture(&self.brew, &["--prefix", "openssl"]).await {
                Ok(output) if output.status.success() => {
                    let prefix = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if prefix.is_empty() {
                        warn!("Homebrew OpenSSL prefix not found");
                    } else {
                        info!("OpenSSL prefix: {}", prefix);
                        env = env.with_openssl_dir(&prefix);
                    }
                }
                Ok(_) => warn!("Homebrew command failed"),
                Err(e) => warn!("Could not run {}: {}", self.brew, e),
            }
        }

        Ok(Some(env))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_string() {
        let json = r#"{"version":{"isDirty":false,"major":3,"minor":28,"patch":1,"string":"3.28.1","suffix":""},"generators":[]}"#;
        assert_eq!(parse_cmake_version(json).as_deref(), Some("3.28.1"));
    }

    #[test]
    fn missing_version_is_none() {
        assert_eq!(parse_cmake_version("{}"), None);
        assert_eq!(parse_cmake_version("not json"), None);
        assert_eq!(parse_cmake_version(r#"{"version":{"major":3}}"#), None);
    }

    #[tokio::test]
    async fn missing_cmake_means_no_environment() {
        let detector = CmakeDetector::new().with_cmake("/nonexistent/buildchain-test-cmake");
        let env = detector.detect("ubuntu-22.04", &Toolchain::default()).await.unwrap();
        assert!(env.is_none());
    }
}
