//! Build environment shared across one orchestration run
//!
//! The environment is created once by an [`EnvironmentDetector`](crate::services::EnvironmentDetector)
//! and then threaded by `&mut` through every package. After setup it is only
//! changed through the functions in [`propagate`], each of which bumps the
//! revision counter so readers can tell the value moved on.

pub mod detect;
pub mod propagate;

pub use detect::CmakeDetector;
pub use propagate::{extend_dependencies, extend_paths, record_coverage};

use crate::package::PackageName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Compiler aliases requested by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    pub cc: Option<String>,
    pub cxx: Option<String>,
    pub fc: Option<String>,
}

/// Typed environment bag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildEnvironment {
    revision: u64,
    toolchain: Toolchain,
    cmake_version: Option<String>,
    openssl_root_dir: Option<String>,
    openssl_include_dir: Option<String>,
    path: Option<String>,
    bin_path: Option<String>,
    include_path: Option<String>,
    install_path: Option<String>,
    lib_path: Option<String>,
    coverage_file: Option<String>,
    coverage_dir: Option<String>,
    /// `<name>_DIR`, `<NAME>_DIR` and `<NAME>_PATH` entries
    package_vars: BTreeMap<String, String>,
    /// Resolved commit of every package obtained so far
    dependencies: Option<BTreeMap<PackageName, String>>,
}

impl BuildEnvironment {
    /// Fresh environment for the given compilers
    pub fn new(toolchain: Toolchain) -> Self {
        Self {
            toolchain,
            ..Self::default()
        }
    }

    pub fn with_cmake_version(mut self, version: impl Into<String>) -> Self {
        self.cmake_version = Some(version.into());
        self
    }

    /// Point the OpenSSL variables at a prefix (Homebrew on macOS)
    pub fn with_openssl_dir(mut self, prefix: &str) -> Self {
        self.openssl_root_dir = Some(prefix.to_string());
        self.openssl_include_dir = Some(format!("{}/include", prefix));
        self
    }

    /// Seed the PATH variable instead of inheriting the process PATH
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub(crate) fn bump(&mut self) {
        self.revision += 1;
    }

    /// Number of mutations applied since setup
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    pub fn cmake_version(&self) -> Option<&str> {
        self.cmake_version.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn bin_path(&self) -> Option<&str> {
        self.bin_path.as_deref()
    }

    pub fn include_path(&self) -> Option<&str> {
        self.include_path.as_deref()
    }

    pub fn install_path(&self) -> Option<&str> {
        self.install_path.as_deref()
    }

    pub fn lib_path(&self) -> Option<&str> {
        self.lib_path.as_deref()
    }

    pub fn coverage_file(&self) -> Option<&str> {
        self.coverage_file.as_deref()
    }

    pub fn coverage_dir(&self) -> Option<&str> {
        self.coverage_dir.as_deref()
    }

    pub fn package_var(&self, name: &str) -> Option<&str> {
        self.package_vars.get(name).map(String::as_str)
    }

    /// Recorded dependency commits, sorted by package name
    pub fn dependencies(&self) -> impl Iterator<Item = (&PackageName, &str)> {
        self.dependencies
            .iter()
            .flat_map(|deps| deps.iter().map(|(name, sha)| (name, sha.as_str())))
    }

    pub fn dependency_sha(&self, name: &str) -> Option<&str> {
        self.dependencies
            .as_ref()
            .and_then(|deps| deps.get(name))
            .map(String::as_str)
    }

    /// Flatten into the variables handed to the build tool
    pub fn vars(&self) -> BTreeMap<String, String> {
        let fixed = [
            ("CC", &self.toolchain.cc),
            ("CXX", &self.toolchain.cxx),
            ("FC", &self.toolchain.fc),
            ("CMAKE_VERSION", &self.cmake_version),
            ("OPENSSL_ROOT_DIR", &self.openssl_root_dir),
            ("OPENSSL_INCLUDE_DIR", &self.openssl_include_dir),
            ("PATH", &self.path),
            ("BIN_PATH", &self.bin_path),
            ("INCLUDE_PATH", &self.include_path),
            ("INSTALL_PATH", &self.install_path),
            ("LIB_PATH", &self.lib_path),
            ("COVERAGE_FILE", &self.coverage_file),
            ("COVERAGE_DIR", &self.coverage_dir),
        ];

        let mut vars: BTreeMap<String, String> = fixed
            .into_iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
            .collect();
        vars.extend(self.package_vars.clone());
        vars
    }
}
