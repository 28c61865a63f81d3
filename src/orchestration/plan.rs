//! Validation of run inputs
//!
//! Every caller-supplied string is parsed here, before the orchestrator
//! touches the network, the stores or the build tool.

use crate::cache::Platform;
use crate::env::Toolchain;
use crate::error::{BuildchainError, BuildchainResult};
use crate::package::{
    parse_dependency_options, DependencyOptions, DependencySpec, PackageIdentity, PackageName,
};
use crate::tree::DependencyTree;
use std::path::PathBuf;
use tracing::debug;

/// Switches that change how packages are obtained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunFlags {
    /// Ignore published artifacts of dependencies
    pub force_build: bool,
    /// Skip cache restore so fresh builds overwrite stale entries
    pub recreate_cache: bool,
    /// Build the package itself after its dependencies
    pub self_build: bool,
    /// Run the package's tests
    pub self_test: bool,
    /// Collect coverage for the package
    pub self_coverage: bool,
}

/// Raw, unvalidated inputs of one run
#[derive(Debug, Clone, Default)]
pub struct RunInputs {
    /// `owner/repo` of the package under test
    pub repository: String,
    /// Commit, branch or tag of the package under test
    pub git_ref: String,
    /// Package name, if it differs from the repository name
    pub package_name: Option<String>,
    /// Checkout of the package under test
    pub workspace: PathBuf,
    pub install_dir: PathBuf,
    pub download_dir: PathBuf,
    /// `[packageName:]owner/repo[@branch]`, in build order
    pub dependencies: Vec<String>,
    pub dependency_branch: String,
    pub build_options: Option<String>,
    /// `packageName: options` lines
    pub dependency_options: Vec<String>,
    pub tree_path: Option<PathBuf>,
    pub flags: RunFlags,
    pub cache_suffix: Option<String>,
    pub os: String,
    pub compiler: String,
    pub toolchain: Toolchain,
    pub parallelism: u32,
}

/// Validated description of one run
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub root: PackageIdentity,
    pub workspace: PathBuf,
    pub install_dir: PathBuf,
    pub download_dir: PathBuf,
    /// Dependencies in the order given by the caller
    pub dependencies: Vec<PackageIdentity>,
    pub build_options: Option<String>,
    pub dependency_options: DependencyOptions,
    pub tree: DependencyTree,
    pub flags: RunFlags,
    pub cache_suffix: Option<String>,
    pub platform: Platform,
    pub toolchain: Toolchain,
    pub parallelism: u32,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl RunPlan {
    pub fn from_inputs(inputs: RunInputs) -> BuildchainResult<Self> {
        let specs = inputs
            .dependencies
            .iter()
            .map(String::as_str)
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(DependencySpec::parse)
            .collect::<BuildchainResult<Vec<_>>>()?;

        let option_lines: Vec<String> = inputs
            .dependency_options
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .collect();
        let dependency_options = parse_dependency_options(&option_lines, &specs)?;

        let root_spec = DependencySpec::parse(inputs.repository.trim())?;
        let package = match non_empty(inputs.package_name) {
            Some(name) => PackageName::new(name)?,
            None => root_spec.package.clone(),
        };
        if inputs.git_ref.trim().is_empty() {
            return Err(BuildchainError::User(format!(
                "No ref given for {}",
                root_spec.slug()
            )));
        }
        let root = PackageIdentity {
            owner: root_spec.owner,
            repository: root_spec.repository,
            package,
            git_ref: inputs.git_ref.trim().to_string(),
        };

        let tree = match &inputs.tree_path {
            Some(path) => DependencyTree::load(path)?,
            None => DependencyTree::new(),
        };

        let dependencies: Vec<PackageIdentity> = specs
            .iter()
            .map(|spec| PackageIdentity::from_spec(spec, &inputs.dependency_branch))
            .collect();

        debug!(
            root = %root.slug(),
            dependencies = dependencies.len(),
            tree_packages = tree.len(),
            "Validated run inputs"
        );

        Ok(Self {
            root,
            workspace: inputs.workspace,
            install_dir: inputs.install_dir,
            download_dir: inputs.download_dir,
            dependencies,
            build_options: non_empty(inputs.build_options),
            dependency_options,
            tree,
            flags: inputs.flags,
            cache_suffix: non_empty(inputs.cache_suffix),
            platform: Platform::new(inputs.os, inputs.compiler),
            toolchain: inputs.toolchain,
            parallelism: inputs.parallelism.max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn inputs() -> RunInputs {
        RunInputs {
            repository: "owner/repo".to_string(),
            git_ref: "a".repeat(40),
            workspace: PathBuf::from("/work/repo"),
            install_dir: PathBuf::from("/install"),
            download_dir: PathBuf::from("/download"),
            dependencies: vec![
                "owner/repo1".to_string(),
                "pkg2:owner/repo2@master".to_string(),
            ],
            dependency_branch: "develop".to_string(),
            os: "ubuntu-22.04".to_string(),
            compiler: "gnu-10".to_string(),
            parallelism: 2,
            ..RunInputs::default()
        }
    }

    #[test]
    fn builds_identities() {
        let plan = RunPlan::from_inputs(inputs()).unwrap();

        assert_eq!(plan.root.slug(), "owner/repo");
        assert_eq!(plan.root.package.as_str(), "repo");
        assert_eq!(plan.dependencies.len(), 2);
        assert_eq!(plan.dependencies[0].git_ref, "develop");
        assert_eq!(plan.dependencies[1].package.as_str(), "pkg2");
        assert_eq!(plan.dependencies[1].git_ref, "master");
        assert!(plan.tree.is_empty());
    }

    #[test]
    fn package_name_overrides_repository() {
        let mut raw = inputs();
        raw.package_name = Some("renamed".to_string());
        let plan = RunPlan::from_inputs(raw).unwrap();
        assert_eq!(plan.root.package.as_str(), "renamed");
        assert_eq!(plan.root.repository, "repo");
    }

    #[test]
    fn malformed_dependency_is_reported_verbatim() {
        let mut raw = inputs();
        raw.dependencies.push("owner-repo@branch".to_string());

        let err = RunPlan::from_inputs(raw).unwrap_err();
        assert!(matches!(err, BuildchainError::DependencyFormat(ref s) if s == "owner-repo@branch"));
    }

    #[test]
    fn malformed_option_line_is_reported_verbatim() {
        let mut raw = inputs();
        raw.dependency_options = vec!["repo1 -DX=1".to_string()];

        let err = RunPlan::from_inputs(raw).unwrap_err();
        assert!(matches!(err, BuildchainError::OptionFormat(ref s) if s == "repo1 -DX=1"));
    }

    #[test]
    fn option_lines_map_to_packages() {
        let mut raw = inputs();
        raw.dependency_options = vec![
            "owner/repo2: -DB=1".to_string(),
            "repo1: \"-DA=1 -DC=2\"".to_string(),
            String::new(),
        ];
        let plan = RunPlan::from_inputs(raw).unwrap();

        assert_eq!(plan.dependency_options.get("pkg2").map(String::as_str), Some("-DB=1"));
        assert_eq!(
            plan.dependency_options.get("repo1").map(String::as_str),
            Some("-DA=1 -DC=2")
        );
    }

    #[test]
    fn blank_values_are_absent() {
        let mut raw = inputs();
        raw.build_options = Some("  ".to_string());
        raw.cache_suffix = Some(String::new());
        raw.parallelism = 0;
        let plan = RunPlan::from_inputs(raw).unwrap();

        assert!(plan.build_options.is_none());
        assert!(plan.cache_suffix.is_none());
        assert_eq!(plan.parallelism, 1);
    }

    #[test]
    fn missing_ref_is_rejected() {
        let mut raw = inputs();
        raw.git_ref = String::new();
        assert!(matches!(
            RunPlan::from_inputs(raw),
            Err(BuildchainError::User(_))
        ));
    }

    #[test]
    fn loads_tree_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"repo": ["repo1"], "repo1": []}}"#).unwrap();

        let mut raw = inputs();
        raw.tree_path = Some(file.path().to_path_buf());
        let plan = RunPlan::from_inputs(raw).unwrap();
        assert_eq!(plan.tree.len(), 2);
    }
}
