//! Package identities and the caller-supplied strings that describe them

pub mod git_ref;
pub mod name;
pub mod spec;

pub use git_ref::{is_commit_sha, RefSpec};
pub use name::PackageName;
pub use spec::{parse_dependency_options, strip_outer_quotes, DependencyOptions, DependencySpec};

/// A package and the repository it is built from
///
/// The package name and the repository name are kept apart because a package
/// may be published under a different name than its repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageIdentity {
    pub owner: String,
    pub repository: String,
    pub package: PackageName,
    /// Branch, tag (`refs/tags/...`) or commit hash
    pub git_ref: String,
}

impl PackageIdentity {
    /// Identity for a declared dependency, falling back to `default_branch`
    pub fn from_spec(spec: &DependencySpec, default_branch: &str) -> Self {
        Self {
            owner: spec.owner.clone(),
            repository: spec.repository.clone(),
            package: spec.package.clone(),
            git_ref: spec
                .branch
                .clone()
                .unwrap_or_else(|| default_branch.to_string()),
        }
    }

    /// `owner/repo`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repository)
    }

    pub fn ref_spec(&self) -> RefSpec {
        RefSpec::parse(&self.git_ref)
    }
}
