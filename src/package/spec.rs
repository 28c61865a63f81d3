//! Parsing of caller-supplied dependency and option strings

use crate::error::{BuildchainError, BuildchainResult};
use crate::package::name::PackageName;
use std::collections::BTreeMap;
use std::fmt;

/// Per-dependency raw build options, keyed by package name
pub type DependencyOptions = BTreeMap<PackageName, String>;

/// A dependency declared as `[packageName:]owner/repo[@branch]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub package: PackageName,
    pub owner: String,
    pub repository: String,
    pub branch: Option<String>,
}

impl DependencySpec {
    /// Parse a dependency declaration
    pub fn parse(raw: &str) -> BuildchainResult<Self> {
        let format_err = || BuildchainError::DependencyFormat(raw.to_string());
        let trimmed = raw.trim();

        let (package, rest) = match trimmed.split_once(':') {
            Some((package, rest)) => (Some(package.trim()), rest.trim()),
            None => (None, trimmed),
        };

        let (slug, branch) = match rest.split_once('@') {
            Some((slug, branch)) if !branch.is_empty() => (slug, Some(branch.to_string())),
            Some(_) => return Err(format_err()),
            None => (rest, None),
        };

        let (owner, repository) = slug.split_once('/').ok_or_else(format_err)?;
        if owner.is_empty() || repository.is_empty() || repository.contains('/') {
            return Err(format_err());
        }

        let package = match package {
            Some("") => return Err(format_err()),
            Some(name) => PackageName::new(name).map_err(|_| format_err())?,
            None => PackageName::new(repository).map_err(|_| format_err())?,
        };

        Ok(Self {
            package,
            owner: owner.to_string(),
            repository: repository.to_string(),
            branch,
        })
    }

    /// `owner/repo`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repository)
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.package, self.owner, self.repository)?;
        if let Some(ref branch) = self.branch {
            write!(f, "@{}", branch)?;
        }
        Ok(())
    }
}

/// Strip one leading and one trailing quote character, if present
pub fn strip_outer_quotes(value: &str) -> &str {
    let value = value
        .strip_prefix('"')
        .or_else(|| value.strip_prefix('\''))
        .unwrap_or(value);
    value
        .strip_suffix('"')
        .or_else(|| value.strip_suffix('\''))
        .unwrap_or(value)
}

/// Parse `name: options` lines into a lookup keyed by package name
///
/// A key written as `owner/repo` refers to the declared dependency with that
/// repository; if none matches, the repository segment is used as the name.
pub fn parse_dependency_options(
    lines: &[String],
    dependencies: &[DependencySpec],
) -> BuildchainResult<DependencyOptions> {
    let mut lookup = DependencyOptions::new();

    for line in lines {
        let format_err = || BuildchainError::OptionFormat(line.clone());

        let (key, options) = line.split_once(':').ok_or_else(format_err)?;
        let key = key.trim();
        let options = options.strip_prefix(' ').unwrap_or(options);
        if key.is_empty() || options.is_empty() {
            return Err(format_err());
        }

        let package = match key.split_once('/') {
            Some((owner, repository)) => dependencies
                .iter()
                .find(|d| d.owner == owner && d.repository == repository)
                .map(|d| d.package.clone())
                .map_or_else(|| PackageName::new(repository), Ok)
                .map_err(|_| format_err())?,
            None => PackageName::new(key).map_err(|_| format_err())?,
        };

        lookup.insert(package, strip_outer_quotes(options).to_string());
    }

    Ok(lookup)
}
