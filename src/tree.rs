//! Static dependency tree and transitive closure
//!
//! The tree maps each known package to its direct dependencies. It is read
//! once per run and never modified.

use crate::error::{BuildchainError, BuildchainResult};
use crate::package::PackageName;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use tracing::debug;

/// Tree entry as written in a tree file: a bare list or a `{ deps = [...] }` table
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TreeEntry {
    List(Vec<PackageName>),
    Table {
        #[serde(default)]
        deps: Vec<PackageName>,
    },
}

impl From<TreeEntry> for Vec<PackageName> {
    fn from(entry: TreeEntry) -> Self {
        match entry {
            TreeEntry::List(deps) | TreeEntry::Table { deps } => deps,
        }
    }
}

/// Mapping from package name to its ordered direct dependencies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencyTree {
    packages: BTreeMap<PackageName, Vec<PackageName>>,
}

impl DependencyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, mostly for tests and programmatic trees
    pub fn with_package(mut self, name: PackageName, deps: Vec<PackageName>) -> Self {
        self.packages.insert(name, deps);
        self
    }

    /// Parse a tree from JSON
    pub fn from_json(content: &str) -> BuildchainResult<Self> {
        let raw: BTreeMap<PackageName, TreeEntry> = serde_json::from_str(content)?;
        Ok(Self::from_raw(raw))
    }

    /// Parse a tree from TOML
    pub fn from_toml(content: &str) -> BuildchainResult<Self> {
        let raw: BTreeMap<PackageName, TreeEntry> = toml::from_str(content)?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: BTreeMap<PackageName, TreeEntry>) -> Self {
        Self {
            packages: raw.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }

    /// Load a tree file; `.json` files are read as JSON, anything else as TOML
    pub fn load(path: &Path) -> BuildchainResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BuildchainError::io(format!("reading dependency tree {}", path.display()), e)
        })?;

        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let parsed = if is_json {
            Self::from_json(&content)
        } else {
            Self::from_toml(&content)
        };

        let tree = parsed.map_err(|e| BuildchainError::TreeInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("Loaded dependency tree with {} packages", tree.len());
        Ok(tree)
    }

    /// Whether `name` is a known package
    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Direct dependencies of `name`
    pub fn direct(&self, name: &str) -> Option<&[PackageName]> {
        self.packages.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// All packages reachable from `name`, excluding `name` itself
    ///
    /// Each package is expanded at most once, so cycles terminate.
    /// Unknown packages have no dependencies.
    pub fn flatten(&self, name: &str) -> BTreeSet<PackageName> {
        let mut reachable = BTreeSet::new();
        let mut expanded: HashSet<&str> = HashSet::new();
        let mut stack = vec![name];

        while let Some(current) = stack.pop() {
            if !expanded.insert(current) {
                continue;
            }
            for dep in self.direct(current).unwrap_or_default() {
                if dep.as_str() != name {
                    reachable.insert(dep.clone());
                }
                stack.push(dep.as_str());
            }
        }

        reachable
    }
}
