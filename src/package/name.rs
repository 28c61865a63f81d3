//! Validated package names

use crate::error::{BuildchainError, BuildchainResult};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// A package name that is safe to use in paths and variable names
///
/// Non-empty, no path separators, no `..`, no NUL and no whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageName(String);

impl PackageName {
    /// Validate and wrap a package name
    pub fn new(name: impl Into<String>) -> BuildchainResult<Self> {
        let name = name.into();
        let invalid = |reason: &str| BuildchainError::InvalidPackageName {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(invalid("must not contain path separators or '..'"));
        }
        if name.contains('\0') || name.chars().any(char::is_whitespace) {
            return Err(invalid("must not contain whitespace or NUL"));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name used for the `<NAME>_DIR` / `<NAME>_PATH` variables
    pub fn upper(&self) -> String {
        self.0.to_uppercase()
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PackageName {
    type Error = BuildchainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PackageName> for String {
    fn from(name: PackageName) -> Self {
        name.0
    }
}
