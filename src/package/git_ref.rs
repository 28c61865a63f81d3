//! Git reference classification
//!
//! A ref supplied by the caller is either a bare commit hash, which needs no
//! lookup, or a branch/tag name that has to be resolved through the hosting API.

use std::fmt;

const TAGS_PREFIX: &str = "refs/tags/";
const HEADS_PREFIX: &str = "refs/heads/";

/// Whether `value` is a full 40-character hex commit hash
pub fn is_commit_sha(value: &str) -> bool {
    value.len() == 40 && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// A classified git reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefSpec {
    /// Full commit hash, used verbatim
    Commit(String),
    /// Branch name with any `refs/heads/` prefix removed
    Branch(String),
    /// Tag name with the `refs/tags/` prefix removed
    Tag(String),
}

impl RefSpec {
    /// Classify a raw ref
    ///
    /// Tags must be supplied in their verbose `refs/tags/<name>` form,
    /// anything else that is not a commit hash is treated as a branch.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if is_commit_sha(raw) {
            Self::Commit(raw.to_string())
        } else if let Some(tag) = raw.strip_prefix(TAGS_PREFIX) {
            Self::Tag(tag.to_string())
        } else {
            Self::Branch(raw.strip_prefix(HEADS_PREFIX).unwrap_or(raw).to_string())
        }
    }

    /// The `heads/<name>` or `tags/<name>` form used by the refs API
    pub fn api_ref(&self) -> Option<String> {
        match self {
            Self::Commit(_) => None,
            Self::Branch(name) => Some(format!("heads/{}", name)),
            Self::Tag(name) => Some(format!("tags/{}", name)),
        }
    }
}

impl fmt::Display for RefSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit(sha) => write!(f, "{}", sha),
            Self::Branch(name) | Self::Tag(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn commit_hash_is_recognised() {
        assert_eq!(RefSpec::parse(SHA), RefSpec::Commit(SHA.to_string()));
        let upper = SHA.to_uppercase();
        assert_eq!(RefSpec::parse(&upper), RefSpec::Commit(upper.clone()));
        assert_eq!(RefSpec::parse(SHA).api_ref(), None);
    }

    #[test]
    fn short_hash_is_a_branch() {
        assert_eq!(
            RefSpec::parse("0123456"),
            RefSpec::Branch("0123456".to_string())
        );
    }

    #[test]
    fn tag_prefix_is_stripped() {
        let spec = RefSpec::parse("refs/tags/1.2.0");
        assert_eq!(spec, RefSpec::Tag("1.2.0".to_string()));
        assert_eq!(spec.api_ref().as_deref(), Some("tags/1.2.0"));
    }

    #[test]
    fn heads_prefix_is_stripped() {
        let spec = RefSpec::parse("refs/heads/feature/x");
        assert_eq!(spec, RefSpec::Branch("feature/x".to_string()));
        assert_eq!(spec.api_ref().as_deref(), Some("heads/feature/x"));
        assert_eq!(
            RefSpec::parse("develop").api_ref().as_deref(),
            Some("heads/develop")
        );
    }
}
