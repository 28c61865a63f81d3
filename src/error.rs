//! Error types for buildchain
//!
//! All modules use `BuildchainResult<T>` as their return type.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for buildchain operations
pub type BuildchainResult<T> = Result<T, BuildchainError>;

/// Which package a build failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildScope {
    /// A dependency of the package under test
    Dependency,
    /// The package the run was started for
    Package,
}

impl fmt::Display for BuildScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dependency => write!(f, "dependency"),
            Self::Package => write!(f, "package"),
        }
    }
}

/// Coarse classification of errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    EnvironmentSetup,
    Resolution,
    Restore,
    Save,
    Build,
    Download,
    Publish,
    Unknown,
    Other,
}

/// All errors that can occur in buildchain
#[derive(Error, Debug)]
pub enum BuildchainError {
    // Input format errors
    #[error("Unexpected dependency name, must be in '[packageName:]owner/repo[@branch]' format: {0}")]
    DependencyFormat(String),

    #[error("Unexpected CMake option, must be in 'packageName: option' format: {0}")]
    OptionFormat(String),

    #[error("Invalid package name '{name}': {reason}")]
    InvalidPackageName { name: String, reason: String },

    #[error("Invalid dependency tree {path}: {reason}")]
    TreeInvalid { path: PathBuf, reason: String },

    // Environment errors
    #[error("Error setting up build environment")]
    EnvironmentSetup,

    // Ref resolution errors
    #[error("Error getting repository HEAD for {repository}: {reason}")]
    Resolution { repository: String, reason: String },

    // Cache errors
    #[error("Error restoring cache for {package}: {reason}")]
    CacheRestore { package: String, reason: String },

    #[error("Error saving cache for {package}: {reason}")]
    CacheSave { package: String, reason: String },

    #[error("Invalid cache key or artifact name: {0}")]
    StoreKeyInvalid(String),

    // Build errors
    #[error("Error downloading repository {0}")]
    Download(String),

    #[error("Error building {scope} {package}")]
    Build { scope: BuildScope, package: String },

    #[error("Error publishing artifact {name}: {reason}")]
    Publish { name: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),

    /// A failure that carried no message at all
    #[error("")]
    Unknown,
}

impl BuildchainError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Convert a failed blocking task into an error, keeping the panic text if any
    pub fn from_join(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            return Self::Internal("blocking task cancelled".to_string());
        }
        let payload = err.into_panic();
        if let Some(msg) = payload.downcast_ref::<&str>() {
            Self::Internal((*msg).to_string())
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            Self::Internal(msg.clone())
        } else {
            Self::Unknown
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DependencyFormat(_)
            | Self::OptionFormat(_)
            | Self::InvalidPackageName { .. }
            | Self::TreeInvalid { .. } => ErrorKind::Format,
            Self::EnvironmentSetup => ErrorKind::EnvironmentSetup,
            Self::Resolution { .. } => ErrorKind::Resolution,
            Self::CacheRestore { .. } => ErrorKind::Restore,
            Self::CacheSave { .. } => ErrorKind::Save,
            Self::Download(_) => ErrorKind::Download,
            Self::Build { .. } => ErrorKind::Build,
            Self::Publish { .. } => ErrorKind::Publish,
            Self::Unknown => ErrorKind::Unknown,
            _ => ErrorKind::Other,
        }
    }

    /// The human-readable message, if the error carries one
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Unknown => None,
            other => Some(other.to_string()),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::DependencyFormat(_) => Some("Example: eckit:ecmwf/eckit@develop"),
            Self::OptionFormat(_) => Some("Example: eckit: -DENABLE_TESTS=OFF"),
            Self::EnvironmentSetup => Some("Check that cmake is installed and on PATH"),
            Self::Resolution { .. } => {
                Some("Check the repository name, the ref and the GitHub token scopes")
            }
            _ => None,
        }
    }
}
