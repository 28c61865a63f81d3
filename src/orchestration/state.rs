//! Per-package build decision states
//!
//! ```text
//! Init ─► ArtifactCheck ──hit──────────────────────────────► Done(ArtifactReused)
//!              │ miss / skipped / soft failure
//!              ├──(recreate cache)──────────┐
//!              ▼                            ▼
//!         CacheCheck ──hit──► Done(CacheRestored)
//!              │ miss / soft failure        │
//!              ▼                            ▼
//!         SourceBuild ──fatal──► Failed
//!              │
//!              ▼
//!         CacheSave ─(any)─► ArtifactPublish ─(any)─► Done(Built)
//! ```
//!
//! Whether a failure inside a state aborts the run is declared by
//! [`PackageState::failure_mode`], not decided at the call site.

use serde::Serialize;
use std::fmt;

/// How a package's output was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Acquisition {
    ArtifactReused,
    CacheRestored,
    Built,
}

impl fmt::Display for Acquisition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Acquisition::ArtifactReused => write!(f, "artifact"),
            Acquisition::CacheRestored => write!(f, "cache"),
            Acquisition::Built => write!(f, "built"),
        }
    }
}

/// What a failure inside a state does to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Abort the whole run
    Fatal,
    /// Log and continue as if the step missed
    Soft,
}

/// Result of executing the work of one state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Found something reusable
    Hit,
    /// Nothing found, or the step was skipped
    Miss,
    /// The step ran to completion
    Completed,
    /// The step failed; only meaningful for soft states
    Failed,
}

/// Which shortcuts a package may take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReusePolicy {
    pub artifacts: bool,
    pub cache: bool,
}

impl ReusePolicy {
    pub const ALL: Self = Self {
        artifacts: true,
        cache: true,
    };

    pub const NONE: Self = Self {
        artifacts: false,
        cache: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "acquisition")]
pub enum PackageState {
    Init,
    ArtifactCheck,
    CacheCheck,
    SourceBuild,
    CacheSave,
    ArtifactPublish,
    Done(Acquisition),
    Failed,
}

impl PackageState {
    pub fn failure_mode(self) -> FailureMode {
        match self {
            PackageState::ArtifactCheck
            | PackageState::CacheCheck
            | PackageState::CacheSave
            | PackageState::ArtifactPublish => FailureMode::Soft,
            PackageState::Init
            | PackageState::SourceBuild
            | PackageState::Done(_)
            | PackageState::Failed => FailureMode::Fatal,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PackageState::Done(_) | PackageState::Failed)
    }

    /// The state reached from `self` given the outcome of its work
    pub fn next(self, outcome: StepOutcome, policy: ReusePolicy) -> PackageState {
        use PackageState::*;

        if outcome == StepOutcome::Failed && self.failure_mode() == FailureMode::Fatal {
            return Failed;
        }

        match (self, outcome) {
            (Init, _) => ArtifactCheck,

            (ArtifactCheck, StepOutcome::Hit) => Done(Acquisition::ArtifactReused),
            (ArtifactCheck, _) if policy.cache => CacheCheck,
            (ArtifactCheck, _) => SourceBuild,

            (CacheCheck, StepOutcome::Hit) => Done(Acquisition::CacheRestored),
            (CacheCheck, _) => SourceBuild,

            (SourceBuild, _) => CacheSave,
            (CacheSave, _) => ArtifactPublish,
            (ArtifactPublish, _) => Done(Acquisition::Built),

            (terminal, _) => terminal,
        }
    }
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageState::Init => write!(f, "init"),
            PackageState::ArtifactCheck => write!(f, "artifact-check"),
            PackageState::CacheCheck => write!(f, "cache-check"),
            PackageState::SourceBuild => write!(f, "source-build"),
            PackageState::CacheSave => write!(f, "cache-save"),
            PackageState::ArtifactPublish => write!(f, "artifact-publish"),
            PackageState::Done(how) => write!(f, "done ({})", how),
            PackageState::Failed => write!(f, "failed"),
        }
    }
}
