//! Build orchestration
//!
//! Turns validated run inputs into a sequence of per-package decisions:
//! reuse a published artifact, restore a cache entry, or build from source.
//! - [`plan`]: input validation, no side effects
//! - [`state`]: the decision states and their failure policy
//! - [`runner`]: drives the collaborators through the states

pub mod plan;
mod runner;
pub mod state;

pub use plan::{RunFlags, RunInputs, RunPlan};
pub use runner::{Orchestrator, PackageReport, RunOutputs, RunReport, TransitionObserver};
pub use state::{Acquisition, FailureMode, PackageState, ReusePolicy, StepOutcome};
