//! Terminal output
//!
//! Spinners in interactive terminals, plain lines in CI.
//!
//! # Example
//!
//! ```rust,ignore
//! use buildchain::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("eckit: checking artifacts");
//! spinner.stop("eckit (built)");
//! ui::key_value(&ctx, "install_path", "/install/eckit");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{key_value, section, step_ok_detail, step_warn_hint};
pub use progress::{PackageProgress, TaskSpinner};
