//! Per-package progress with CI fallback

use super::context::UiContext;
use crate::orchestration::{Acquisition, PackageState};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = ProgressBar::new_spinner();
            if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
                spinner.set_style(template.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
            }
            spinner.set_message(message.to_string());
            spinner.enable_steady_tick(Duration::from_millis(120));
            self.spinner = Some(spinner);
        } else {
            // Plain output for CI
            eprintln!("{} {}", style("...").dim(), message);
        }
    }

    /// Update the spinner message
    pub fn message(&mut self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
        // No output in plain mode for message updates
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
            eprintln!("{} {}", style("✓").green(), message);
        } else {
            eprintln!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
            eprintln!("{} {}", style("✗").red(), message);
        } else {
            eprintln!("{} {}", style("[FAIL]").red(), message);
        }
    }

    /// Clear the spinner without any message
    pub fn clear(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

/// Maps package state changes onto a [`TaskSpinner`]
pub struct PackageProgress {
    spinner: Mutex<TaskSpinner>,
}

impl PackageProgress {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: Mutex::new(TaskSpinner::new(ctx)),
        }
    }

    pub fn on_state(&self, package: &str, state: PackageState) {
        let Ok(mut spinner) = self.spinner.lock() else {
            return;
        };
        match state {
            PackageState::Init => {}
            PackageState::ArtifactCheck => spinner.start(&format!("{}: checking artifacts", package)),
            PackageState::Done(how) => spinner.stop(&format!("{} ({})", package, describe(how))),
            PackageState::Failed => spinner.stop_error(&format!("{} failed", package)),
            other => spinner.message(&format!("{}: {}", package, other)),
        }
    }

    /// Drop any spinner left running after an aborted run
    pub fn finish(&self) {
        if let Ok(mut spinner) = self.spinner.lock() {
            spinner.clear();
        }
    }
}

fn describe(how: Acquisition) -> &'static str {
    match how {
        Acquisition::ArtifactReused => "reused artifact",
        Acquisition::CacheRestored => "restored from cache",
        Acquisition::Built => "built",
    }
}
