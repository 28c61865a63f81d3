//! CLI command implementations

pub mod completions;
pub mod config;
pub mod deps;
pub mod key;
pub mod run;

pub use completions::execute as completions;
pub use config::execute as config;
pub use deps::execute as deps;
pub use key::execute as key;
pub use run::execute as run;
