//! Buildchain - dependency-aware CI package builder
//!
//! Builds a package after its dependencies, reusing published artifacts and
//! cached builds whenever a deterministic key says nothing relevant changed.

pub mod cache;
pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod journal;
pub mod options;
pub mod orchestration;
pub mod package;
pub mod services;
pub mod tree;
pub mod ui;

pub use error::{BuildchainError, BuildchainResult};
