//! The only mutation path for a running [`BuildEnvironment`]
//!
//! Path variables are colon-joined with the newest entry first. Extending is
//! not de-duplicated: applying the same install directory twice leaves two
//! copies, and lookups see the most recent one first.

use super::BuildEnvironment;
use crate::package::PackageName;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

fn prepend(front: &str, existing: Option<&str>) -> String {
    match existing {
        Some(rest) if !rest.is_empty() => format!("{}:{}", front, rest),
        _ => front.to_string(),
    }
}

/// Make an installed package visible to later builds
///
/// Does nothing when `env` is `None`, which means environment setup failed
/// earlier and was already reported.
pub fn extend_paths(env: Option<&mut BuildEnvironment>, install_dir: &Path, package: &PackageName) {
    let Some(env) = env else {
        debug!("No environment, skipping path extension for {}", package);
        return;
    };

    let dir = install_dir.display().to_string();
    let bin = format!("{}/bin", dir);

    let inherited = env.path.clone().or_else(|| std::env::var("PATH").ok());
    env.path = Some(prepend(&bin, inherited.as_deref()));
    info!("Extended local PATH variable to include {}", bin);

    env.bin_path = Some(prepend(&bin, env.bin_path.as_deref()));
    env.include_path = Some(prepend(
        &format!("{}/include", dir),
        env.include_path.as_deref(),
    ));
    env.install_path = Some(prepend(&dir, env.install_path.as_deref()));
    env.lib_path = Some(prepend(
        &format!("{}/lib:{}/lib64", dir, dir),
        env.lib_path.as_deref(),
    ));

    env.package_vars
        .insert(format!("{}_DIR", package), dir.clone());
    env.package_vars
        .insert(format!("{}_DIR", package.upper()), dir.clone());
    env.package_vars
        .insert(format!("{}_PATH", package.upper()), dir);

    env.bump();
}

/// Record the commit a package was obtained at; the last write wins
pub fn extend_dependencies(env: Option<&mut BuildEnvironment>, package: &PackageName, sha: &str) {
    let Some(env) = env else {
        debug!("No environment, skipping dependency record for {}", package);
        return;
    };

    env.dependencies
        .get_or_insert_with(BTreeMap::new)
        .insert(package.clone(), sha.to_string());
    info!("Extended list of dependencies to include {}: {}", package, sha);

    env.bump();
}

/// Remember where the coverage report of the package under test landed
pub fn record_coverage(env: &mut BuildEnvironment, file: &Path, dir: &Path) {
    env.coverage_file = Some(file.display().to_string());
    env.coverage_dir = Some(dir.display().to_string());
    env.bump();
}
