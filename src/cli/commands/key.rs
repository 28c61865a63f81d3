//! Key command - compute a cache key without building

use crate::cache::{compute_key, hash_input, KeyContext, Platform};
use crate::cli::args::KeyArgs;
use crate::config::Config;
use crate::env::{extend_dependencies, BuildEnvironment};
use crate::error::{BuildchainError, BuildchainResult};
use crate::package::{
    parse_dependency_options, DependencyOptions, DependencySpec, PackageIdentity, PackageName,
};
use crate::services::{GithubRefResolver, RefResolver};
use crate::tree::DependencyTree;

/// Everything a key depends on, parsed from the command line
struct KeyInputs {
    identity: PackageIdentity,
    platform: Platform,
    env: BuildEnvironment,
    tree: DependencyTree,
    dependency_options: DependencyOptions,
    build_options: Option<String>,
    cache_suffix: Option<String>,
}

/// Execute the key command
pub async fn execute(args: KeyArgs, config: &Config) -> BuildchainResult<()> {
    let token = args.token.clone().or_else(|| config.github.token());
    let resolver = GithubRefResolver::new(config.github.api_url.clone(), token);
    let inputs = parse_inputs(&args, config)?;

    let (cache_key, input) = key_for(&resolver, &inputs).await?;

    println!("{}", cache_key);
    if args.show_input {
        println!("{}", input);
    }
    Ok(())
}

/// `name=sha`
fn parse_dep(raw: &str) -> BuildchainResult<(PackageName, String)> {
    let (name, sha) = raw
        .split_once('=')
        .filter(|(name, sha)| !name.trim().is_empty() && !sha.trim().is_empty())
        .ok_or_else(|| {
            BuildchainError::User(format!("Expected --dep in 'name=sha' format, got '{}'", raw))
        })?;
    Ok((PackageName::new(name.trim())?, sha.trim().to_string()))
}

fn parse_inputs(args: &KeyArgs, config: &Config) -> BuildchainResult<KeyInputs> {
    let spec = DependencySpec::parse(&args.package)?;
    let dependency_options = parse_dependency_options(&args.key.dependency_options, &[])?;

    let mut env = BuildEnvironment::default();
    if let Some(version) = &args.cmake_version {
        env = env.with_cmake_version(version.clone());
    }
    for raw in &args.deps {
        let (name, sha) = parse_dep(raw)?;
        extend_dependencies(Some(&mut env), &name, &sha);
    }

    let tree = match &args.key.tree {
        Some(path) => DependencyTree::load(path)?,
        None => DependencyTree::new(),
    };

    Ok(KeyInputs {
        identity: PackageIdentity {
            owner: spec.owner,
            repository: spec.repository,
            package: spec.package,
            git_ref: args.git_ref.trim().to_string(),
        },
        platform: Platform::new(
            args.key.os.clone().unwrap_or_else(|| config.platform.os.clone()),
            args.key
                .compiler
                .clone()
                .unwrap_or_else(|| config.platform.compiler.clone()),
        ),
        env,
        tree,
        dependency_options,
        build_options: args.key.build_options.clone(),
        cache_suffix: args
            .key
            .cache_suffix
            .clone()
            .or_else(|| config.cache.suffix.clone()),
    })
}

/// The key and the string it was hashed from
async fn key_for(
    resolver: &dyn RefResolver,
    inputs: &KeyInputs,
) -> BuildchainResult<(String, String)> {
    let ctx = KeyContext::new(&inputs.env, &inputs.tree, &inputs.dependency_options)
        .with_cache_suffix(inputs.cache_suffix.as_deref());
    let build_options = inputs.build_options.as_deref();

    let object = compute_key(resolver, &inputs.identity, &inputs.platform, &ctx, build_options)
        .await?;
    let input = hash_input(
        &ctx,
        &inputs.identity.package,
        build_options,
        Some(&object.head_sha),
    );

    Ok((object.cache_key, input))
}
