//! Run command - build dependencies and the package

use crate::cli::args::{KeyOptions, OutputFormat, RunArgs};
use crate::config::Config;
use crate::env::Toolchain;
use crate::error::{BuildchainError, BuildchainResult};
use crate::journal::RunJournal;
use crate::orchestration::{Orchestrator, RunFlags, RunInputs, RunOutputs, RunPlan, RunReport};
use crate::services::create_services;
use crate::ui::{self, PackageProgress, UiContext};
use std::path::Path;
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Execute the run command
pub async fn execute(args: RunArgs, config: &Config) -> BuildchainResult<()> {
    let ctx = UiContext::detect();
    let config = effective_config(&args, config);

    // Validation happens before anything touches the network or the disk
    let plan = RunPlan::from_inputs(build_inputs(&args, &config))?;
    debug!("Run plan: {:?}", plan);

    let services = create_services(&config, args.token.clone());
    let journal = RunJournal::new(&config);
    info!("Run id: {}", journal.run_id());

    let progress = Arc::new(PackageProgress::new(&ctx));
    let observer = Arc::clone(&progress);
    let orchestrator = Orchestrator::new(services, plan, journal)
        .with_observer(Box::new(move |package, state| {
            observer.on_state(package.as_str(), state)
        }));

    let result = orchestrator.run().await;
    progress.finish();
    let report = result?;

    print_report(&ctx, &report, args.format)?;

    if let Some(path) = &args.output_file {
        write_outputs(path, &report.outputs).await?;
    }

    Ok(())
}

/// Config with the command-line overrides that the services read
fn effective_config(args: &RunArgs, config: &Config) -> Config {
    let mut config = config.clone();
    if let Some(tool) = args.tool {
        config.build.tool = tool;
    }
    config
}

/// Merge flags over config values
pub(crate) fn build_inputs(args: &RunArgs, config: &Config) -> RunInputs {
    let KeyOptions {
        os,
        compiler,
        build_options,
        dependency_options,
        tree,
        cache_suffix,
    } = args.key.clone();

    RunInputs {
        repository: args.repository.clone(),
        git_ref: args.git_ref.clone(),
        package_name: args.package_name.clone(),
        workspace: args.workspace.clone(),
        install_dir: args
            .install_dir
            .clone()
            .unwrap_or_else(|| config.paths.install_dir.clone()),
        download_dir: args
            .download_dir
            .clone()
            .unwrap_or_else(|| config.paths.download_dir.clone()),
        dependencies: args.dependencies.clone(),
        dependency_branch: args
            .dependency_branch
            .clone()
            .unwrap_or_else(|| config.build.dependency_branch.clone()),
        build_options,
        dependency_options,
        tree_path: tree,
        flags: RunFlags {
            force_build: args.force_build,
            recreate_cache: args.recreate_cache,
            self_build: args.self_build,
            self_test: args.self_test,
            self_coverage: args.self_coverage,
        },
        cache_suffix: cache_suffix.or_else(|| config.cache.suffix.clone()),
        os: os.unwrap_or_else(|| config.platform.os.clone()),
        compiler: compiler.unwrap_or_else(|| config.platform.compiler.clone()),
        toolchain: Toolchain {
            cc: args.cc.clone(),
            cxx: args.cxx.clone(),
            fc: args.fc.clone(),
        },
        parallelism: args.parallelism.unwrap_or(config.build.parallelism),
    }
}

fn print_report(ctx: &UiContext, report: &RunReport, format: OutputFormat) -> BuildchainResult<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Plain => {
            if !report.packages.is_empty() {
                ui::section(ctx, "Packages");
                for package in &report.packages {
                    ui::step_ok_detail(
                        ctx,
                        package.package.as_str(),
                        &format!("{}, {}", package.acquisition, package.cache_key),
                    );
                }
            }
            for (name, value) in report.outputs.pairs() {
                ui::key_value(ctx, name, value);
            }
        }
    }
    Ok(())
}

/// `name=value` lines in the format CI output files expect
pub(crate) fn output_lines(outputs: &RunOutputs) -> String {
    outputs
        .pairs()
        .into_iter()
        .map(|(name, value)| format!("{}={}\n", name, value))
        .collect()
}

async fn write_outputs(path: &Path, outputs: &RunOutputs) -> BuildchainResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| BuildchainError::io(format!("opening {}", path.display()), e))?;

    file.write_all(output_lines(outputs).as_bytes())
        .await
        .map_err(|e| BuildchainError::io(format!("writing {}", path.display()), e))?;
    file.flush()
        .await
        .map_err(|e| BuildchainError::io(format!("writing {}", path.display()), e))?;

    debug!("Wrote outputs to {}", path.display());
    Ok(())
}
