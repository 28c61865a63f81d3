//! Buildchain - dependency-aware CI package builder
//!
//! CLI entry point that dispatches to subcommands.

use buildchain::cli::args::{ConfigAction, ConfigArgs, LogFormat};
use buildchain::cli::{Cli, Commands};
use buildchain::config::ConfigManager;
use buildchain::error::BuildchainResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.message() {
                Some(message) => eprintln!("{} {}", style("Error:").red().bold(), message),
                None => eprintln!("{}", style("Error:").red().bold()),
            }
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> BuildchainResult<()> {
    let cli = Cli::parse();

    // Completions need neither logging nor config
    if let Commands::Completions { shell } = cli.command {
        buildchain::cli::commands::completions(shell);
        return Ok(());
    }

    let manager = ConfigManager::resolve(cli.config.clone());

    // Init must work even when the existing file does not parse
    if let Commands::Config(ConfigArgs {
        action: Some(ConfigAction::Init { force, local }),
    }) = cli.command
    {
        init_logging(cli.verbose, cli.log_format == Some(LogFormat::Json));
        return buildchain::cli::commands::config::init(&manager, force, local).await;
    }

    let config = manager.load().await?;

    let json = match cli.log_format {
        Some(format) => format == LogFormat::Json,
        None => config.general.log_format == "json",
    };
    init_logging(cli.verbose, json);
    debug!("Using config {}", manager.path().display());

    match cli.command {
        Commands::Completions { .. } => unreachable!("Completions handled above"),
        Commands::Run(args) => buildchain::cli::commands::run(args, &config).await,
        Commands::Key(args) => buildchain::cli::commands::key(args, &config).await,
        Commands::Deps(args) => buildchain::cli::commands::deps(args).await,
        Commands::Config(args) => buildchain::cli::commands::config(args, &config, &manager).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `RUST_LOG` wins when set
fn init_logging(verbose: u8, json: bool) {
    let default = match verbose {
        0 => "buildchain=warn",
        1 => "buildchain=info",
        _ => "buildchain=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.with_target(false).without_time().init();
    }
}
