//! Config command - show or initialize configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager, LOCAL_CONFIG_FILE};
use crate::error::{BuildchainError, BuildchainResult};
use crate::ui::{self, UiContext};
use std::path::{Path, PathBuf};

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> BuildchainResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => println!("{}", toml::to_string_pretty(config)?),
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force, local }) => init(manager, force, local).await?,
    }
    Ok(())
}

/// Write a default config file, without reading the current one first
pub async fn init(manager: &ConfigManager, force: bool, local: bool) -> BuildchainResult<()> {
    let target = if local {
        let cwd = std::env::current_dir()
            .map_err(|e| BuildchainError::io("getting current directory", e))?;
        init_target(&cwd)
    } else {
        manager.path().to_path_buf()
    };
    init_config(&UiContext::detect(), &target, force).await?;
    Ok(())
}

fn init_target(dir: &Path) -> PathBuf {
    dir.join(LOCAL_CONFIG_FILE)
}

/// Write the default configuration to `path`; returns whether a file was written
async fn init_config(ctx: &UiContext, path: &Path, force: bool) -> BuildchainResult<bool> {
    if path.exists() && !force {
        ui::step_warn_hint(
            ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(false);
    }

    ConfigManager::with_path(path.to_path_buf())
        .save(&Config::default())
        .await?;

    ui::step_ok_detail(ctx, "Configuration initialized", &path.display().to_string());
    Ok(true)
}
