//! CLI argument definitions using clap derive

use crate::services::BuildTool;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Buildchain - dependency-aware CI package builder
///
/// Builds a package and its dependencies in order, reusing published
/// artifacts and cached builds keyed by everything that affects the output.
#[derive(Parser, Debug)]
#[command(name = "buildchain")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "BUILDCHAIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format (overrides general.log_format)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build dependencies and the package, reusing artifacts and caches
    Run(RunArgs),

    /// Compute the cache key of one package without building
    Key(KeyArgs),

    /// Print the transitive dependencies of a package
    Deps(DepsArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

/// Options shared by commands that compute cache keys
#[derive(Args, Debug, Clone, Default)]
pub struct KeyOptions {
    /// Runner image name (overrides platform.os)
    #[arg(long)]
    pub os: Option<String>,

    /// Compiler family (overrides platform.compiler)
    #[arg(long)]
    pub compiler: Option<String>,

    /// Build options of the package
    #[arg(long, allow_hyphen_values = true)]
    pub build_options: Option<String>,

    /// Build options of a dependency, as `package: options` (repeatable)
    #[arg(long = "dependency-options", value_name = "LINE", allow_hyphen_values = true)]
    pub dependency_options: Vec<String>,

    /// Dependency tree file (JSON or TOML)
    #[arg(long)]
    pub tree: Option<PathBuf>,

    /// Extra suffix folded into every key (overrides cache.suffix)
    #[arg(long)]
    pub cache_suffix: Option<String>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Package under test, `owner/repo`
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: String,

    /// Commit, branch or tag of the package under test
    #[arg(long = "ref", env = "GITHUB_SHA")]
    pub git_ref: String,

    /// Package name when it differs from the repository name
    #[arg(long)]
    pub package_name: Option<String>,

    /// Checkout of the package under test
    #[arg(long, env = "GITHUB_WORKSPACE", default_value = ".")]
    pub workspace: PathBuf,

    /// Dependency as `[packageName:]owner/repo[@branch]`, in build order (repeatable)
    #[arg(short, long = "dependency", value_name = "SPEC")]
    pub dependencies: Vec<String>,

    /// Branch for dependencies declared without one (overrides build.dependency_branch)
    #[arg(long)]
    pub dependency_branch: Option<String>,

    #[command(flatten)]
    pub key: KeyOptions,

    /// Build dependencies even if published artifacts exist
    #[arg(long)]
    pub force_build: bool,

    /// Skip cache restore so fresh builds replace stale entries
    #[arg(long)]
    pub recreate_cache: bool,

    /// Build the package itself after its dependencies
    #[arg(long)]
    pub self_build: bool,

    /// Run the package's tests
    #[arg(long)]
    pub self_test: bool,

    /// Collect code coverage for the package
    #[arg(long)]
    pub self_coverage: bool,

    /// C compiler
    #[arg(long)]
    pub cc: Option<String>,

    /// C++ compiler
    #[arg(long)]
    pub cxx: Option<String>,

    /// Fortran compiler
    #[arg(long)]
    pub fc: Option<String>,

    /// Configure with `cmake` or `ecbuild` (overrides build.tool)
    #[arg(long)]
    pub tool: Option<BuildTool>,

    /// Parallel build jobs (overrides build.parallelism)
    #[arg(short = 'j', long)]
    pub parallelism: Option<u32>,

    /// Install root (overrides paths.install_dir)
    #[arg(long)]
    pub install_dir: Option<PathBuf>,

    /// Checkout root for dependencies (overrides paths.download_dir)
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Access token for the hosting API and clones
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Append `name=value` output lines to this file
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output_file: Option<PathBuf>,

    /// How to print the outputs
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Package as `[packageName:]owner/repo`
    pub package: String,

    /// Commit, branch or tag; a 40-character commit needs no network access
    #[arg(long = "ref")]
    pub git_ref: String,

    /// Commit of an already obtained dependency, as `name=sha` (repeatable)
    #[arg(long = "dep", value_name = "NAME=SHA")]
    pub deps: Vec<String>,

    /// CMake version to fold into the key
    #[arg(long)]
    pub cmake_version: Option<String>,

    #[command(flatten)]
    pub key: KeyOptions,

    /// Also print the string that was hashed
    #[arg(long)]
    pub show_input: bool,

    /// Access token for the hosting API
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Args, Debug)]
pub struct DepsArgs {
    /// Package name
    pub package: String,

    /// Dependency tree file (JSON or TOML)
    #[arg(long)]
    pub tree: PathBuf,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,

        /// Write ./buildchain.toml instead of the user config
        #[arg(long)]
        local: bool,
    },
}
