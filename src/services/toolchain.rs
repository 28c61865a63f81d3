//! CMake / ecbuild driven package builds

use super::process::Invocation;
use super::{BuildReport, BuildRequest, CoverageReport, PackageBuilder};
use crate::error::{BuildchainError, BuildchainResult};
use crate::options::parse_options;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

const COVERAGE_FLAGS: [&str; 4] = [
    "-DCMAKE_C_FLAGS=--coverage",
    "-DCMAKE_CXX_FLAGS=--coverage",
    "-DCMAKE_EXE_LINKER_FLAGS=--coverage",
    "-DCMAKE_SHARED_LINKER_FLAGS=--coverage",
];

/// Which front end configures the build tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTool {
    #[default]
    Cmake,
    Ecbuild,
}

impl fmt::Display for BuildTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildTool::Cmake => write!(f, "cmake"),
            BuildTool::Ecbuild => write!(f, "ecbuild"),
        }
    }
}

impl FromStr for BuildTool {
    type Err = BuildchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cmake" => Ok(BuildTool::Cmake),
            "ecbuild" => Ok(BuildTool::Ecbuild),
            other => Err(BuildchainError::User(format!(
                "Unknown build tool '{}', expected cmake or ecbuild",
                other
            ))),
        }
    }
}

/// One command of a package build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    pub program: &'static str,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl BuildStep {
    fn new(program: &'static str, args: Vec<String>, cwd: &Path) -> Self {
        Self {
            program,
            args,
            cwd: cwd.to_path_buf(),
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

/// Coverage report locations for a source tree
pub fn coverage_paths(source_dir: &Path) -> CoverageReport {
    let build = source_dir.join("build");
    CoverageReport {
        file: build.join("coverage.info"),
        dir: build.join("coverage"),
    }
}

/// Commands that configure, build, optionally test, and install one package
pub fn build_steps(tool: BuildTool, request: &BuildRequest<'_>) -> Vec<BuildStep> {
    let source = request.source_dir;
    let build = source.join("build");
    let jobs = request.parallelism.max(1).to_string();
    let options = parse_options(request.options.unwrap_or_default());

    let mut steps = Vec::new();

    let mut configure_args = Vec::new();
    match tool {
        BuildTool::Cmake => {
            configure_args.extend([
                "-S".to_string(),
                path_arg(source),
                "-B".to_string(),
                path_arg(&build),
                format!("-DCMAKE_INSTALL_PREFIX={}", path_arg(request.install_dir)),
                "-DCMAKE_BUILD_TYPE=Release".to_string(),
            ]);
        }
        BuildTool::Ecbuild => {
            configure_args.extend([
                format!("--prefix={}", path_arg(request.install_dir)),
                "-DCMAKE_BUILD_TYPE=Release".to_string(),
            ]);
        }
    }
    if request.coverage {
        configure_args.extend(COVERAGE_FLAGS.iter().map(|f| f.to_string()));
    }
    configure_args.extend(options);

    match tool {
        BuildTool::Cmake => steps.push(BuildStep::new("cmake", configure_args, source)),
        BuildTool::Ecbuild => {
            configure_args.push(path_arg(source));
            steps.push(BuildStep::new("ecbuild", configure_args, &build));
        }
    }

    steps.push(BuildStep::new(
        "cmake",
        vec![
            "--build".to_string(),
            path_arg(&build),
            "--parallel".to_string(),
            jobs.clone(),
        ],
        source,
    ));

    if request.run_tests || request.coverage {
        steps.push(BuildStep::new(
            "ctest",
            vec![
                "--test-dir".to_string(),
                path_arg(&build),
                "--output-on-failure".to_string(),
                "-j".to_string(),
                jobs,
            ],
            source,
        ));
    }

    if request.coverage {
        let report = coverage_paths(source);
        steps.push(BuildStep::new(
            "lcov",
            vec![
                "--capture".to_string(),
                "--directory".to_string(),
                path_arg(&build),
                "--output-file".to_string(),
                path_arg(&report.file),
            ],
            source,
        ));
        steps.push(BuildStep::new(
            "genhtml",
            vec![
                path_arg(&report.file),
                "--output-directory".to_string(),
                path_arg(&report.dir),
            ],
            source,
        ));
    }

    steps.push(BuildStep::new(
        "cmake",
        vec!["--install".to_string(), path_arg(&build)],
        source,
    ));

    steps
}

/// Runs [`build_steps`] with the environment's variables
pub struct CmakeBuilder {
    tool: BuildTool,
}

impl CmakeBuilder {
    pub fn new(tool: BuildTool) -> Self {
        Self { tool }
    }
}

impl Default for CmakeBuilder {
    fn default() -> Self {
        Self::new(BuildTool::default())
    }
}

#[async_trait]
impl PackageBuilder for CmakeBuilder {
    async fn build(&self, request: &BuildRequest<'_>) -> BuildchainResult<BuildReport> {
        info!(
            tool = %self.tool,
            parallelism = request.parallelism,
            "Building {}",
            request.package
        );

        let build_dir = request.source_dir.join("build");
        tokio::fs::create_dir_all(&build_dir)
            .await
            .map_err(|e| BuildchainError::io(format!("creating {}", build_dir.display()), e))?;

        let vars = request.env.vars();
        for step in build_steps(self.tool, request) {
            let result = Invocation::new(step.program, step.args)
                .current_dir(&step.cwd)
                .envs(vars.clone())
                .run()
                .await;

            if let Err(e) = result {
                warn!("Build of {} failed: {}", request.package, e);
                if let BuildchainError::CommandExecution { stderr, .. } = &e {
                    warn!("{}", stderr);
                }
                return Ok(BuildReport::failure());
            }
        }

        let coverage = request.coverage.then(|| coverage_paths(request.source_dir));
        Ok(BuildReport {
            succeeded: true,
            coverage,
        })
    }
}
