//! Sequential build orchestration
//!
//! Dependencies are processed one at a time in the order given, then the
//! package itself. Each package computes its key against the environment as
//! left by the packages before it, so nothing here runs concurrently.

use super::plan::RunPlan;
use super::state::{Acquisition, FailureMode, PackageState, ReusePolicy, StepOutcome};
use crate::cache::{compute_key, CacheObject, KeyContext};
use crate::env::{extend_dependencies, extend_paths, record_coverage, BuildEnvironment};
use crate::error::{BuildScope, BuildchainError, BuildchainResult};
use crate::journal::RunJournal;
use crate::package::{PackageIdentity, PackageName};
use crate::services::{BuildRequest, CoverageReport, Services};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, info_span, warn, Instrument};

/// Values exported to later CI steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunOutputs {
    pub bin_path: String,
    pub include_path: String,
    pub install_path: String,
    pub lib_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_file: Option<String>,
}

impl RunOutputs {
    fn from_env(env: &BuildEnvironment) -> Self {
        Self {
            bin_path: env.bin_path().unwrap_or_default().to_string(),
            include_path: env.include_path().unwrap_or_default().to_string(),
            install_path: env.install_path().unwrap_or_default().to_string(),
            lib_path: env.lib_path().unwrap_or_default().to_string(),
            coverage_file: env.coverage_file().map(str::to_string),
        }
    }

    /// `name=value` pairs in output order
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![
            ("bin_path", self.bin_path.as_str()),
            ("include_path", self.include_path.as_str()),
            ("install_path", self.install_path.as_str()),
            ("lib_path", self.lib_path.as_str()),
        ];
        if let Some(file) = &self.coverage_file {
            pairs.push(("coverage_file", file.as_str()));
        }
        pairs
    }
}

/// How one package was obtained
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageReport {
    pub package: PackageName,
    pub acquisition: Acquisition,
    pub cache_key: String,
    pub head_sha: String,
}

/// Result of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outputs: RunOutputs,
    pub packages: Vec<PackageReport>,
}

/// Called on every package state change
pub type TransitionObserver = Box<dyn Fn(&PackageName, PackageState) + Send + Sync>;

/// One package to take through the state machine
struct Target<'a> {
    identity: &'a PackageIdentity,
    scope: BuildScope,
    source_dir: PathBuf,
    install_dir: PathBuf,
    options: Option<&'a str>,
    fetch_source: bool,
    run_tests: bool,
    coverage: bool,
    policy: ReusePolicy,
}

/// Drives every package of a [`RunPlan`] through the build decision states
pub struct Orchestrator {
    services: Services,
    plan: RunPlan,
    journal: RunJournal,
    observer: Option<TransitionObserver>,
}

impl Orchestrator {
    pub fn new(services: Services, plan: RunPlan, journal: RunJournal) -> Self {
        Self {
            services,
            plan,
            journal,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: TransitionObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Build everything, failing fast on the first fatal error
    pub async fn run(&self) -> BuildchainResult<RunReport> {
        self.journal
            .record(
                "run.started",
                &serde_json::json!({
                    "repository": self.plan.root.slug(),
                    "ref": self.plan.root.git_ref,
                    "dependencies": self.plan.dependencies.iter().map(|d| d.slug()).collect::<Vec<_>>(),
                }),
            )
            .await;

        let result = self.run_inner().await;

        match &result {
            Ok(report) => {
                self.journal
                    .record(
                        "run.finished",
                        &serde_json::json!({ "outputs": report.outputs, "packages": report.packages }),
                    )
                    .await
            }
            Err(e) => {
                self.journal
                    .record(
                        "run.failed",
                        &serde_json::json!({ "error": e.message() }),
                    )
                    .await
            }
        }

        result
    }

    async fn run_inner(&self) -> BuildchainResult<RunReport> {
        let plan = &self.plan;

        let mut env = self
            .services
            .detector
            .detect(&plan.platform.os, &plan.toolchain)
            .await?
            .ok_or(BuildchainError::EnvironmentSetup)?;

        let mut packages = Vec::new();

        let dependency_policy = ReusePolicy {
            artifacts: !plan.flags.force_build,
            cache: !plan.flags.recreate_cache,
        };

        for identity in &plan.dependencies {
            let target = Target {
                identity,
                scope: BuildScope::Dependency,
                source_dir: plan.download_dir.join(identity.package.as_str()),
                install_dir: plan.install_dir.join(identity.package.as_str()),
                options: plan
                    .dependency_options
                    .get(&identity.package)
                    .map(String::as_str),
                fetch_source: true,
                run_tests: false,
                coverage: false,
                policy: dependency_policy,
            };
            packages.push(self.process(&mut env, &target).await?);
        }

        if plan.flags.self_build {
            let root = &plan.root;
            let fresh = plan.flags.self_test || plan.flags.self_coverage;
            let target = Target {
                identity: root,
                scope: BuildScope::Package,
                source_dir: plan.workspace.clone(),
                install_dir: plan.install_dir.join(root.package.as_str()),
                options: plan.build_options.as_deref(),
                fetch_source: false,
                run_tests: plan.flags.self_test,
                coverage: plan.flags.self_coverage,
                policy: if fresh {
                    ReusePolicy::NONE
                } else {
                    dependency_policy
                },
            };
            packages.push(self.process(&mut env, &target).await?);
        } else {
            info!("Skipping build of {}", plan.root.package);
        }

        Ok(RunReport {
            outputs: RunOutputs::from_env(&env),
            packages,
        })
    }

    async fn transition(&self, package: &PackageName, from: PackageState, to: PackageState) {
        info!("{}: {} -> {}", package, from, to);
        if let Some(observer) = &self.observer {
            observer(package, to);
        }
        self.journal
            .record(
                "package.state",
                &serde_json::json!({ "package": package, "from": from, "to": to }),
            )
            .await;
    }

    /// Log a collaborator error according to the state's failure mode
    fn soft(&self, state: PackageState, err: BuildchainError) -> BuildchainResult<StepOutcome> {
        match state.failure_mode() {
            FailureMode::Soft => {
                warn!("{}: {}", state, err.message().unwrap_or_default());
                Ok(StepOutcome::Failed)
            }
            FailureMode::Fatal => Err(err),
        }
    }

    async fn process(
        &self,
        env: &mut BuildEnvironment,
        target: &Target<'_>,
    ) -> BuildchainResult<PackageReport> {
        let package = &target.identity.package;
        let span = info_span!("package", name = %package, scope = %target.scope);

        async move {
            let result = self.drive(env, target).await;
            if let Err(e) = &result {
                self.journal
                    .record(
                        "package.failed",
                        &serde_json::json!({ "package": package, "error": e.message() }),
                    )
                    .await;
                if let Some(observer) = &self.observer {
                    observer(package, PackageState::Failed);
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        env: &mut BuildEnvironment,
        target: &Target<'_>,
    ) -> BuildchainResult<PackageReport> {
        let plan = &self.plan;
        let identity = target.identity;
        let package = &identity.package;
        let services = &self.services;

        let CacheObject {
            cache_key,
            head_sha,
        } = {
            let ctx = KeyContext::new(env, &plan.tree, &plan.dependency_options)
                .with_cache_suffix(plan.cache_suffix.as_deref());
            compute_key(
                services.resolver.as_ref(),
                identity,
                &plan.platform,
                &ctx,
                target.options,
            )
            .await?
        };

        let install_paths = [target.install_dir.clone()];
        let mut coverage: Option<CoverageReport> = None;
        let mut state = PackageState::Init;

        while !state.is_terminal() {
            let outcome = match state {
                PackageState::Init => StepOutcome::Completed,

                PackageState::ArtifactCheck if !target.policy.artifacts => {
                    info!("Skipping artifact check for {}", package);
                    StepOutcome::Miss
                }
                PackageState::ArtifactCheck => {
                    match services.artifacts.fetch(&cache_key, &target.install_dir).await {
                        Ok(true) => StepOutcome::Hit,
                        Ok(false) => StepOutcome::Miss,
                        Err(e) => self.soft(state, e)?,
                    }
                }

                PackageState::CacheCheck => {
                    match services.cache.restore(&install_paths, &cache_key).await {
                        Ok(true) => StepOutcome::Hit,
                        Ok(false) => StepOutcome::Miss,
                        Err(e) => self.soft(state, e)?,
                    }
                }

                PackageState::SourceBuild => {
                    if target.fetch_source {
                        let fetched = match services
                            .sources
                            .fetch(identity, &head_sha, &target.source_dir)
                            .await
                        {
                            Ok(fetched) => fetched,
                            Err(e) => {
                                warn!("{}", e);
                                false
                            }
                        };
                        if !fetched {
                            return Err(BuildchainError::Download(identity.slug()));
                        }
                    }

                    let request = BuildRequest {
                        package,
                        source_dir: &target.source_dir,
                        install_dir: &target.install_dir,
                        options: target.options,
                        env: &*env,
                        parallelism: plan.parallelism,
                        run_tests: target.run_tests,
                        coverage: target.coverage,
                    };
                    let build_error = || BuildchainError::Build {
                        scope: target.scope,
                        package: package.to_string(),
                    };
                    let report = services.builder.build(&request).await.map_err(|e| {
                        warn!("{}", e);
                        build_error()
                    })?;
                    if !report.succeeded {
                        return Err(build_error());
                    }

                    if let Some(report) = report.coverage {
                        record_coverage(env, &report.file, &report.dir);
                        coverage = Some(report);
                    }
                    StepOutcome::Completed
                }

                PackageState::CacheSave => match services.sizer.measure(&target.install_dir).await {
                    None | Some(0) => {
                        warn!("Build output of {} is empty, not saving to cache", package);
                        StepOutcome::Miss
                    }
                    Some(size) => {
                        info!("Saving {} bytes to cache as {}", size, cache_key);
                        match services.cache.save(&install_paths, &cache_key).await {
                            Ok(true) => StepOutcome::Completed,
                            Ok(false) => {
                                warn!("Cache entry {} was not saved", cache_key);
                                StepOutcome::Miss
                            }
                            Err(e) => self.soft(state, e)?,
                        }
                    }
                },

                PackageState::ArtifactPublish => {
                    let mut outcome =
                        match services.artifacts.publish(&cache_key, &target.install_dir).await {
                            Ok(true) => StepOutcome::Completed,
                            Ok(false) => {
                                warn!("Artifact {} was not published", cache_key);
                                StepOutcome::Miss
                            }
                            Err(e) => self.soft(state, e)?,
                        };

                    if let (BuildScope::Package, Some(report)) = (target.scope, &coverage) {
                        let name = format!("coverage-{}", package);
                        match services.artifacts.publish(&name, &report.dir).await {
                            Ok(true) => info!("Published coverage report as {}", name),
                            Ok(false) => {
                                warn!("Coverage artifact {} was not published", name);
                                outcome = StepOutcome::Miss;
                            }
                            Err(e) => outcome = self.soft(state, e)?,
                        }
                    }
                    outcome
                }

                PackageState::Done(_) | PackageState::Failed => break,
            };

            let next = state.next(outcome, target.policy);
            self.transition(package, state, next).await;
            state = next;
        }

        let PackageState::Done(acquisition) = state else {
            return Err(BuildchainError::Build {
                scope: target.scope,
                package: package.to_string(),
            });
        };

        extend_paths(Some(env), &target.install_dir, package);
        extend_dependencies(Some(env), package, &head_sha);

        Ok(PackageReport {
            package: package.clone(),
            acquisition,
            cache_key,
            head_sha,
        })
    }
}
