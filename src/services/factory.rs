//! Default collaborator wiring

use super::{
    CmakeBuilder, GitSourceFetcher, GithubRefResolver, LocalArtifactStore, LocalCacheStore,
    Services, WalkdirSizer,
};
use crate::config::Config;
use crate::env::CmakeDetector;

/// Create the collaborators for a real run
///
/// `token` overrides the token read from `github.token_env`.
pub fn create_services(config: &Config, token: Option<String>) -> Services {
    let token = token.or_else(|| config.github.token());

    Services {
        resolver: Box::new(GithubRefResolver::new(
            config.github.api_url.clone(),
            token.clone(),
        )),
        cache: Box::new(LocalCacheStore::new(config.paths.cache_dir.clone())),
        artifacts: Box::new(LocalArtifactStore::new(config.paths.artifact_dir.clone())),
        sources: Box::new(GitSourceFetcher::new(config.github.git_url.clone(), token)),
        builder: Box::new(CmakeBuilder::new(config.build.tool)),
        sizer: Box::new(WalkdirSizer),
        detector: Box::new(CmakeDetector::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn stores_use_configured_directories() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.cache_dir = temp.path().join("cache");
        config.paths.artifact_dir = temp.path().join("artifacts");

        let services = create_services(&config, Some("token".to_string()));

        let install = temp.path().join("install");
        std::fs::create_dir_all(&install).unwrap();
        std::fs::write(install.join("file"), "x").unwrap();

        assert!(services.cache.save(&[install.clone()], "key").await.unwrap());
        assert!(temp.path().join("cache/key").is_dir());

        assert!(services.artifacts.publish("name", &install).await.unwrap());
        assert!(temp.path().join("artifacts/name/file").is_file());

        assert_eq!(services.sizer.measure(&install).await, Some(1));
        assert_eq!(services.sizer.measure(&PathBuf::from("/nonexistent/x")).await, None);
    }
}
