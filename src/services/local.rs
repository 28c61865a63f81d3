//! Directory-backed cache and artifact stores
//!
//! Layout under each root:
//!
//! ```text
//! <cache root>/<key>/<index>/...      one numbered subtree per cached path
//! <artifact root>/<name>/...          the published directory as-is
//! ```
//!
//! Writes go to a hidden staging directory first and are renamed into place,
//! so a reader never sees a half-written entry. Cache entries are immutable
//! once written; artifacts are replaced on republish.

use super::{ArtifactStore, CacheStore};
use crate::error::{BuildchainError, BuildchainResult};
use async_trait::async_trait;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

fn validate_key(key: &str) -> BuildchainResult<()> {
    if key.is_empty()
        || key.starts_with('.')
        || key.contains('/')
        || key.contains('\\')
        || key.contains("..")
        || key.contains('\0')
    {
        return Err(BuildchainError::StoreKeyInvalid(key.to_string()));
    }
    Ok(())
}

fn staging_dir(root: &Path, key: &str) -> PathBuf {
    root.join(format!(".staging-{}-{}", key, uuid::Uuid::new_v4()))
}

/// Recursively copy `src` into `dest`, returning the number of files copied
///
/// Symlinks are recreated rather than followed.
pub(crate) fn copy_tree(src: &Path, dest: &Path) -> io::Result<u64> {
    let mut files = 0;

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let target = dest.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        #[cfg(unix)]
        {
            if file_type.is_symlink() {
                let link = fs::read_link(entry.path())?;
                if fs::symlink_metadata(&target).is_ok() {
                    fs::remove_file(&target)?;
                }
                std::os::unix::fs::symlink(link, &target)?;
                files += 1;
                continue;
            }
        }

        fs::copy(entry.path(), &target)?;
        files += 1;
    }

    Ok(files)
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Cache store rooted at a local directory
pub struct LocalCacheStore {
    root: PathBuf,
}

impl LocalCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn restore_blocking(root: &Path, paths: &[PathBuf], key: &str) -> io::Result<bool> {
        let entry = root.join(key);
        if !entry.is_dir() {
            return Ok(false);
        }

        for (index, path) in paths.iter().enumerate() {
            let stored = entry.join(index.to_string());
            if !stored.is_dir() {
                warn!("Cache entry {} has no data for {}", key, path.display());
                continue;
            }
            let copied = copy_tree(&stored, path)?;
            debug!("Restored {} files into {}", copied, path.display());
        }

        Ok(true)
    }

    fn save_blocking(root: &Path, paths: &[PathBuf], key: &str) -> io::Result<bool> {
        let entry = root.join(key);
        if entry.exists() {
            info!("Cache entry {} already exists, not overwriting", key);
            return Ok(false);
        }

        fs::create_dir_all(root)?;
        let staging = staging_dir(root, key);

        let result = (|| {
            for (index, path) in paths.iter().enumerate() {
                if !path.exists() {
                    return Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("{} does not exist", path.display()),
                    ));
                }
                copy_tree(path, &staging.join(index.to_string()))?;
            }
            fs::rename(&staging, &entry)
        })();

        match result {
            Ok(()) => Ok(true),
            Err(e) => {
                let _ = remove_if_present(&staging);
                // Lost a race with another writer for the same key
                if entry.is_dir() {
                    return Ok(false);
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl CacheStore for LocalCacheStore {
    async fn restore(&self, paths: &[PathBuf], key: &str) -> BuildchainResult<bool> {
        validate_key(key)?;
        let root = self.root.clone();
        let paths = paths.to_vec();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            Self::restore_blocking(&root, &paths, &key).map_err(|e| BuildchainError::CacheRestore {
                package: key.clone(),
                reason: e.to_string(),
            })
        })
        .await
        .map_err(BuildchainError::from_join)?
    }

    async fn save(&self, paths: &[PathBuf], key: &str) -> BuildchainResult<bool> {
        validate_key(key)?;
        let root = self.root.clone();
        let paths = paths.to_vec();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            Self::save_blocking(&root, &paths, &key).map_err(|e| BuildchainError::CacheSave {
                package: key.clone(),
                reason: e.to_string(),
            })
        })
        .await
        .map_err(BuildchainError::from_join)?
    }
}

/// Artifact store rooted at a local directory
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn fetch_blocking(root: &Path, name: &str, dest: &Path) -> io::Result<bool> {
        let stored = root.join(name);
        if !stored.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(dest)?;
        let copied = copy_tree(&stored, dest)?;
        debug!("Fetched {} files from artifact {}", copied, name);
        Ok(true)
    }

    fn publish_blocking(root: &Path, name: &str, path: &Path) -> io::Result<bool> {
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            ));
        }

        fs::create_dir_all(root)?;
        let staging = staging_dir(root, name);
        let target = root.join(name);

        let result = (|| {
            if path.is_dir() {
                copy_tree(path, &staging)?;
            } else {
                fs::create_dir_all(&staging)?;
                let file_name = path.file_name().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
                })?;
                fs::copy(path, staging.join(file_name))?;
            }
            remove_if_present(&target)?;
            fs::rename(&staging, &target)
        })();

        if let Err(e) = result {
            let _ = remove_if_present(&staging);
            return Err(e);
        }
        Ok(true)
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn fetch(&self, name: &str, dest: &Path) -> BuildchainResult<bool> {
        validate_key(name)?;
        let root = self.root.clone();
        let name = name.to_string();
        let dest = dest.to_path_buf();

        tokio::task::spawn_blocking(move || {
            Self::fetch_blocking(&root, &name, &dest)
                .map_err(|e| BuildchainError::io(format!("fetching artifact {}", name), e))
        })
        .await
        .map_err(BuildchainError::from_join)?
    }

    async fn publish(&self, name: &str, path: &Path) -> BuildchainResult<bool> {
        validate_key(name)?;
        let root = self.root.clone();
        let name = name.to_string();
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            Self::publish_blocking(&root, &name, &path).map_err(|e| BuildchainError::Publish {
                name: name.clone(),
                reason: e.to_string(),
            })
        })
        .await
        .map_err(BuildchainError::from_join)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn rejects_path_like_keys() {
        for key in ["", "a/b", "a\\b", "..", "a..b", ".hidden"] {
            assert!(
                matches!(validate_key(key), Err(BuildchainError::StoreKeyInvalid(_))),
                "{key:?} should be rejected"
            );
        }
        assert!(validate_key("ubuntu-22.04-gnu-12-eckit-abc123").is_ok());
    }

    #[tokio::test]
    async fn cache_save_then_restore() {
        let tmp = TempDir::new().unwrap();
        let store = LocalCacheStore::new(tmp.path().join("cache"));
        let install = tmp.path().join("install/eckit");
        write(&install.join("lib/libeckit.so"), "lib");
        write(&install.join("include/eckit/eckit.h"), "header");

        assert!(store.save(&[install.clone()], "key-1").await.unwrap());

        let restored = tmp.path().join("restored");
        assert!(store.restore(&[restored.clone()], "key-1").await.unwrap());
        assert_eq!(fs::read_to_string(restored.join("lib/libeckit.so")).unwrap(), "lib");
        assert_eq!(
            fs::read_to_string(restored.join("include/eckit/eckit.h")).unwrap(),
            "header"
        );
    }

    #[tokio::test]
    async fn cache_miss_restores_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = LocalCacheStore::new(tmp.path().join("cache"));
        let dest = tmp.path().join("dest");

        assert!(!store.restore(&[dest.clone()], "missing").await.unwrap());
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn cache_entries_are_immutable() {
        let tmp = TempDir::new().unwrap();
        let store = LocalCacheStore::new(tmp.path().join("cache"));
        let install = tmp.path().join("install");
        write(&install.join("file"), "first");
        assert!(store.save(&[install.clone()], "key").await.unwrap());

        write(&install.join("file"), "second");
        assert!(!store.save(&[install.clone()], "key").await.unwrap());

        let dest = tmp.path().join("dest");
        store.restore(&[dest.clone()], "key").await.unwrap();
        assert_eq!(fs::read_to_string(dest.join("file")).unwrap(), "first");
    }

    #[tokio::test]
    async fn saving_missing_path_fails_and_leaves_no_entry() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("cache");
        let store = LocalCacheStore::new(&root);

        let err = store
            .save(&[tmp.path().join("nope")], "key")
            .await
            .unwrap_err();
        assert!(matches!(err, BuildchainError::CacheSave { .. }));
        assert!(!root.join("key").exists());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn artifact_publish_then_fetch() {
        let tmp = TempDir::new().unwrap();
        let store = LocalArtifactStore::new(tmp.path().join("artifacts"));
        let install = tmp.path().join("install");
        write(&install.join("bin/tool"), "v1");

        assert!(store.publish("artifact", &install).await.unwrap());

        let dest = tmp.path().join("dest");
        assert!(store.fetch("artifact", &dest).await.unwrap());
        assert_eq!(fs::read_to_string(dest.join("bin/tool")).unwrap(), "v1");
    }

    #[tokio::test]
    async fn artifact_republish_replaces() {
        let tmp = TempDir::new().unwrap();
        let store = LocalArtifactStore::new(tmp.path().join("artifacts"));
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");
        write(&first.join("old"), "x");
        write(&second.join("new"), "y");

        store.publish("coverage-eckit", &first).await.unwrap();
        store.publish("coverage-eckit", &second).await.unwrap();

        let dest = tmp.path().join("dest");
        store.fetch("coverage-eckit", &dest).await.unwrap();
        assert!(dest.join("new").exists());
        assert!(!dest.join("old").exists());
    }

    #[tokio::test]
    async fn missing_artifact_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = LocalArtifactStore::new(tmp.path().join("artifacts"));
        assert!(!store.fetch("nothing", &tmp.path().join("dest")).await.unwrap());
    }

    #[tokio::test]
    async fn publishing_missing_path_is_a_publish_error() {
        let tmp = TempDir::new().unwrap();
        let store = LocalArtifactStore::new(tmp.path().join("artifacts"));
        let err = store
            .publish("artifact", &tmp.path().join("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, BuildchainError::Publish { .. }));
    }
}
