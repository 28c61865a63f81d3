//! Install directory size measurement

use super::DirectorySizer;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Sums the sizes of all regular files below a path
pub struct WalkdirSizer;

impl WalkdirSizer {
    fn measure_blocking(path: &Path) -> Option<u64> {
        if !path.exists() {
            return None;
        }

        let mut total = 0u64;
        for entry in WalkDir::new(path).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Could not measure {}: {}", path.display(), e);
                    return None;
                }
            };
            if entry.file_type().is_file() {
                total += entry.metadata().ok()?.len();
            }
        }
        Some(total)
    }
}

#[async_trait]
impl DirectorySizer for WalkdirSizer {
    async fn measure(&self, path: &Path) -> Option<u64> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::measure_blocking(&path))
            .await
            .ok()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn sums_nested_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("lib")).unwrap();
        fs::write(tmp.path().join("a"), [0u8; 10]).unwrap();
        fs::write(tmp.path().join("lib/b"), [0u8; 32]).unwrap();

        assert_eq!(WalkdirSizer.measure(tmp.path()).await, Some(42));
    }

    #[tokio::test]
    async fn empty_directory_is_zero() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(WalkdirSizer.measure(tmp.path()).await, Some(0));
    }

    #[tokio::test]
    async fn missing_path_is_unknown() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(WalkdirSizer.measure(&tmp.path().join("missing")).await, None);
    }
}
