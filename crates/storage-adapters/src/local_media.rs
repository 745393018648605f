//! # local_media
//! Local filesystem implementation of `FileStore`.
//!
//! Stored names carry a short content hash (`hero-3fa9c1d2e07b.png`) so
//! uploads of the same name do not overwrite each other. Paths returned to
//! callers are relative to the root and use `/` separators.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use domains::error::Result;
use domains::ports::FileStore;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::StorageError;

pub struct LocalFileStore {
    /// Root directory for all stored files (e.g., "./data/media")
    root_path: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root_path: root.into() }
    }

    /// Resolves a relative path below the root, rejecting anything that
    /// could leave it.
    fn resolve(&self, relative: &str) -> std::result::Result<PathBuf, StorageError> {
        let path = Path::new(relative);
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if relative.is_empty() || escapes {
            return Err(StorageError::InvalidPath(relative.to_string()));
        }
        Ok(self.root_path.join(path))
    }

    /// Writes `bytes` under a hashed variant of `hint`, never replacing an
    /// existing file.
    async fn write_new(&self, hint: &str, bytes: &[u8]) -> std::result::Result<String, StorageError> {
        let hash = hex::encode(Sha256::digest(bytes));
        let (stem, ext) = match hint.rsplit_once('.') {
            Some((stem, ext)) if !ext.contains('/') => (stem, Some(ext)),
            _ => (hint, None),
        };

        let mut attempt = 0;
        loop {
            let suffix = match attempt {
                0 => hash[..12].to_string(),
                n => format!("{}-{n}", &hash[..12]),
            };
            let relative = match ext {
                Some(ext) => format!("{stem}-{suffix}.{ext}"),
                None => format!("{stem}-{suffix}"),
            };
            let target = self.resolve(&relative)?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await.map_err(|source| io_error(parent, source))?;
            }

            match fs::OpenOptions::new().write(true).create_new(true).open(&target).await {
                Ok(mut file) => {
                    file.write_all(bytes).await.map_err(|source| io_error(&target, source))?;
                    file.flush().await.map_err(|source| io_error(&target, source))?;
                    tracing::debug!(path = %relative, size = bytes.len(), "file stored");
                    return Ok(relative);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(source) => return Err(io_error(&target, source)),
            }
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, path_hint: &str, bytes: Vec<u8>) -> Result<String> {
        Ok(self.write_new(path_hint, &bytes).await?)
    }

    async fn copy(&self, src_path: &str, dst_path_hint: &str) -> Result<String> {
        let source = self.resolve(src_path)?;
        let bytes = fs::read(&source).await.map_err(|e| io_error(&source, e))?;
        Ok(self.write_new(dst_path_hint, &bytes).await?)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&target, e).into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let target = self.resolve(path)?;
        Ok(fs::try_exists(&target).await.map_err(|e| io_error(&target, e))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::error::DomainError;

    #[tokio::test]
    async fn store_copy_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        let first = store.store("sites/1/bg/hero.png", b"png".to_vec()).await.unwrap();
        assert!(first.starts_with("sites/1/bg/hero-"));
        assert!(first.ends_with(".png"));

        let second = store.store("sites/1/bg/hero.png", b"png".to_vec()).await.unwrap();
        assert_ne!(first, second, "identical uploads must not share a file");

        let copy = store.copy(&first, "sites/1/bg/published/hero.png").await.unwrap();
        assert!(store.exists(&copy).await.unwrap());
        assert_eq!(std::fs::read(dir.path().join(&copy)).unwrap(), b"png");

        store.delete(&first).await.unwrap();
        assert!(!store.exists(&first).await.unwrap());
        // Deleting twice is fine.
        store.delete(&first).await.unwrap();
        assert!(store.exists(&second).await.unwrap());
    }

    #[tokio::test]
    async fn paths_cannot_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        let err = store.store("../outside.png", vec![1]).await.unwrap_err();
        assert!(matches!(err, DomainError::FileOperation(_)));
        assert!(store.exists("/etc/passwd").await.is_err());
    }
}
