//! In-process [`FileStore`] keyed by path.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use domains::error::{DomainError, Result};
use domains::ports::FileStore;

#[derive(Debug, Default)]
pub struct InMemoryFileStore {
    files: DashMap<String, Vec<u8>>,
    fail_copies: AtomicBool,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every `copy` fails.
    pub fn set_fail_copies(&self, fail: bool) {
        self.fail_copies.store(fail, Ordering::SeqCst);
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.files.get(path).map(|e| e.value().clone())
    }

    /// Inserts under `hint`, or under `stem-N.ext` when `hint` is taken.
    fn insert_unique(&self, hint: &str, bytes: Vec<u8>) -> String {
        let (stem, ext) = match hint.rsplit_once('.') {
            Some((stem, ext)) if !ext.contains('/') => (stem, Some(ext)),
            _ => (hint, None),
        };
        let mut candidate = hint.to_string();
        let mut n = 1;
        loop {
            match self.files.entry(candidate.clone()) {
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(bytes);
                    return candidate;
                }
                dashmap::mapref::entry::Entry::Occupied(_) => {
                    n += 1;
                    candidate = match ext {
                        Some(ext) => format!("{stem}-{n}.{ext}"),
                        None => format!("{stem}-{n}"),
                    };
                }
            }
        }
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn store(&self, path_hint: &str, bytes: Vec<u8>) -> Result<String> {
        Ok(self.insert_unique(path_hint, bytes))
    }

    async fn copy(&self, src_path: &str, dst_path_hint: &str) -> Result<String> {
        if self.fail_copies.load(Ordering::SeqCst) {
            return Err(DomainError::FileOperation(format!("copy of {src_path} refused")));
        }
        let bytes = self
            .read(src_path)
            .ok_or_else(|| DomainError::FileOperation(format!("{src_path} does not exist")))?;
        Ok(self.insert_unique(dst_path_hint, bytes))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.files.remove(path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.files.contains_key(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn taken_paths_get_a_counter() {
        let store = InMemoryFileStore::new();
        assert_eq!(store.store("img/a.png", vec![1]).await.unwrap(), "img/a.png");
        assert_eq!(store.store("img/a.png", vec![2]).await.unwrap(), "img/a-2.png");
        assert_eq!(store.copy("img/a.png", "img/a.png").await.unwrap(), "img/a-3.png");
        assert_eq!(store.read("img/a-3.png"), Some(vec![1]));
    }

    #[tokio::test]
    async fn copies_can_be_made_to_fail() {
        let store = InMemoryFileStore::new();
        store.store("a.png", vec![1]).await.unwrap();
        store.set_fail_copies(true);
        assert!(matches!(
            store.copy("a.png", "published/a.png").await,
            Err(DomainError::FileOperation(_))
        ));
        assert_eq!(store.paths(), vec!["a.png".to_string()]);
    }
}
