//! Persistence port: best-effort key/value storage.
//!
//! Failures never reach callers. A read that fails is indistinguishable from
//! an unset key, a write that fails is dropped after a debug log.

mod associations;

pub use associations::ChannelStore;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a key. `None` covers both "unset" and "could not read".
    async fn get(&self, key: &str) -> Option<Value>;

    /// Write a key. Errors are swallowed.
    async fn set(&self, key: &str, value: Value);

    /// Delete a key. Errors are swallowed.
    async fn remove(&self, key: &str);

    /// All entries, sorted by key. Empty on read failure.
    async fn entries(&self) -> Vec<(String, Value)>;
}

/// Process-local store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: Value) {
        self.inner.lock().await.insert(key.to_string(), value);
    }

    async fn remove(&self, key: &str) {
        self.inner.lock().await.remove(key);
    }

    async fn entries(&self) -> Vec<(String, Value)> {
        self.inner
            .lock()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// JSON object on disk, rewritten atomically on every change.
///
/// The mutex serializes read-modify-write cycles within one process; two
/// processes writing the same file concurrently is last-write-wins.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> BTreeMap<String, Value> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                tracing::debug!("Store read failed ({}): {}", self.path.display(), e);
                return BTreeMap::new();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::debug!("Store file {} is not a JSON object: {}", self.path.display(), e);
            BTreeMap::new()
        })
    }

    async fn persist(&self, map: &BTreeMap<String, Value>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(map)?;
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &self.path).await
    }

    async fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, Value>) + Send) {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await;
        apply(&mut map);
        if let Err(e) = self.persist(&map).await {
            tracing::debug!("Store write failed ({}): {}", self.path.display(), e);
        }
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Option<Value> {
        self.load().await.remove(key)
    }

    async fn set(&self, key: &str, value: Value) {
        let key = key.to_string();
        self.update(move |map| {
            map.insert(key, value);
        })
        .await;
    }

    async fn remove(&self, key: &str) {
        let key = key.to_string();
        self.update(move |map| {
            map.remove(&key);
        })
        .await;
    }

    async fn entries(&self) -> Vec<(String, Value)> {
        self.load().await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_store_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.set("ytot_autosync", json!(true)).await;
        assert_eq!(other.get("ytot_autosync").await, Some(json!(true)));

        other.remove("ytot_autosync").await;
        assert_eq!(store.get("ytot_autosync").await, None);
    }

    #[tokio::test]
    async fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        FileStore::new(&path)
            .set("ytot_somechannel", json!("abc12345678"))
            .await;

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get("ytot_somechannel").await,
            Some(json!("abc12345678"))
        );
        assert_eq!(reopened.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn file_store_treats_corrupt_file_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.get("anything").await, None);

        store.set("k", json!(1)).await;
        assert_eq!(store.get("k").await, Some(json!(1)));
    }

    #[tokio::test]
    async fn file_store_swallows_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes both read and write fail.
        let path = dir.path().join("store.json");
        std::fs::create_dir_all(&path).unwrap();

        let store = FileStore::new(&path);
        store.set("k", json!("v")).await;
        assert_eq!(store.get("k").await, None);
        assert!(store.entries().await.is_empty());
    }
}
