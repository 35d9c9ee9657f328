//! Persistent key-value store contract
//!
//! The cache survives process restarts through any medium that can hold
//! string keys and string values. `MemoryStore` backs tests and ephemeral
//! runs; `JsonFileStore` keeps everything in one JSON document on disk.

use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::warn;

/// Durable key-value medium the cache writes through to.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read one entry.
    async fn get(&self, key: &str) -> Option<String>;

    /// Write one entry, replacing any previous value for the key.
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Read every persisted entry, used to hydrate the cache at startup.
    async fn entries(&self) -> Vec<(String, String)>;
}

/// In-memory store, the default when no persistence is configured.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Single-document JSON store.
///
/// The whole map is rewritten on every put, through a temp file and rename so
/// a crash mid-write never leaves a truncated document. An unreadable or
/// missing document hydrates as empty.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> HashMap<String, String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "store document unreadable, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        }
    }

    async fn flush(&self, map: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| EngineError::Storage(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| EngineError::Storage(format!("rename {}: {e}", self.path.display())))?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.load().await.get(key).cloned()
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await;
        map.insert(key.to_string(), value.to_string());
        self.flush(&map).await
    }

    async fn entries(&self) -> Vec<(String, String)> {
        self.load().await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get("agent:quote:AAPL").await.is_none());

        store.put("agent:quote:AAPL", "{\"price\":1}").await.unwrap();
        assert_eq!(
            store.get("agent:quote:AAPL").await.as_deref(),
            Some("{\"price\":1}")
        );

        store.put("agent:quote:AAPL", "{\"price\":2}").await.unwrap();
        assert_eq!(
            store.get("agent:quote:AAPL").await.as_deref(),
            Some("{\"price\":2}")
        );
        assert_eq!(store.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn json_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let store = JsonFileStore::new(&path);
        store.put("dossier:AAPL", "cached body").await.unwrap();
        assert_eq!(
            store.get("dossier:AAPL").await.as_deref(),
            Some("cached body")
        );

        // A second instance over the same file sees the entry
        let reopened = JsonFileStore::new(&path);
        assert_eq!(
            reopened.get("dossier:AAPL").await.as_deref(),
            Some("cached body")
        );
        assert_eq!(reopened.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn json_file_store_tolerates_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        tokio::fs::write(&path, "not json at all").await.unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.get("anything").await.is_none());

        // Writes recover the document
        store.put("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn json_file_store_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("never-written.json"));
        assert!(store.entries().await.is_empty());
    }
}
