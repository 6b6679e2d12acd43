// Key-value persistence seam used by the history and result caches

use async_trait::async_trait;
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub fn search_history_key(user_id: &str) -> String {
    format!("searchHistory_{}", user_id)
}

pub fn bookings_key(user_id: &str) -> String {
    format!("bookings_{}", user_id)
}

// Values are opaque JSON text
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    async fn set(&self, key: &str, value: String) -> Result<(), PersistenceError>;

    async fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// In-process store, also used by tests to simulate a failing backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: DashMap<String, String>,
    fail_next_operations: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // The next `count` operations fail with a backend error
    pub fn fail_next_operations(&self, count: usize) {
        self.fail_next_operations.store(count, Ordering::SeqCst);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|value| value.clone())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn check_failure(&self) -> Result<(), PersistenceError> {
        let injected = self
            .fail_next_operations
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match injected {
            Ok(_) => Err(PersistenceError::Backend(
                "Simulated storage failure".to_string(),
            )),
            Err(_) => Ok(()),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        self.check_failure()?;
        Ok(self.values.get(key).map(|value| value.clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        self.check_failure()?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.check_failure()?;
        self.values.remove(key);
        Ok(())
    }
}

/// Store keeping one `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    // Percent-encoding keeps distinct keys in distinct files
    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", urlencoding::encode(key)))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::Io(e)),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_scoped_per_user() {
        assert_eq!(search_history_key("42"), "searchHistory_42");
        assert_eq!(bookings_key("42"), "bookings_42");
        assert_ne!(bookings_key("1"), bookings_key("2"));
    }

    #[tokio::test]
    async fn test_memory_store_operations() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "v".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));

        store.remove("k").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_failure_injection() {
        let store = MemoryStore::new();
        store.fail_next_operations(2);

        assert!(store.set("k", "v".to_string()).await.is_err());
        assert!(store.get("k").await.is_err());
        assert!(store.set("k", "v".to_string()).await.is_ok());
        assert!(store.contains_key("k"));
    }

    #[tokio::test]
    async fn test_file_store_operations() {
        let root = std::env::temp_dir().join(format!(
            "homestay_search_store_{}_{}",
            std::process::id(),
            rand::random::<u32>()
        ));
        let store = FileStore::new(&root);

        assert_eq!(store.get("searchHistory_7").await.unwrap(), None);
        store
            .set("searchHistory_7", "[]".to_string())
            .await
            .unwrap();
        assert_eq!(
            store.get("searchHistory_7").await.unwrap(),
            Some("[]".to_string())
        );

        store.remove("searchHistory_7").await.unwrap();
        store.remove("searchHistory_7").await.unwrap();
        assert_eq!(store.get("searchHistory_7").await.unwrap(), None);

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[test]
    fn test_file_store_encodes_key() {
        let store = FileStore::new("/tmp/store");
        assert_eq!(
            store.path_for("bookings_a/../b"),
            PathBuf::from("/tmp/store/bookings_a%2F..%2Fb.json")
        );
        assert_eq!(
            store.path_for("searchHistory_42"),
            PathBuf::from("/tmp/store/searchHistory_42.json")
        );
    }

    #[tokio::test]
    async fn test_file_store_keeps_similar_keys_apart() {
        let root = std::env::temp_dir().join(format!(
            "homestay_search_keys_{}_{}",
            std::process::id(),
            rand::random::<u32>()
        ));
        let store = FileStore::new(&root);

        let dotted = bookings_key("a.b@x.com");
        let underscored = bookings_key("a_b@x_com");
        assert_ne!(store.path_for(&dotted), store.path_for(&underscored));

        store.set(&dotted, "alice".to_string()).await.unwrap();
        assert_eq!(store.get(&underscored).await.unwrap(), None);
        assert_eq!(store.get(&dotted).await.unwrap(), Some("alice".to_string()));

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
