use crate::domain::ports::{KeyValueStore, Record};
use crate::error::{Result, ShopError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory keyed store.
///
/// Uses `Arc<RwLock<HashMap<K, R>>>` so clones share the same records.
/// Enough for a single process; nothing survives a restart.
pub struct InMemoryStore<R: Record> {
    records: Arc<RwLock<HashMap<R::Key, R>>>,
}

impl<R: Record> InMemoryStore<R> {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<R: Record> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Clone for InMemoryStore<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

#[async_trait]
impl<R: Record> KeyValueStore<R> for InMemoryStore<R> {
    async fn get(&self, key: &R::Key) -> Result<Option<R>> {
        let records = self.records.read().await;
        Ok(records.get(key).cloned())
    }

    async fn put(&self, mut record: R) -> Result<R> {
        let mut records = self.records.write().await;
        let key = record.key();
        let found = records.get(&key).map(Record::version).unwrap_or(0);
        if found != record.version() {
            return Err(ShopError::Conflict {
                key: key.to_string(),
                expected: record.version(),
                found,
            });
        }
        record.set_version(found + 1);
        records.insert(key, record.clone());
        Ok(record)
    }

    async fn delete(&self, key: &R::Key) -> Result<Option<R>> {
        let mut records = self.records.write().await;
        Ok(records.remove(key))
    }

    async fn values(&self) -> Result<Vec<R>> {
        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }
}
