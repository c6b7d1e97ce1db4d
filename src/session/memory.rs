use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::backend::KeyValueBackend;
use crate::error::StoreError;
use crate::health::{ComponentHealth, HealthProbe};

#[derive(Debug)]
struct Entry {
    value: Vec<u8>,
    deadline: Instant,
}

/// In-process backend with the same expiry semantics as KeyDB.
///
/// Used by tests and local runs without a KeyDB instance.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys that have not reached their deadline.
    pub async fn live_keys(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| now < e.deadline).count()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                deadline: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if Instant::now() < entry.deadline => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[async_trait]
impl HealthProbe for MemoryBackend {
    fn component(&self) -> &'static str {
        "keydb"
    }

    async fn probe(&self) -> ComponentHealth {
        let mut details = BTreeMap::new();
        details.insert("live_keys".to_string(), self.live_keys().await.to_string());
        ComponentHealth::up("In-memory backend", details)
    }
}
