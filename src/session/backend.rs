//! Key-value backends with per-key expiry.
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

use crate::error::StoreError;
use crate::health::{ComponentHealth, HealthProbe};

const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// The three commands the session store needs from its backend.
///
/// Each call is a single atomic round trip. A key that is absent, or that
/// the backend has already expired, reads as `Ok(None)`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Removing a missing key succeeds.
    async fn del(&self, key: &str) -> Result<(), StoreError>;
}

/// KeyDB / Redis backend over one multiplexed connection.
///
/// `ConnectionManager` reconnects on its own and is cheap to clone, so every
/// request shares the same underlying socket without extra locking.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = tokio::time::timeout(connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Timeout)??;

        info!("Connected to key-value backend");
        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_ms)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<Vec<u8>>>(&mut conn)
            .await?;
        Ok(value)
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, i64>(&mut conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl HealthProbe for RedisBackend {
    fn component(&self) -> &'static str {
        "keydb"
    }

    async fn probe(&self) -> ComponentHealth {
        let mut conn = self.conn.clone();
        let cmd = redis::cmd("PING");
        let ping = cmd.query_async::<_, String>(&mut conn);
        match tokio::time::timeout(PING_TIMEOUT, ping).await {
            Ok(Ok(_)) => ComponentHealth::up("KeyDB connection is healthy", BTreeMap::new()),
            Ok(Err(e)) => ComponentHealth::down(format!("KeyDB connection error: {e}")),
            Err(_) => ComponentHealth::down("KeyDB ping timed out"),
        }
    }
}
