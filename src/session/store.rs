use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::backend::KeyValueBackend;
use super::token::generate_session_token;
use crate::error::{AppError, StoreError};

pub const SESSION_KEY_PREFIX: &str = "session:";

/// One authenticated client lifetime. The token is the key, not the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        !self.is_live_at(Utc::now())
    }
}

pub fn session_key(token: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{token}")
}

/// Owns every session: mints, resolves and deletes them against the backend.
///
/// Expiry is enforced twice. The backend key carries the session TTL so
/// storage is reclaimed even if nobody reads it again, and every read checks
/// `expires_at` itself so a lagging backend never extends a session.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueBackend>,
    ttl: Duration,
    backend_ttl: std::time::Duration,
    op_timeout: std::time::Duration,
}

impl SessionStore {
    pub fn new(
        backend: Arc<dyn KeyValueBackend>,
        ttl: Duration,
        op_timeout: std::time::Duration,
    ) -> Result<Self, AppError> {
        let backend_ttl = ttl
            .to_std()
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| AppError::ConfigError(format!("session ttl must be positive, got {ttl}")))?;

        Ok(Self {
            backend,
            ttl,
            backend_ttl,
            op_timeout,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a session for `user_id` and return its token.
    pub async fn create(&self, user_id: Uuid) -> Result<String, StoreError> {
        let token = generate_session_token()?;
        let session = Session::new(user_id, self.ttl);
        let payload = serde_json::to_vec(&session)
            .map_err(|e| StoreError::Encoding(e.to_string()))?;

        self.bounded(self.backend.set(&session_key(&token), &payload, self.backend_ttl))
            .await?;

        debug!(%user_id, expires_at = %session.expires_at, "Session created");
        Ok(token)
    }

    /// Look up a live session.
    ///
    /// `Ok(None)` covers unknown tokens, keys the backend already evicted,
    /// and sessions past `expires_at`; the last are deleted before returning.
    pub async fn resolve(&self, token: &str) -> Result<Option<Session>, StoreError> {
        if token.is_empty() {
            return Ok(None);
        }

        let key = session_key(token);
        let Some(payload) = self.bounded(self.backend.get(&key)).await? else {
            return Ok(None);
        };

        let session: Session = serde_json::from_slice(&payload)
            .map_err(|e| StoreError::CorruptSession(e.to_string()))?;

        if !session.is_live_at(Utc::now()) {
            debug!(user_id = %session.user_id, "Evicting expired session");
            self.bounded(self.backend.del(&key)).await?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    pub async fn delete(&self, token: &str) -> Result<(), StoreError> {
        if token.is_empty() {
            return Ok(());
        }
        self.bounded(self.backend.del(&session_key(token))).await
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| StoreError::Timeout)?
    }
}
