#![allow(dead_code)]

use async_trait::async_trait;
use authgate_server::db::User;
use authgate_server::error::DatabaseError;
use authgate_server::health::{ComponentHealth, HealthProbe};
use authgate_server::{AppState, MemoryBackend, Settings, UserRepository};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// User store keyed by email, with the same uniqueness rule as the table.
#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<HashMap<String, User>>,
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn create(&self, user: &User) -> Result<(), DatabaseError> {
        let mut users = self.users.lock().await;
        if users.contains_key(&user.email) {
            return Err(DatabaseError::Duplicate);
        }
        users.insert(user.email.clone(), user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.lock().await.get(email).cloned())
    }
}

/// Probe with a canned answer.
pub struct FixedProbe {
    pub name: &'static str,
    pub health: ComponentHealth,
}

#[async_trait]
impl HealthProbe for FixedProbe {
    fn component(&self) -> &'static str {
        self.name
    }

    async fn probe(&self) -> ComponentHealth {
        self.health.clone()
    }
}

pub struct TestContext {
    pub state: AppState,
    pub backend: Arc<MemoryBackend>,
}

pub fn test_context() -> TestContext {
    let backend = Arc::new(MemoryBackend::new());
    let probe: Arc<dyn HealthProbe> = backend.clone();
    test_context_with_probes(backend, vec![probe])
}

pub fn test_context_with_probes(
    backend: Arc<MemoryBackend>,
    probes: Vec<Arc<dyn HealthProbe>>,
) -> TestContext {
    let config = Settings::new().expect("Failed to load settings");
    let state = AppState::from_parts(
        config,
        Arc::new(InMemoryUsers::default()),
        backend.clone(),
        probes,
    )
    .expect("Failed to build app state");

    TestContext { state, backend }
}
