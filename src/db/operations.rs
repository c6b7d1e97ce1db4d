use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::db::models::User;
use crate::db::repository::UserRepository;
use crate::error::DatabaseError;
use crate::health::{ComponentHealth, HealthProbe};

const PING_TIMEOUT: Duration = Duration::from_secs(1);
const HEAVY_LOAD_CONNECTIONS: u32 = 40;

pub struct DbOperations {
    pool: Arc<PgPool>,
}

impl DbOperations {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub fn pool(&self) -> &PgPool {
        self.pool.as_ref()
    }

    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(self.pool.as_ref())
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn get_pool_status(&self) -> DbPoolStatus {
        let size = self.pool.size();
        let idle = self.pool.num_idle() as u32;

        DbPoolStatus {
            total_connections: size,
            active_connections: size.saturating_sub(idle),
            idle_connections: idle,
        }
    }

    pub async fn begin_transaction(&self) -> Result<Transaction<'_, Postgres>, DatabaseError> {
        Ok(self.pool.as_ref().begin().await?)
    }

    async fn insert_user(
        &self,
        user: &User,
        transaction: &mut Transaction<'_, Postgres>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl UserRepository for DbOperations {
    async fn create(&self, user: &User) -> Result<(), DatabaseError> {
        let mut transaction = self.begin_transaction().await?;

        match self.insert_user(user, &mut transaction).await {
            Ok(()) => {
                transaction.commit().await?;
                Ok(())
            }
            Err(e) => {
                transaction.rollback().await?;
                Err(e)
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT user_id, email, password_hash, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl HealthProbe for DbOperations {
    fn component(&self) -> &'static str {
        "database"
    }

    async fn probe(&self) -> ComponentHealth {
        let ping = sqlx::query("SELECT 1").execute(self.pool.as_ref());
        match tokio::time::timeout(PING_TIMEOUT, ping).await {
            Ok(Ok(_)) => {
                let status = self.get_pool_status();
                let message = if status.total_connections > HEAVY_LOAD_CONNECTIONS {
                    "The database is experiencing heavy load."
                } else {
                    "It's healthy"
                };
                ComponentHealth::up(message, status.as_details())
            }
            Ok(Err(e)) => ComponentHealth::down(format!("db down: {e}")),
            Err(_) => ComponentHealth::down("db down: ping timed out"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DbPoolStatus {
    pub total_connections: u32,
    pub active_connections: u32,
    pub idle_connections: u32,
}

impl DbPoolStatus {
    fn as_details(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("open_connections".to_string(), self.total_connections.to_string()),
            ("in_use".to_string(), self.active_connections.to_string()),
            ("idle".to_string(), self.idle_connections.to_string()),
        ])
    }
}
