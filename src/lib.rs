pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod health;
pub mod session;

use actix_web::middleware::from_fn;
use actix_web::{web, HttpResponse};
use std::sync::Arc;
use tracing::{info, warn};

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{AuthGate, AuthService, AuthenticatedUser};
pub use db::{DbOperations, User, UserRepository};
pub use health::HealthProbe;
pub use session::{KeyValueBackend, MemoryBackend, RedisBackend, SessionStore};

use auth::handlers::{hello, login, logout, register};
use auth::require_auth;

/// KeyDB URL scheme that selects the in-process backend instead.
pub const MEMORY_BACKEND_URL: &str = "memory://";

/// Health check endpoint handler
/// Runs every registered probe; 503 when any component is down.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let report = health::check_all(&state.probes).await;
    if report.is_healthy() {
        HttpResponse::Ok().json(report)
    } else {
        warn!("Health check reported a component down");
        HttpResponse::ServiceUnavailable().json(report)
    }
}

/// Route table shared by the server binary and the integration tests.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout)),
    )
    .route("/health", web::get().to(health_check))
    .service(
        web::resource("/")
            .wrap(from_fn(require_auth))
            .route(web::get().to(hello)),
    );
}

/// Application state shared across all components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub auth_service: Arc<AuthService>,
    pub auth_gate: Arc<AuthGate>,
    pub sessions: Arc<SessionStore>,
    pub probes: Vec<Arc<dyn HealthProbe>>,
    db: Option<Arc<DbOperations>>,
}

impl AppState {
    /// Connect to Postgres and the key-value backend and wire the services.
    pub async fn new(config: Settings) -> Result<Self> {
        let db = DbOperations::new_with_options(
            &config.database.url,
            config.database.max_connections,
            config.database.acquire_timeout(),
        )
        .await?;
        info!("Connected to database");

        if config.database.run_migrations {
            db.run_migrations().await?;
        }
        let db = Arc::new(db);

        let (backend, backend_probe): (Arc<dyn KeyValueBackend>, Arc<dyn HealthProbe>) =
            if config.keydb.url.starts_with(MEMORY_BACKEND_URL) {
                warn!("Using in-memory session backend; sessions will not survive a restart");
                let backend = Arc::new(MemoryBackend::new());
                (backend.clone() as Arc<dyn KeyValueBackend>, backend as Arc<dyn HealthProbe>)
            } else {
                let backend = Arc::new(
                    RedisBackend::connect(&config.keydb.url, config.keydb.connect_timeout()).await?,
                );
                (backend.clone() as Arc<dyn KeyValueBackend>, backend as Arc<dyn HealthProbe>)
            };

        let db_probe: Arc<dyn HealthProbe> = db.clone();
        let mut state = Self::from_parts(config, db.clone(), backend, vec![db_probe, backend_probe])?;
        state.db = Some(db);
        Ok(state)
    }

    /// Wire the services over already-built storage.
    pub fn from_parts(
        config: Settings,
        users: Arc<dyn UserRepository>,
        backend: Arc<dyn KeyValueBackend>,
        probes: Vec<Arc<dyn HealthProbe>>,
    ) -> Result<Self> {
        let sessions = Arc::new(SessionStore::new(
            backend,
            config.session.ttl()?,
            config.keydb.op_timeout(),
        )?);

        Ok(Self {
            config: Arc::new(config),
            auth_service: Arc::new(AuthService::new(users, sessions.clone())),
            auth_gate: Arc::new(AuthGate::new(sessions.clone())),
            sessions,
            probes,
            db: None,
        })
    }

    pub async fn shutdown(&self) -> Result<()> {
        // Close database connections
        if let Some(db) = &self.db {
            db.close().await;
        }
        info!("Application state shut down");
        Ok(())
    }
}
