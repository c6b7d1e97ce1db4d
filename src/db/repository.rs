use async_trait::async_trait;

use crate::db::models::User;
use crate::error::DatabaseError;

/// The two operations authentication needs from durable storage.
///
/// Implementations guarantee at most one record per normalized email and
/// report a clash as `DatabaseError::Duplicate`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), DatabaseError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
}
