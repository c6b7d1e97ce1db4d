//! Database module
//!
//! Durable user records in Postgres, reached through the `UserRepository`
//! contract.

pub mod models;
pub mod operations;
pub mod repository;

pub use models::User;
pub use operations::{DbOperations, DbPoolStatus};
pub use repository::UserRepository;
