//! Session module
//!
//! Opaque session tokens persisted in a TTL-capable key-value backend.

pub mod backend;
mod memory;
mod store;
pub mod token;

pub use backend::{KeyValueBackend, RedisBackend};
pub use memory::MemoryBackend;
pub use store::{session_key, Session, SessionStore, SESSION_KEY_PREFIX};
pub use token::generate_session_token;
