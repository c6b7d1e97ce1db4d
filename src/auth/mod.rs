//! Credential policy, the authentication use cases, and the gate that
//! admits requests carrying a live session.

pub mod gate;
pub mod handlers;
pub mod policy;
mod service;

pub use gate::{removal_cookie, require_auth, session_cookie, AuthGate, AuthenticatedUser};
pub use service::AuthService;
