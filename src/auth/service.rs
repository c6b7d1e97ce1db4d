use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::policy;
use crate::db::{User, UserRepository};
use crate::error::{AppError, AuthError, DatabaseError};
use crate::session::SessionStore;
use crate::Result;

/// Registration, login and logout use cases.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<SessionStore>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, sessions: Arc<SessionStore>) -> Self {
        Self { users, sessions }
    }

    /// Create an account and return its id.
    ///
    /// Policy violations come back with their specific reason. Anything that
    /// goes wrong afterwards, including an email that is already taken, is
    /// reported as `RegistrationFailed`.
    pub async fn register(&self, email: &str, password: &str) -> Result<Uuid> {
        policy::validate_registration(email, password)?;

        let email = policy::normalize_email(email);
        let password = password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || policy::hash_password(&password))
            .await
            .map_err(|e| AppError::InternalError(format!("hashing task failed: {e}")))??;

        let user = User::new(email, password_hash);
        match self.users.create(&user).await {
            Ok(()) => {
                info!(user_id = %user.user_id, "User registered");
                Ok(user.user_id)
            }
            Err(DatabaseError::Duplicate) => {
                debug!("Registration rejected: email already in use");
                Err(AuthError::RegistrationFailed.into())
            }
            Err(e) => {
                warn!(error = %e, "Registration failed in user store");
                Err(AuthError::RegistrationFailed.into())
            }
        }
    }

    /// Check credentials and mint a session, returning its token.
    ///
    /// An unknown email and a wrong password produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let email = policy::normalize_email(email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            debug!("Login rejected");
            return Err(AuthError::InvalidCredentials.into());
        };

        let password_hash = user.password_hash.clone();
        let candidate = password.to_owned();
        let verified = tokio::task::spawn_blocking(move || {
            policy::verify_password(&password_hash, &candidate)
        })
        .await
        .map_err(|e| AppError::InternalError(format!("verification task failed: {e}")))?;

        if !verified {
            debug!("Login rejected");
            return Err(AuthError::InvalidCredentials.into());
        }

        let token = self.sessions.create(user.user_id).await?;
        info!(user_id = %user.user_id, "User logged in");
        Ok(token)
    }

    /// End a session. Unknown or already-expired tokens are fine.
    pub async fn logout(&self, token: &str) -> Result<()> {
        self.sessions.delete(token).await?;
        Ok(())
    }
}
