use actix_web::body::{EitherBody, MessageBody};
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, Ready};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, AuthError};
use crate::session::SessionStore;
use crate::AppState;

/// Identity attached to a request that passed the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedUser>()
                .copied()
                .ok_or(AppError::AuthError(AuthError::Unauthenticated)),
        )
    }
}

/// Decides whether a presented session token admits a request.
#[derive(Clone)]
pub struct AuthGate {
    sessions: Arc<SessionStore>,
}

impl AuthGate {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }

    /// Every rejection, including a store outage, is the same
    /// `Unauthenticated` so a caller learns nothing about why.
    pub async fn admit(&self, token: Option<&str>) -> Result<AuthenticatedUser, AuthError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            debug!("Request carried no session token");
            return Err(AuthError::Unauthenticated);
        };

        match self.sessions.resolve(token).await {
            Ok(Some(session)) => Ok(AuthenticatedUser {
                user_id: session.user_id,
            }),
            Ok(None) => {
                debug!("Session token not recognised");
                Err(AuthError::Unauthenticated)
            }
            Err(e) => {
                warn!(error = %e, "Session lookup failed, rejecting request");
                Err(AuthError::Unauthenticated)
            }
        }
    }
}

/// Middleware for protected routes. Reads the session cookie and, when the
/// gate admits it, stores the `AuthenticatedUser` in request extensions.
/// Rejections are answered here with the usual JSON error body.
pub async fn require_auth<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
        let err = AppError::InternalError("application state not registered".into());
        return Ok(req.error_response(err).map_into_right_body());
    };

    let token = req
        .cookie(&state.config.session.cookie_name)
        .map(|cookie| cookie.value().to_owned());

    match state.auth_gate.admit(token.as_deref()).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            Ok(next.call(req).await?.map_into_left_body())
        }
        Err(e) => Ok(req.error_response(AppError::from(e)).map_into_right_body()),
    }
}

/// Cookie carrying a freshly minted session token.
pub fn session_cookie(name: &str, token: &str, ttl: chrono::Duration) -> Cookie<'static> {
    Cookie::build(name.to_owned(), token.to_owned())
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(ttl.num_seconds()))
        .finish()
}

/// Cookie that tells the client to drop its session token.
pub fn removal_cookie(name: &str) -> Cookie<'static> {
    let mut cookie = session_cookie(name, "", chrono::Duration::zero());
    cookie.make_removal();
    cookie
}
