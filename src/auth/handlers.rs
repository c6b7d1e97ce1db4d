use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::auth::gate::{removal_cookie, session_cookie, AuthenticatedUser};
use crate::error::AppError;
use crate::AppState;

// No Debug derive on request bodies: they carry plaintext passwords.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received registration request");

    match state.auth_service.register(&req.email, &req.password).await {
        Ok(user_id) => {
            info!(%user_id, "Registration successful");
            Ok(HttpResponse::Created().json(MessageResponse::new("User registered successfully")))
        }
        Err(e) => {
            error!("Registration failed: {}", e);
            Err(e)
        }
    }
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request");

    match state.auth_service.login(&req.email, &req.password).await {
        Ok(token) => {
            info!("Login successful");
            let cookie = session_cookie(
                &state.config.session.cookie_name,
                &token,
                state.sessions.ttl(),
            );
            Ok(HttpResponse::Ok()
                .cookie(cookie)
                .json(MessageResponse::new("Login successful")))
        }
        Err(e) => {
            error!("Login failed: {}", e);
            Err(e)
        }
    }
}

/// Ends the presented session, if any, and clears the cookie either way.
pub async fn logout(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let cookie_name = &state.config.session.cookie_name;

    if let Some(cookie) = req.cookie(cookie_name) {
        state.auth_service.logout(cookie.value()).await?;
        info!("Session ended");
    }

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie(cookie_name))
        .json(MessageResponse::new("Successfully logged out")))
}

/// Protected greeting. Only reachable through `require_auth`.
pub async fn hello(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Hello World",
        "user_id": user.user_id,
    }))
}
