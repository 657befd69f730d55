//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user login and logout. Accounts are
//! provisioned out of band; there is no signup endpoint.

use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Extension, Json,
};
use chrono::{Duration, Utc};
use fleet_maintenance_core::domain::{AuditAction, AuthContext};
use fleet_maintenance_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::middleware::session_id_from_cookies;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub role: String,
    pub vin: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LoginPageResponse {
    pub message: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /login - The login page descriptor
#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "Login page data", body = LoginPageResponse)
    )
)]
pub async fn login_page_handler() -> Json<LoginPageResponse> {
    Json(LoginPageResponse {
        message: "Sign in with your fleet account".to_string(),
    })
}

/// POST /login - Verify credentials and open a session
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Look up the account; an unknown username is the same failure as a
    //    bad password.
    let creds = match state.db.get_user_by_username(&req.username).await {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => {
            return Err((
                StatusCode::UNAUTHORIZED,
                "Invalid username or password".to_string(),
            ))
        }
        Err(e) => {
            error!("Failed to load user: {:?}", e);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication error".to_string(),
            ));
        }
    };

    // 2. Verify the password against the stored hash.
    let parsed_hash = PasswordHash::new(&creds.password_hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Authentication error".to_string(),
        )
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();

    if !valid {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Invalid username or password".to_string(),
        ));
    }

    // 3. Generate the auth session (30 days).
    let auth_session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(30);

    state
        .db
        .create_auth_session(&auth_session_id, creds.user_id, expires_at)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create session".to_string(),
            )
        })?;

    // 4. Record the login in the audit trail.
    state
        .db
        .append_audit_entry(creds.role, AuditAction::Login, creds.vin.as_deref())
        .await
        .map_err(|e| {
            error!("Failed to audit login: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to record login".to_string(),
            )
        })?;

    // 5. Create the session cookie and respond.
    let cookie = format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        auth_session_id,
        Duration::days(30).num_seconds()
    );

    let response = LoginResponse {
        user_id: creds.user_id,
        role: creds.role.to_string(),
        vin: creds.vin,
    };

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(response),
    ))
}

/// GET /logout - Close the session and return to the login page
#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 303, description = "Session closed, redirected to login")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Record the logout before tearing the session down.
    state
        .db
        .append_audit_entry(ctx.role, AuditAction::Logout, ctx.vin.as_deref())
        .await
        .map_err(|e| {
            error!("Failed to audit logout: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to record logout".to_string(),
            )
        })?;

    // 2. Delete the auth session row, if the cookie is still present.
    if let Some(session_id) = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_id_from_cookies)
    {
        state.db.delete_auth_session(session_id).await.map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to logout".to_string(),
            )
        })?;
    }

    // 3. Clear the cookie and send the browser back to the login page.
    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";

    Ok((
        [(header::SET_COOKIE, cookie.to_string())],
        Redirect::to("/login"),
    ))
}
