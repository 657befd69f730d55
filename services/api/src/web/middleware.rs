//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use fleet_maintenance_core::domain::AuthContext;
use fleet_maintenance_core::ports::PortError;
use std::sync::Arc;
use tracing::error;

use crate::web::state::AppState;

/// Pulls the opaque session id out of a `Cookie` header value.
pub fn session_id_from_cookies(cookie_header: &str) -> Option<&str> {
    cookie_header.split(';').find_map(|c| {
        let c = c.trim();
        c.strip_prefix("session=")
    })
}

/// Middleware that validates the auth session cookie and builds the request's
/// `AuthContext`.
///
/// If valid, inserts the `AuthContext` into request extensions for handlers
/// to use. Requests without a usable session are redirected to the login
/// page; only infrastructure failures surface as server errors.
pub async fn require_auth(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    // 1. Extract the session id from the cookie header.
    let session_id = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_id_from_cookies);

    let Some(session_id) = session_id else {
        return Redirect::to("/login").into_response();
    };

    // 2. Validate the session and load the account it belongs to.
    let user_id = match state.db.validate_auth_session(session_id).await {
        Ok(user_id) => user_id,
        Err(PortError::NotFound(_)) => return Redirect::to("/login").into_response(),
        Err(e) => {
            error!("Failed to validate auth session: {:?}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let user = match state.db.get_user_by_id(user_id).await {
        Ok(user) => user,
        Err(PortError::NotFound(_)) => return Redirect::to("/login").into_response(),
        Err(e) => {
            error!("Failed to load user for session: {:?}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // 3. Insert the AuthContext into request extensions.
    req.extensions_mut().insert(AuthContext {
        user_id: user.id,
        role: user.role,
        vin: user.vin,
    });

    // 4. Continue to the handler.
    next.run(req).await
}
