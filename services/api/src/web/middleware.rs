//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes, plus the security
//! response headers applied to every response.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::web::error::HttpError;
use crate::web::state::{AppState, SESSION_COOKIE};

/// The authenticated identity, inserted into request extensions by
/// [`require_auth`] for handlers to use.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

/// Pulls the session token out of the `Cookie` header, if any.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_header.split(';').find_map(|c| {
        let c = c.trim();
        c.strip_prefix(SESSION_COOKIE)?.strip_prefix('=')
    })
}

/// Middleware that validates the auth session cookie and extracts the user id.
///
/// If valid, inserts an [`AuthUser`] into request extensions for handlers to
/// use. Missing, malformed, unknown, and expired tokens are all rejected with
/// the same 401 body, so a caller learns nothing about why it was turned away.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let token = session_token(req.headers()).ok_or_else(HttpError::unauthorized)?;

    let user_id = state
        .store
        .validate_session(token)
        .await
        .map_err(|_| HttpError::unauthorized())?;

    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}

/// Stamps the baseline security headers onto every response.
pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut res = next.run(req).await;
    let headers = res.headers_mut();
    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "X-XSS-Protection",
        HeaderValue::from_static("1; mode=block"),
    );
    res
}
