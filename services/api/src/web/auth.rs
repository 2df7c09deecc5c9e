//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: register, login, logout, and the login-check
//! probe the client calls on load.
//!
//! Passwords are stored and compared as given, by direct string equality.
//! The weakness and the recommended fix are recorded in DESIGN.md.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::error::HttpError;
use crate::web::middleware::session_token;
use crate::web::state::{AppState, SESSION_COOKIE};
use sis_core::domain::NewUser;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The user object returned on login. Deliberately narrow; never the password.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub is_logged_in: bool,
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

fn clear_session_cookie() -> String {
    session_cookie("", 0)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully"),
        (status = 400, description = "Missing fields or duplicate email"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, HttpError> {
    if req.first_name.trim().is_empty()
        || req.last_name.trim().is_empty()
        || req.email.trim().is_empty()
        || req.password.is_empty()
    {
        return Err(HttpError::validation(
            "firstName, lastName, email and password are required",
        ));
    }

    state
        .store
        .create_user(NewUser {
            user_id: req.user_id,
            first_name: req.first_name,
            middle_name: req.middle_name,
            last_name: req.last_name,
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    ))
}

/// POST /api/auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginUser),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let creds = state
        .store
        .find_user_by_email(&req.email)
        .await?
        .ok_or_else(HttpError::invalid_credentials)?;

    // Direct equality check; see the module note on password storage.
    if creds.password != req.password {
        return Err(HttpError::invalid_credentials());
    }

    let token = Uuid::new_v4().to_string();
    let ttl = Duration::hours(state.config.session_ttl_hours);
    let expires_at = Utc::now() + ttl;

    state
        .store
        .create_session(&token, creds.id, expires_at)
        .await?;

    let cookie = session_cookie(&token, ttl.num_seconds());
    let user = LoginUser {
        id: creds.id,
        user_id: creds.user_id,
        first_name: creds.first_name,
        last_name: creds.last_name,
        email: creds.email,
    };

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "message": "Login successful", "user": user })),
    ))
}

/// POST /api/auth/logout - Logout and invalidate the session
///
/// Idempotent: succeeds whether or not a session cookie is presented.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out successfully")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    if let Some(token) = session_token(&headers) {
        state.store.delete_session(token).await?;
    }

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(json!({ "message": "Logged out successfully" })),
    ))
}

/// GET /api/auth/check - Report whether the request carries a live session
///
/// A pure query: no session is created, refreshed, or destroyed.
#[utoipa::path(
    get,
    path = "/api/auth/check",
    responses(
        (status = 200, description = "Current login state", body = CheckResponse)
    )
)]
pub async fn check_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<CheckResponse> {
    let is_logged_in = match session_token(&headers) {
        Some(token) => state.store.validate_session(token).await.is_ok(),
        None => false,
    };
    Json(CheckResponse { is_logged_in })
}
