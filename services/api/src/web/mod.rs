//! services/api/src/web/mod.rs
//!
//! Router assembly and the OpenAPI master definition. `router` is a plain
//! function over `AppState` so the integration tests can mount the exact
//! routing stack over the in-memory store adapter.

pub mod auth;
pub mod error;
pub mod middleware;
pub mod state;
pub mod students;
pub mod users;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

use crate::web::middleware::{require_auth, security_headers};
use crate::web::state::AppState;

/// Deserializes a field so that a key that is present-but-null becomes
/// `Some(None)` while an absent key stays `None` (via `#[serde(default)]`).
/// This is what lets partial updates distinguish "clear" from "leave alone".
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::check_handler,
        users::list_users_handler,
        users::me_handler,
        users::get_user_handler,
        users::create_user_handler,
        users::update_user_handler,
        users::update_profile_handler,
        users::delete_user_handler,
        students::list_students_handler,
        students::get_student_handler,
        students::create_student_handler,
        students::update_student_handler,
        students::delete_student_handler,
        students::search_students_handler,
    ),
    components(schemas(
        auth::RegisterRequest,
        auth::LoginRequest,
        auth::LoginUser,
        auth::CheckResponse,
        users::PublicUser,
        users::CreateUserRequest,
        users::UpdateUserRequest,
        users::UpdateProfileRequest,
        students::StudentResponse,
        students::CreateStudentRequest,
        students::UpdateStudentRequest,
    )),
    tags(
        (name = "Student Information API", description = "Session-authenticated CRUD for users and students.")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

//=========================================================================================
// Router Assembly
//=========================================================================================

/// Builds the full application router over the given state.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes: registration, login, logout, and the login-check probe.
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/logout", post(auth::logout_handler))
        .route("/api/auth/check", get(auth::check_handler));

    // Everything else passes the auth gate.
    let protected_routes = Router::new()
        .route(
            "/api/users",
            get(users::list_users_handler).post(users::create_user_handler),
        )
        .route("/api/users/me", get(users::me_handler))
        .route("/api/users/profile", put(users::update_profile_handler))
        .route(
            "/api/users/{id}",
            get(users::get_user_handler)
                .put(users::update_user_handler)
                .delete(users::delete_user_handler),
        )
        .route(
            "/api/students",
            get(students::list_students_handler).post(students::create_student_handler),
        )
        .route(
            "/api/students/{id}",
            get(students::get_student_handler)
                .put(students::update_student_handler)
                .delete(students::delete_student_handler),
        )
        .route(
            "/api/students/search/{query}",
            get(students::search_students_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let cors = CorsLayer::new()
        .allow_origin(state.config.cors_origin.parse::<HeaderValue>().unwrap())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(axum_middleware::from_fn(security_headers))
        .layer(cors)
        .with_state(state)
}
