//! services/api/src/web/users.rs
//!
//! CRUD endpoints for user accounts. All of these sit behind the auth gate.
//! Responses never include the password.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::double_option;
use crate::web::error::HttpError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use sis_core::domain::{NewUser, User, UserUpdate};

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// A user as returned over the wire: everything but the password.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            user_id: user.user_id,
            first_name: user.first_name,
            middle_name: user.middle_name,
            last_name: user.last_name,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Partial update payload. A key that is absent leaves the attribute alone;
/// an explicit `null` (or empty string) for `userId`/`middleName` clears it.
/// The password cannot be changed through this endpoint.
#[derive(Deserialize, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub user_id: Option<Option<String>>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub middle_name: Option<Option<String>>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// An empty string means "clear", same as an explicit null.
fn normalize_clearable(field: Option<Option<String>>) -> Option<Option<String>> {
    match field {
        Some(Some(s)) if s.trim().is_empty() => Some(None),
        other => other,
    }
}

impl UpdateUserRequest {
    fn into_update(self) -> UserUpdate {
        UserUpdate {
            user_id: normalize_clearable(self.user_id),
            first_name: self.first_name,
            middle_name: normalize_clearable(self.middle_name),
            last_name: self.last_name,
            email: self.email,
        }
    }
}

/// Profile updates come from the session identity, not the path, and cannot
/// touch the email.
#[derive(Deserialize, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub user_id: Option<Option<String>>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub middle_name: Option<Option<String>>,
    #[serde(default)]
    pub last_name: Option<String>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /api/users - List all users
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users, passwords excluded", body = [PublicUser]),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PublicUser>>, HttpError> {
    let users = state.store.list_users().await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

/// GET /api/users/me - The current authenticated user
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "The caller's own user record", body = PublicUser),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "User record no longer exists")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<PublicUser>, HttpError> {
    let user = state.store.get_user(auth.0).await?;
    Ok(Json(user.into()))
}

/// GET /api/users/{id} - Fetch one user by id
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = PublicUser),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No such user")
    )
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, HttpError> {
    let user = state.store.get_user(id).await?;
    Ok(Json(user.into()))
}

/// POST /api/users - Create a new user
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = PublicUser),
        (status = 400, description = "Missing fields or duplicate email"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
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

    let user = state
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
        Json(json!({
            "message": "User created successfully",
            "user": PublicUser::from(user),
        })),
    ))
}

/// PUT /api/users/{id} - Partially update a user
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated successfully", body = PublicUser),
        (status = 400, description = "Duplicate email"),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No such user")
    )
)]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let user = state.store.update_user(id, req.into_update()).await?;
    Ok(Json(json!({
        "message": "User updated successfully",
        "user": PublicUser::from(user),
    })))
}

/// PUT /api/users/profile - Update the caller's own profile
#[utoipa::path(
    put,
    path = "/api/users/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = PublicUser),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "User record no longer exists")
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let update = UserUpdate {
        user_id: normalize_clearable(req.user_id),
        first_name: req.first_name,
        middle_name: normalize_clearable(req.middle_name),
        last_name: req.last_name,
        email: None,
    };
    let user = state.store.update_user(auth.0, update).await?;
    Ok(Json(json!({
        "message": "Profile updated",
        "user": PublicUser::from(user),
    })))
}

/// DELETE /api/users/{id} - Delete a user
///
/// Refuses to delete the caller's own account: that would orphan the very
/// session making the request.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted successfully"),
        (status = 400, description = "Attempted to delete own account"),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No such user")
    )
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    if id == auth.0 {
        return Err(HttpError::validation(
            "Cannot delete your own account through this endpoint",
        ));
    }

    state.store.delete_user(id).await?;
    Ok(Json(json!({ "message": "User deleted successfully" })))
}
