//! services/api/src/web/students.rs
//!
//! CRUD endpoints for student records, all behind the auth gate.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::double_option;
use crate::web::error::HttpError;
use crate::web::state::AppState;
use sis_core::domain::{NewStudent, Student, StudentUpdate};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentResponse {
    pub id: Uuid,
    pub id_number: String,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub course: String,
    /// Year level as free text; the server does not enforce the
    /// "1st Year".."4th Year" enumeration the client offers.
    pub year: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Student> for StudentResponse {
    fn from(student: Student) -> Self {
        Self {
            id: student.id,
            id_number: student.id_number,
            first_name: student.first_name,
            middle_name: student.middle_name,
            last_name: student.last_name,
            course: student.course,
            year: student.year,
            created_at: student.created_at,
            updated_at: student.updated_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    pub id_number: String,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub course: String,
    pub year: String,
}

/// Partial update payload; absent keys leave attributes unchanged, an
/// explicit null or empty string clears `middleName`.
#[derive(Deserialize, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudentRequest {
    #[serde(default)]
    pub id_number: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub middle_name: Option<Option<String>>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
}

impl UpdateStudentRequest {
    fn into_update(self) -> StudentUpdate {
        let middle_name = match self.middle_name {
            Some(Some(s)) if s.trim().is_empty() => Some(None),
            other => other,
        };
        StudentUpdate {
            id_number: self.id_number,
            first_name: self.first_name,
            middle_name,
            last_name: self.last_name,
            course: self.course,
            year: self.year,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /api/students - List all students, sorted by last then first name
#[utoipa::path(
    get,
    path = "/api/students",
    responses(
        (status = 200, description = "All students", body = [StudentResponse]),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_students_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StudentResponse>>, HttpError> {
    let students = state.store.list_students().await?;
    Ok(Json(
        students.into_iter().map(StudentResponse::from).collect(),
    ))
}

/// GET /api/students/{id} - Fetch one student by id
#[utoipa::path(
    get,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student id")),
    responses(
        (status = 200, description = "The student", body = StudentResponse),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No such student")
    )
)]
pub async fn get_student_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<StudentResponse>, HttpError> {
    let student = state.store.get_student(id).await?;
    Ok(Json(student.into()))
}

/// POST /api/students - Create a new student record
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudentRequest,
    responses(
        (status = 201, description = "Student added successfully", body = StudentResponse),
        (status = 400, description = "Missing fields or duplicate ID number"),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn create_student_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse, HttpError> {
    if req.id_number.trim().is_empty()
        || req.first_name.trim().is_empty()
        || req.last_name.trim().is_empty()
        || req.course.trim().is_empty()
        || req.year.trim().is_empty()
    {
        return Err(HttpError::validation(
            "idNumber, firstName, lastName, course and year are required",
        ));
    }

    let student = state
        .store
        .create_student(NewStudent {
            id_number: req.id_number,
            first_name: req.first_name,
            middle_name: req.middle_name,
            last_name: req.last_name,
            course: req.course,
            year: req.year,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Student added successfully",
            "student": StudentResponse::from(student),
        })),
    ))
}

/// PUT /api/students/{id} - Partially update a student
#[utoipa::path(
    put,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student id")),
    request_body = UpdateStudentRequest,
    responses(
        (status = 200, description = "Student updated successfully", body = StudentResponse),
        (status = 400, description = "Duplicate ID number"),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No such student")
    )
)]
pub async fn update_student_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStudentRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let student = state.store.update_student(id, req.into_update()).await?;
    Ok(Json(json!({
        "message": "Student updated successfully",
        "student": StudentResponse::from(student),
    })))
}

/// DELETE /api/students/{id} - Delete a student record
#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student id")),
    responses(
        (status = 200, description = "Student deleted successfully"),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No such student")
    )
)]
pub async fn delete_student_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    state.store.delete_student(id).await?;
    Ok(Json(json!({ "message": "Student deleted successfully" })))
}

/// GET /api/students/search/{query} - Case-insensitive substring search
#[utoipa::path(
    get,
    path = "/api/students/search/{query}",
    params(("query" = String, Path, description = "Substring matched against idNumber, firstName and lastName")),
    responses(
        (status = 200, description = "Matching students", body = [StudentResponse]),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn search_students_handler(
    State(state): State<Arc<AppState>>,
    Path(query): Path<String>,
) -> Result<Json<Vec<StudentResponse>>, HttpError> {
    let students = state.store.search_students(&query).await?;
    Ok(Json(
        students.into_iter().map(StudentResponse::from).collect(),
    ))
}
