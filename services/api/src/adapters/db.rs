//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `RegistryStore` port from the `sis_core` crate. It handles all
//! interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sis_core::domain::{
    NewStudent, NewUser, Student, StudentUpdate, User, UserCredentials, UserUpdate,
};
use sis_core::ports::{PortError, PortResult, RegistryStore};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `RegistryStore` port.
#[derive(Clone)]
pub struct PgAdapter {
    pool: PgPool,
}

impl PgAdapter {
    /// Creates a new `PgAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Maps a failed write to the port taxonomy. Unique-index violations
/// (Postgres error 23505) become `Duplicate`, keyed by constraint name so the
/// message says which invariant was hit.
fn map_write_err(e: sqlx::Error) -> PortError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.code().as_deref() == Some("23505") {
            let message = match db_err.constraint() {
                Some("users_email_key") => "User with this email already exists",
                Some("users_user_id_key") => "User ID already in use",
                Some("students_id_number_key") => "Student with this ID number already exists",
                _ => "Duplicate key",
            };
            return PortError::Duplicate(message.to_string());
        }
    }
    PortError::Unexpected(e.to_string())
}

fn not_found(e: sqlx::Error, what: &str) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(format!("{} not found", what)),
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    user_id: Option<String>,
    first_name: String,
    middle_name: Option<String>,
    last_name: String,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            user_id: self.user_id,
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            email: self.email,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    user_id: Option<String>,
    first_name: String,
    last_name: String,
    email: String,
    password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            id: self.id,
            user_id: self.user_id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            password: self.password,
        }
    }
}

#[derive(FromRow)]
struct StudentRecord {
    id: Uuid,
    id_number: String,
    first_name: String,
    middle_name: Option<String>,
    last_name: String,
    course: String,
    year: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl StudentRecord {
    fn to_domain(self) -> Student {
        Student {
            id: self.id,
            id_number: self.id_number,
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            course: self.course,
            year: self.year,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, user_id, first_name, middle_name, last_name, email, created_at, updated_at";
const STUDENT_COLUMNS: &str =
    "id, id_number, first_name, middle_name, last_name, course, year, created_at, updated_at";

//=========================================================================================
// `RegistryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl RegistryStore for PgAdapter {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        // The unique indexes on email and user_id make this insert the
        // single conditional write that closes the check-then-insert race.
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, user_id, first_name, middle_name, last_name, email, password) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new_user.user_id)
        .bind(new_user.first_name)
        .bind(new_user.middle_name)
        .bind(new_user.last_name)
        .bind(new_user.email.to_lowercase())
        .bind(new_user.password)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_err)?;
        Ok(record.to_domain())
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_user(&self, id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found(e, "User"))?;
        Ok(record.to_domain())
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, user_id, first_name, last_name, email, password \
             FROM users WHERE email = $1",
        )
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> PortResult<User> {
        // Merge under a row lock; the unique indexes still decide any race
        // on the new email or user_id at commit time.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let current = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| not_found(e, "User"))?;

        let user_id = match update.user_id {
            Some(value) => value,
            None => current.user_id,
        };
        let first_name = update.first_name.unwrap_or(current.first_name);
        let middle_name = match update.middle_name {
            Some(value) => value,
            None => current.middle_name,
        };
        let last_name = update.last_name.unwrap_or(current.last_name);
        let email = update
            .email
            .map(|e| e.to_lowercase())
            .unwrap_or(current.email);

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET user_id = $2, first_name = $3, middle_name = $4, \
             last_name = $5, email = $6, updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(first_name)
        .bind(middle_name)
        .bind(last_name)
        .bind(email)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_err)?;

        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.to_domain())
    }

    async fn delete_user(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn create_student(&self, new_student: NewStudent) -> PortResult<Student> {
        let record = sqlx::query_as::<_, StudentRecord>(&format!(
            "INSERT INTO students (id, id_number, first_name, middle_name, last_name, course, year) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new_student.id_number)
        .bind(new_student.first_name)
        .bind(new_student.middle_name)
        .bind(new_student.last_name)
        .bind(new_student.course)
        .bind(new_student.year)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_err)?;
        Ok(record.to_domain())
    }

    async fn list_students(&self) -> PortResult<Vec<Student>> {
        let records = sqlx::query_as::<_, StudentRecord>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students ORDER BY last_name ASC, first_name ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_student(&self, id: Uuid) -> PortResult<Student> {
        let record = sqlx::query_as::<_, StudentRecord>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found(e, "Student"))?;
        Ok(record.to_domain())
    }

    async fn update_student(&self, id: Uuid, update: StudentUpdate) -> PortResult<Student> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let current = sqlx::query_as::<_, StudentRecord>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| not_found(e, "Student"))?;

        let id_number = update.id_number.unwrap_or(current.id_number);
        let first_name = update.first_name.unwrap_or(current.first_name);
        let middle_name = match update.middle_name {
            Some(value) => value,
            None => current.middle_name,
        };
        let last_name = update.last_name.unwrap_or(current.last_name);
        let course = update.course.unwrap_or(current.course);
        let year = update.year.unwrap_or(current.year);

        let record = sqlx::query_as::<_, StudentRecord>(&format!(
            "UPDATE students SET id_number = $2, first_name = $3, middle_name = $4, \
             last_name = $5, course = $6, year = $7, updated_at = now() \
             WHERE id = $1 RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(id)
        .bind(id_number)
        .bind(first_name)
        .bind(middle_name)
        .bind(last_name)
        .bind(course)
        .bind(year)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_err)?;

        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.to_domain())
    }

    async fn delete_student(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("Student not found".to_string()));
        }
        Ok(())
    }

    async fn search_students(&self, query: &str) -> PortResult<Vec<Student>> {
        let records = sqlx::query_as::<_, StudentRecord>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students \
             WHERE id_number ILIKE $1 OR first_name ILIKE $1 OR last_name ILIKE $1 \
             ORDER BY last_name ASC, first_name ASC"
        ))
        .bind(format!("%{}%", query))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_session(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn validate_session(&self, token: &str) -> PortResult<Uuid> {
        // Expired tokens are indistinguishable from unknown ones.
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM auth_sessions WHERE token = $1 AND expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        row.map(|(user_id,)| user_id).ok_or(PortError::Unauthorized)
    }

    async fn delete_session(&self, token: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
