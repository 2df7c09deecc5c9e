//! crates/sis_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like databases.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    NewStudent, NewUser, Student, StudentUpdate, User, UserCredentials, UserUpdate,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A write would violate a unique-key invariant (email, userId, idNumber).
    #[error("{0}")]
    Duplicate(String),
    /// A required field is missing or a disallowed operation was requested.
    #[error("{0}")]
    Validation(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Port
//=========================================================================================

/// The storage contract for users, students, and auth sessions.
///
/// Implementations must make each unique-key check-and-insert a single
/// conditional write: two racing creates on the same key resolve to exactly
/// one success and one [`PortError::Duplicate`].
#[async_trait]
pub trait RegistryStore: Send + Sync {
    // --- Users ---
    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;

    /// Unspecified stable order (store order).
    async fn list_users(&self) -> PortResult<Vec<User>>;

    async fn get_user(&self, id: Uuid) -> PortResult<User>;

    /// Case-insensitive lookup; returns the credentials record for the
    /// login path, or `None` when no such user exists.
    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>>;

    /// Partial merge per [`UserUpdate`]; refreshes `updated_at`. An email
    /// change is re-checked for uniqueness as part of the same write.
    async fn update_user(&self, id: Uuid, update: UserUpdate) -> PortResult<User>;

    async fn delete_user(&self, id: Uuid) -> PortResult<()>;

    // --- Students ---
    async fn create_student(&self, new_student: NewStudent) -> PortResult<Student>;

    /// Sorted ascending by (last name, first name).
    async fn list_students(&self) -> PortResult<Vec<Student>>;

    async fn get_student(&self, id: Uuid) -> PortResult<Student>;

    async fn update_student(&self, id: Uuid, update: StudentUpdate) -> PortResult<Student>;

    async fn delete_student(&self, id: Uuid) -> PortResult<()>;

    /// Case-insensitive substring match over idNumber, firstName, lastName.
    async fn search_students(&self, query: &str) -> PortResult<Vec<Student>>;

    // --- Auth sessions ---
    async fn create_session(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a token to the authenticated user id. Fails with
    /// [`PortError::Unauthorized`] for unknown and expired tokens alike.
    async fn validate_session(&self, token: &str) -> PortResult<Uuid>;

    /// Idempotent; deleting an absent session is not an error.
    async fn delete_session(&self, token: &str) -> PortResult<()>;
}
