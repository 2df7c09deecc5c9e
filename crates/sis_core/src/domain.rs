//! crates/sis_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A registered user account, as it travels through the application.
///
/// Never carries the password; credentials only exist on the login path
/// via [`UserCredentials`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    /// Free-form external identifier. Unique when present.
    pub user_id: Option<String>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    /// Stored lowercase; uniqueness is case-insensitive.
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Input for creating a user. All required fields must already be
/// validated non-empty by the caller; the store enforces uniqueness.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: Option<String>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// A partial update to a user.
///
/// Required attributes use `Option<T>`: absent means "leave unchanged".
/// Clearable optional attributes use `Option<Option<T>>` so that an
/// explicitly provided null/empty value (clear) is distinguishable from
/// the key being absent (leave unchanged).
///
/// The password is deliberately not updatable through this path.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub user_id: Option<Option<String>>,
    pub first_name: Option<String>,
    pub middle_name: Option<Option<String>>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// A student record.
#[derive(Debug, Clone)]
pub struct Student {
    pub id: Uuid,
    /// The institutional ID number. Unique across all students.
    pub id_number: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub course: String,
    /// Year level, e.g. "1st Year". The server stores this as an opaque
    /// string; only the client restricts input to the known levels.
    pub year: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub id_number: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub course: String,
    pub year: String,
}

/// A partial update to a student; same absent/set/clear semantics as
/// [`UserUpdate`].
#[derive(Debug, Clone, Default)]
pub struct StudentUpdate {
    pub id_number: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<Option<String>>,
    pub last_name: Option<String>,
    pub course: Option<String>,
    pub year: Option<String>,
}

// Represents a browser login session (auth cookie).
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// The opaque token carried by the cookie.
    pub token: String,
    /// Weak back-reference to the authenticated user.
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
