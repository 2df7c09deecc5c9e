//! services/api/src/adapters/memory.rs
//!
//! An in-memory implementation of the `RegistryStore` port, used by the
//! integration tests and handy for running the service without Postgres.
//!
//! A single mutex guards all collections, so every check-and-insert happens
//! under one lock hold and racing creates on the same unique key resolve to
//! exactly one winner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sis_core::domain::{
    AuthSession, NewStudent, NewUser, Student, StudentUpdate, User, UserCredentials, UserUpdate,
};
use sis_core::ports::{PortError, PortResult, RegistryStore};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Clone)]
struct StoredUser {
    user: User,
    password: String,
}

#[derive(Default)]
struct Inner {
    users: Vec<StoredUser>,
    students: HashMap<Uuid, Student>,
    sessions: HashMap<String, AuthSession>,
}

#[derive(Default)]
pub struct MemoryAdapter {
    inner: Mutex<Inner>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate_email() -> PortError {
    PortError::Duplicate("User with this email already exists".to_string())
}

#[async_trait]
impl RegistryStore for MemoryAdapter {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let mut inner = self.inner.lock().unwrap();
        let email = new_user.email.to_lowercase();
        if inner.users.iter().any(|s| s.user.email == email) {
            return Err(duplicate_email());
        }
        if let Some(ref uid) = new_user.user_id {
            if inner.users.iter().any(|s| s.user.user_id.as_ref() == Some(uid)) {
                return Err(PortError::Duplicate("User ID already in use".to_string()));
            }
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            user_id: new_user.user_id,
            first_name: new_user.first_name,
            middle_name: new_user.middle_name,
            last_name: new_user.last_name,
            email,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(StoredUser {
            user: user.clone(),
            password: new_user.password,
        });
        Ok(user)
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().map(|s| s.user.clone()).collect())
    }

    async fn get_user(&self, id: Uuid) -> PortResult<User> {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .iter()
            .find(|s| s.user.id == id)
            .map(|s| s.user.clone())
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>> {
        let inner = self.inner.lock().unwrap();
        let email = email.to_lowercase();
        Ok(inner.users.iter().find(|s| s.user.email == email).map(|s| {
            UserCredentials {
                id: s.user.id,
                user_id: s.user.user_id.clone(),
                first_name: s.user.first_name.clone(),
                last_name: s.user.last_name.clone(),
                email: s.user.email.clone(),
                password: s.password.clone(),
            }
        }))
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> PortResult<User> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.users.iter().any(|s| s.user.id == id) {
            return Err(PortError::NotFound("User not found".to_string()));
        }

        if let Some(ref email) = update.email {
            let email = email.to_lowercase();
            if inner
                .users
                .iter()
                .any(|s| s.user.id != id && s.user.email == email)
            {
                return Err(duplicate_email());
            }
        }
        if let Some(Some(ref uid)) = update.user_id {
            if inner
                .users
                .iter()
                .any(|s| s.user.id != id && s.user.user_id.as_ref() == Some(uid))
            {
                return Err(PortError::Duplicate("User ID already in use".to_string()));
            }
        }

        let stored = inner
            .users
            .iter_mut()
            .find(|s| s.user.id == id)
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))?;

        if let Some(value) = update.user_id {
            stored.user.user_id = value;
        }
        if let Some(value) = update.first_name {
            stored.user.first_name = value;
        }
        if let Some(value) = update.middle_name {
            stored.user.middle_name = value;
        }
        if let Some(value) = update.last_name {
            stored.user.last_name = value;
        }
        if let Some(value) = update.email {
            stored.user.email = value.to_lowercase();
        }
        stored.user.updated_at = Utc::now();
        Ok(stored.user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.users.len();
        inner.users.retain(|s| s.user.id != id);
        if inner.users.len() == before {
            return Err(PortError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn create_student(&self, new_student: NewStudent) -> PortResult<Student> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .students
            .values()
            .any(|s| s.id_number == new_student.id_number)
        {
            return Err(PortError::Duplicate(
                "Student with this ID number already exists".to_string(),
            ));
        }
        let now = Utc::now();
        let student = Student {
            id: Uuid::new_v4(),
            id_number: new_student.id_number,
            first_name: new_student.first_name,
            middle_name: new_student.middle_name,
            last_name: new_student.last_name,
            course: new_student.course,
            year: new_student.year,
            created_at: now,
            updated_at: now,
        };
        inner.students.insert(student.id, student.clone());
        Ok(student)
    }

    async fn list_students(&self) -> PortResult<Vec<Student>> {
        let inner = self.inner.lock().unwrap();
        let mut students: Vec<Student> = inner.students.values().cloned().collect();
        students.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        Ok(students)
    }

    async fn get_student(&self, id: Uuid) -> PortResult<Student> {
        let inner = self.inner.lock().unwrap();
        inner
            .students
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Student not found".to_string()))
    }

    async fn update_student(&self, id: Uuid, update: StudentUpdate) -> PortResult<Student> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.students.contains_key(&id) {
            return Err(PortError::NotFound("Student not found".to_string()));
        }

        if let Some(ref id_number) = update.id_number {
            if inner
                .students
                .values()
                .any(|s| s.id != id && &s.id_number == id_number)
            {
                return Err(PortError::Duplicate(
                    "Student with this ID number already exists".to_string(),
                ));
            }
        }

        let student = inner
            .students
            .get_mut(&id)
            .ok_or_else(|| PortError::NotFound("Student not found".to_string()))?;

        if let Some(value) = update.id_number {
            student.id_number = value;
        }
        if let Some(value) = update.first_name {
            student.first_name = value;
        }
        if let Some(value) = update.middle_name {
            student.middle_name = value;
        }
        if let Some(value) = update.last_name {
            student.last_name = value;
        }
        if let Some(value) = update.course {
            student.course = value;
        }
        if let Some(value) = update.year {
            student.year = value;
        }
        student.updated_at = Utc::now();
        Ok(student.clone())
    }

    async fn delete_student(&self, id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .students
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound("Student not found".to_string()))
    }

    async fn search_students(&self, query: &str) -> PortResult<Vec<Student>> {
        let query = query.to_lowercase();
        let mut students: Vec<Student> = {
            let inner = self.inner.lock().unwrap();
            inner
                .students
                .values()
                .filter(|s| {
                    s.id_number.to_lowercase().contains(&query)
                        || s.first_name.to_lowercase().contains(&query)
                        || s.last_name.to_lowercase().contains(&query)
                })
                .cloned()
                .collect()
        };
        students.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        Ok(students)
    }

    async fn create_session(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.insert(
            token.to_string(),
            AuthSession {
                token: token.to_string(),
                user_id,
                created_at: Utc::now(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_session(&self, token: &str) -> PortResult<Uuid> {
        let inner = self.inner.lock().unwrap();
        match inner.sessions.get(token) {
            Some(session) if session.expires_at > Utc::now() => Ok(session.user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_session(&self, token: &str) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            user_id: None,
            first_name: "A".to_string(),
            middle_name: None,
            last_name: "B".to_string(),
            email: email.to_string(),
            password: "p1".to_string(),
        }
    }

    fn new_student(id_number: &str) -> NewStudent {
        NewStudent {
            id_number: id_number.to_string(),
            first_name: "J".to_string(),
            middle_name: None,
            last_name: "Doe".to_string(),
            course: "CS".to_string(),
            year: "1st Year".to_string(),
        }
    }

    #[tokio::test]
    async fn racing_creates_on_same_email_yield_one_duplicate() {
        let store = Arc::new(MemoryAdapter::new());
        let a = tokio::spawn({
            let store = store.clone();
            async move { store.create_user(new_user("race@x.com")).await }
        });
        let b = tokio::spawn({
            let store = store.clone();
            async move { store.create_user(new_user("race@x.com")).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let dups = results
            .iter()
            .filter(|r| matches!(r, Err(PortError::Duplicate(_))))
            .count();
        assert_eq!((wins, dups), (1, 1));
    }

    #[tokio::test]
    async fn racing_creates_on_same_id_number_yield_one_duplicate() {
        let store = Arc::new(MemoryAdapter::new());
        let a = tokio::spawn({
            let store = store.clone();
            async move { store.create_student(new_student("S1")).await }
        });
        let b = tokio::spawn({
            let store = store.clone();
            async move { store.create_student(new_student("S1")).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn email_lookup_is_case_insensitive() {
        let store = MemoryAdapter::new();
        store.create_user(new_user("Mixed@Case.Com")).await.unwrap();
        let creds = store.find_user_by_email("mixed@case.com").await.unwrap();
        assert!(creds.is_some());
        assert_eq!(creds.unwrap().email, "mixed@case.com");
    }

    #[tokio::test]
    async fn expired_session_does_not_validate() {
        let store = MemoryAdapter::new();
        let user = store.create_user(new_user("s@x.com")).await.unwrap();
        store
            .create_session("tok", user.id, Utc::now() - Duration::hours(1))
            .await
            .unwrap();
        assert!(matches!(
            store.validate_session("tok").await,
            Err(PortError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn delete_session_is_idempotent() {
        let store = MemoryAdapter::new();
        store.delete_session("never-existed").await.unwrap();
        store.delete_session("never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn update_clears_middle_name_only_when_explicit() {
        let store = MemoryAdapter::new();
        let mut input = new_student("S2");
        input.middle_name = Some("Q".to_string());
        let student = store.create_student(input).await.unwrap();

        // Absent field: untouched.
        let updated = store
            .update_student(
                student.id,
                StudentUpdate {
                    course: Some("Math".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.middle_name.as_deref(), Some("Q"));

        // Explicit clear.
        let updated = store
            .update_student(
                student.id,
                StudentUpdate {
                    middle_name: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.middle_name, None);
    }
}
