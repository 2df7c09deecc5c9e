//! crates/sis_client/src/lib.rs
//!
//! A thin, typed HTTP client for the student information API. It exists to
//! pin down the wire contract front ends rely on: JSON bodies in camelCase,
//! state carried by the `sid` session cookie (handled transparently by the
//! underlying cookie store), and every error surfaced as a `{message}` body.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

pub mod types;

pub use types::*;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with an error status; `message` is the body the
    /// UI surfaces verbatim.
    #[error("{message}")]
    Api { status: u16, message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// A cookie-holding client bound to one API base URL.
///
/// Cloning is cheap and shares the session.
#[derive(Clone)]
pub struct SisClient {
    http: reqwest::Client,
    base_url: String,
}

impl SisClient {
    /// Creates a client for e.g. `http://localhost:5000/api`.
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn expect_json<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        #[derive(Deserialize)]
        struct ErrorBody {
            message: String,
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|b| b.message)
            .unwrap_or_else(|_| status.to_string());
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        Self::expect_json(self.http.get(self.url(path)).send().await?).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> ClientResult<T> {
        Self::expect_json(self.http.post(self.url(path)).json(body).send().await?).await
    }

    async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> ClientResult<T> {
        Self::expect_json(self.http.put(self.url(path)).json(body).send().await?).await
    }

    async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        Self::expect_json(self.http.delete(self.url(path)).send().await?).await
    }

    // --- Auth ---

    pub async fn register(&self, payload: &RegisterPayload) -> ClientResult<MessageResponse> {
        self.post_json("/auth/register", payload).await
    }

    /// On success the session cookie is stored and sent on later calls.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<LoginResponse> {
        self.post_json("/auth/login", &serde_json::json!({ "email": email, "password": password }))
            .await
    }

    pub async fn logout(&self) -> ClientResult<MessageResponse> {
        self.post_json("/auth/logout", &serde_json::json!({})).await
    }

    pub async fn check_auth(&self) -> ClientResult<CheckResponse> {
        self.get_json("/auth/check").await
    }

    // --- Users ---

    pub async fn get_all_users(&self) -> ClientResult<Vec<UserDto>> {
        self.get_json("/users").await
    }

    pub async fn get_current_user(&self) -> ClientResult<UserDto> {
        self.get_json("/users/me").await
    }

    pub async fn get_user_by_id(&self, id: Uuid) -> ClientResult<UserDto> {
        self.get_json(&format!("/users/{id}")).await
    }

    pub async fn create_user(&self, payload: &RegisterPayload) -> ClientResult<UserEnvelope> {
        self.post_json("/users", payload).await
    }

    pub async fn update_user(&self, id: Uuid, patch: &UserPatch) -> ClientResult<UserEnvelope> {
        self.put_json(&format!("/users/{id}"), patch).await
    }

    pub async fn update_profile(&self, patch: &UserPatch) -> ClientResult<UserEnvelope> {
        self.put_json("/users/profile", patch).await
    }

    pub async fn delete_user(&self, id: Uuid) -> ClientResult<MessageResponse> {
        self.delete_json(&format!("/users/{id}")).await
    }

    // --- Students ---

    pub async fn get_all_students(&self) -> ClientResult<Vec<StudentDto>> {
        self.get_json("/students").await
    }

    pub async fn get_student_by_id(&self, id: Uuid) -> ClientResult<StudentDto> {
        self.get_json(&format!("/students/{id}")).await
    }

    pub async fn create_student(&self, payload: &StudentPayload) -> ClientResult<StudentEnvelope> {
        self.post_json("/students", payload).await
    }

    pub async fn update_student(
        &self,
        id: Uuid,
        patch: &StudentPatch,
    ) -> ClientResult<StudentEnvelope> {
        self.put_json(&format!("/students/{id}"), patch).await
    }

    pub async fn delete_student(&self, id: Uuid) -> ClientResult<MessageResponse> {
        self.delete_json(&format!("/students/{id}")).await
    }

    pub async fn search_students(&self, query: &str) -> ClientResult<Vec<StudentDto>> {
        self.get_json(&format!("/students/search/{query}")).await
    }
}
