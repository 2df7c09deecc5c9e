//! services/api/tests/api.rs
//!
//! End-to-end tests over the real router, mounted on the in-memory store
//! adapter. Each test drives plain HTTP requests through `oneshot` and
//! asserts on status codes and JSON bodies, cookie and all.

use api_lib::adapters::memory::MemoryAdapter;
use api_lib::config::Config;
use api_lib::web::{self, state::AppState};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let state = Arc::new(AppState {
        store: Arc::new(MemoryAdapter::new()),
        config: Arc::new(Config::for_tests()),
    });
    web::router(state)
}

/// Sends one request and returns (status, set-cookie if any, parsed body).
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, set_cookie, value)
}

fn register_body(email: &str) -> Value {
    json!({
        "firstName": "A",
        "lastName": "B",
        "email": email,
        "password": "p1",
    })
}

/// Registers and logs in, returning the session cookie.
async fn login_as(app: &Router, email: &str) -> String {
    let (status, _, _) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body(email)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, cookie, _) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "p1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    cookie.expect("login must set the session cookie")
}

fn student_body(id_number: &str, first: &str, last: &str) -> Value {
    json!({
        "idNumber": id_number,
        "firstName": first,
        "lastName": last,
        "course": "CS",
        "year": "1st Year",
    })
}

//=========================================================================================
// Auth flow
//=========================================================================================

#[tokio::test]
async fn register_then_login_authenticates_without_leaking_password() {
    let app = app();

    let (status, _, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("a@x.com")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, cookie, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "p1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let cookie = cookie.unwrap();
    assert!(cookie.starts_with("sid="));
    assert!(body["user"].get("password").is_none());
    assert_eq!(body["user"]["email"], "a@x.com");

    let (status, _, body) = send(&app, "GET", "/api/auth/check", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isLoggedIn"], json!(true));

    let (status, _, body) = send(&app, "GET", "/api/users", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "a@x.com");
    assert!(users[0].get("password").is_none());
}

#[tokio::test]
async fn login_failure_is_uniform_for_unknown_email_and_wrong_password() {
    let app = app();
    let _ = login_as(&app, "known@x.com").await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "known@x.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@x.com", "password": "p1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn login_matches_email_case_insensitively() {
    let app = app();
    let _ = login_as(&app, "Case@X.com").await;

    let (status, _, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "case@x.com", "password": "p1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_email_registration_is_rejected() {
    let app = app();
    let (status, _, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("dup@x.com")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Same address, different case: still a duplicate.
    let (status, _, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("DUP@x.com")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User with this email already exists");
}

#[tokio::test]
async fn registration_requires_the_required_fields() {
    let app = app();
    let (status, _, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "firstName": "",
            "lastName": "B",
            "email": "e@x.com",
            "password": "p1",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("required"));
}

#[tokio::test]
async fn protected_routes_reject_anonymous_requests_uniformly() {
    let app = app();
    for uri in ["/api/users", "/api/users/me", "/api/students"] {
        let (status, _, body) = send(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["message"], "Please log in", "{uri}");
    }

    // A garbage token is rejected with the same body as no token.
    let (status, _, body) = send(
        &app,
        "GET",
        "/api/users",
        Some("sid=not-a-real-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Please log in");
}

#[tokio::test]
async fn logout_invalidates_the_session_and_is_idempotent() {
    let app = app();
    let cookie = login_as(&app, "out@x.com").await;

    let (status, cleared, _) = send(&app, "POST", "/api/auth/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared.as_deref(), Some("sid="));

    let (_, _, body) = send(&app, "GET", "/api/auth/check", Some(&cookie), None).await;
    assert_eq!(body["isLoggedIn"], json!(false));

    let (status, _, body) = send(&app, "GET", "/api/users", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Please log in");

    // Logging out again, with or without the stale cookie, still succeeds.
    let (status, _, _) = send(&app, "POST", "/api/auth/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&app, "POST", "/api/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn check_reports_anonymous_without_a_cookie() {
    let app = app();
    let (status, _, body) = send(&app, "GET", "/api/auth/check", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isLoggedIn"], json!(false));
}

//=========================================================================================
// Users
//=========================================================================================

#[tokio::test]
async fn a_caller_cannot_delete_their_own_account() {
    let app = app();
    let cookie = login_as(&app, "self@x.com").await;

    let (status, _, me) = send(&app, "GET", "/api/users/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let my_id = me["id"].as_str().unwrap().to_string();

    let (status, _, body) = send(
        &app,
        "DELETE",
        &format!("/api/users/{my_id}"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Cannot delete your own account through this endpoint"
    );

    // The session is intact and other accounts can still be deleted.
    let (status, _, body) = send(
        &app,
        "POST",
        "/api/users",
        Some(&cookie),
        Some(register_body("other@x.com")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let other_id = body["user"]["id"].as_str().unwrap().to_string();

    let (status, _, _) = send(
        &app,
        "DELETE",
        &format!("/api/users/{other_id}"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deleting_a_missing_record_is_not_found() {
    let app = app();
    let cookie = login_as(&app, "del@x.com").await;
    let ghost = uuid::Uuid::new_v4();

    let (status, _, _) = send(
        &app,
        "DELETE",
        &format!("/api/users/{ghost}"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(
        &app,
        "DELETE",
        &format!("/api/students/{ghost}"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn changing_an_email_to_an_existing_one_is_rejected() {
    let app = app();
    let cookie = login_as(&app, "first@x.com").await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/users",
        Some(&cookie),
        Some(register_body("second@x.com")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let second_id = body["user"]["id"].as_str().unwrap().to_string();

    let (status, _, body) = send(
        &app,
        "PUT",
        &format!("/api/users/{second_id}"),
        Some(&cookie),
        Some(json!({ "email": "first@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User with this email already exists");

    // Re-submitting a user's own email is not a collision.
    let (status, _, _) = send(
        &app,
        "PUT",
        &format!("/api/users/{second_id}"),
        Some(&cookie),
        Some(json!({ "email": "second@x.com", "firstName": "Renamed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn profile_update_targets_the_session_identity() {
    let app = app();
    let cookie = login_as(&app, "prof@x.com").await;

    let (status, _, body) = send(
        &app,
        "PUT",
        "/api/users/profile",
        Some(&cookie),
        Some(json!({ "firstName": "Updated" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Profile updated");
    assert_eq!(body["user"]["firstName"], "Updated");

    let (_, _, me) = send(&app, "GET", "/api/users/me", Some(&cookie), None).await;
    assert_eq!(me["firstName"], "Updated");
    assert_eq!(me["lastName"], "B");
}

//=========================================================================================
// Students
//=========================================================================================

#[tokio::test]
async fn duplicate_id_number_is_rejected() {
    let app = app();
    let cookie = login_as(&app, "s@x.com").await;

    let (status, _, _) = send(
        &app,
        "POST",
        "/api/students",
        Some(&cookie),
        Some(student_body("S1", "J", "Doe")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/students",
        Some(&cookie),
        Some(student_body("S1", "K", "Roe")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Student with this ID number already exists");
}

#[tokio::test]
async fn students_list_sorts_by_last_then_first_name() {
    let app = app();
    let cookie = login_as(&app, "sorted@x.com").await;

    for (id_number, first, last) in [
        ("S1", "Zed", "Adams"),
        ("S2", "Ann", "Baker"),
        ("S3", "Bob", "Adams"),
    ] {
        let (status, _, _) = send(
            &app,
            "POST",
            "/api/students",
            Some(&cookie),
            Some(student_body(id_number, first, last)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _, body) = send(&app, "GET", "/api/students", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<(String, String)> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            (
                s["lastName"].as_str().unwrap().to_string(),
                s["firstName"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        names,
        vec![
            ("Adams".to_string(), "Bob".to_string()),
            ("Adams".to_string(), "Zed".to_string()),
            ("Baker".to_string(), "Ann".to_string()),
        ]
    );
}

#[tokio::test]
async fn partial_update_merges_and_explicit_empty_clears() {
    let app = app();
    let cookie = login_as(&app, "patch@x.com").await;

    let mut create = student_body("S9", "J", "Doe");
    create["middleName"] = json!("Quincy");
    let (status, _, body) = send(&app, "POST", "/api/students", Some(&cookie), Some(create)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["student"]["id"].as_str().unwrap().to_string();

    // Fields absent from the payload are untouched.
    let (status, _, body) = send(
        &app,
        "PUT",
        &format!("/api/students/{id}"),
        Some(&cookie),
        Some(json!({ "course": "Math" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["student"]["course"], "Math");
    assert_eq!(body["student"]["middleName"], "Quincy");
    assert_eq!(body["student"]["year"], "1st Year");

    // An explicit empty string clears the optional field.
    let (status, _, body) = send(
        &app,
        "PUT",
        &format!("/api/students/{id}"),
        Some(&cookie),
        Some(json!({ "middleName": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["student"].get("middleName").is_none());
    assert_eq!(body["student"]["course"], "Math");
}

#[tokio::test]
async fn student_read_and_search() {
    let app = app();
    let cookie = login_as(&app, "find@x.com").await;

    let (_, _, body) = send(
        &app,
        "POST",
        "/api/students",
        Some(&cookie),
        Some(student_body("S100", "Jane", "Doe")),
    )
    .await;
    let id = body["student"]["id"].as_str().unwrap().to_string();
    let (_, _, _) = send(
        &app,
        "POST",
        "/api/students",
        Some(&cookie),
        Some(student_body("S200", "Rob", "Smith")),
    )
    .await;

    let (status, _, body) = send(
        &app,
        "GET",
        &format!("/api/students/{id}"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["idNumber"], "S100");

    let (status, _, body) = send(
        &app,
        "GET",
        "/api/students/search/doe",
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let matches = body.as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["lastName"], "Doe");
}

#[tokio::test]
async fn student_creation_validates_required_fields() {
    let app = app();
    let cookie = login_as(&app, "v@x.com").await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/students",
        Some(&cookie),
        Some(json!({
            "idNumber": "S1",
            "firstName": "J",
            "lastName": "Doe",
            "course": "",
            "year": "1st Year",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("required"));
}
