//! Registration, login and admin user endpoint tests, driven by calling the
//! handlers directly with their extractors.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use std::time::Duration;

use noteboard::error::AppError;
use noteboard::security;
use noteboard::server::auth::{self, LoginPayload, SignupPayload};
use noteboard::server::users::{self, AdminUserPayload, UserUpdatePayload};
use noteboard::server::AppState;
use noteboard::store::SharedStore;

fn state() -> AppState {
    AppState::new(SharedStore::new(), Duration::from_secs(3600))
}

fn state_with_admin() -> AppState {
    let state = state();
    security::ensure_default_admin(&state.store, "Adm1n!pass").unwrap();
    state
}

async fn login(state: &AppState, email: &str, password: &str) -> String {
    let payload = LoginPayload { email: Some(email.into()), password: Some(password.into()) };
    let (status, Json(body)) = auth::login(State(state.clone()), Json(payload)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("authorization", format!("Bearer {}", token).parse().unwrap());
    headers
}

fn signup_payload(email: &str, username: &str, password: &str) -> SignupPayload {
    SignupPayload {
        email: Some(email.into()),
        username: Some(username.into()),
        password: Some(password.into()),
    }
}

fn field_messages(err: AppError, field: &str) -> Vec<String> {
    match err {
        AppError::Validation { errors } => errors
            .into_iter()
            .filter(|e| e.field == field)
            .map(|e| e.message)
            .collect(),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn signup_creates_a_role_less_user() {
    let state = state();
    let (status, Json(body)) = auth::signup(
        State(state.clone()),
        Json(signup_payload("alice@example.com", "alice", "Valid123!")),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["user"]["role"].is_null());
    assert!(body["user"].get("password_hash").is_none());

    let stored = state.store.user_by_email("alice@example.com").unwrap();
    assert!(stored.is_active);
    assert!(stored.role.is_none());
}

#[tokio::test]
async fn duplicate_signup_is_rejected_per_field_and_persists_nothing() {
    let state = state();
    auth::signup(
        State(state.clone()),
        Json(signup_payload("alice@example.com", "alice", "Valid123!")),
    )
    .await
    .unwrap();

    let err = auth::signup(
        State(state.clone()),
        Json(signup_payload("alice@example.com", "alice2", "Valid123!")),
    )
    .await
    .unwrap_err();
    assert_eq!(
        field_messages(err, "email"),
        vec!["This email is not available. Please try another."]
    );

    let err = auth::signup(
        State(state.clone()),
        Json(signup_payload("other@example.com", "alice", "Valid123!")),
    )
    .await
    .unwrap_err();
    assert_eq!(
        field_messages(err, "username"),
        vec!["This username is not available. Please try another."]
    );

    // Nothing partial was written on either failure.
    assert_eq!(state.store.user_count(), 1);
}

#[tokio::test]
async fn signup_rejects_weak_passwords_with_first_violation_only() {
    let state = state();
    for (password, message) in [
        ("short1A", "Create a password at least 8 characters."),
        ("alllowercase1!", "Create a password with at least one uppercase letter"),
        ("NoSpecial123", "Create a password with at least one special character."),
    ] {
        let err = auth::signup(
            State(state.clone()),
            Json(signup_payload("p@example.com", "pwuser", password)),
        )
        .await
        .unwrap_err();
        assert_eq!(field_messages(err, "password"), vec![message], "password: {}", password);
    }
    assert_eq!(state.store.user_count(), 0);
}

#[tokio::test]
async fn signup_accumulates_errors_across_fields() {
    let state = state();
    let err = auth::signup(
        State(state.clone()),
        Json(SignupPayload { email: None, username: None, password: None }),
    )
    .await
    .unwrap_err();
    match err {
        AppError::Validation { errors } => {
            let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, vec!["email", "username", "password"]);
            assert_eq!(errors[0].message, "Email field is required.");
            assert_eq!(errors[1].message, "Username field is required.");
            assert_eq!(errors[2].message, "Password field is required.");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn login_returns_token_and_rejects_bad_credentials() {
    let state = state();
    auth::signup(
        State(state.clone()),
        Json(signup_payload("alice@example.com", "alice", "Valid123!")),
    )
    .await
    .unwrap();

    let token = login(&state, "alice@example.com", "Valid123!").await;
    assert!(!token.is_empty());

    let err = auth::login(
        State(state.clone()),
        Json(LoginPayload { email: Some("alice@example.com".into()), password: Some("wrong".into()) }),
    )
    .await
    .unwrap_err();
    assert_eq!(
        field_messages(err, "non_field_errors"),
        vec!["A user with this email and password was not found."]
    );

    let err = auth::login(
        State(state.clone()),
        Json(LoginPayload { email: None, password: Some("Valid123!".into()) }),
    )
    .await
    .unwrap_err();
    assert_eq!(
        field_messages(err, "non_field_errors"),
        vec!["An email address is required to log in."]
    );
}

#[tokio::test]
async fn deactivated_user_cannot_log_in() {
    let state = state();
    auth::signup(
        State(state.clone()),
        Json(signup_payload("alice@example.com", "alice", "Valid123!")),
    )
    .await
    .unwrap();
    let user = state.store.user_by_email("alice@example.com").unwrap();
    state
        .store
        .update_user(user.id, noteboard::store::UserPatch { is_active: Some(false), ..Default::default() })
        .unwrap();

    let err = auth::login(
        State(state.clone()),
        Json(LoginPayload { email: Some("alice@example.com".into()), password: Some("Valid123!".into()) }),
    )
    .await
    .unwrap_err();
    assert_eq!(field_messages(err, "non_field_errors"), vec!["This user has been deactivated."]);
}

#[tokio::test]
async fn logout_revokes_the_session_token() {
    let state = state_with_admin();
    let token = login(&state, "admin@noteboard.local", "Adm1n!pass").await;
    assert!(state.sessions.validate(&token).is_some());

    let (status, _) = auth::logout(State(state.clone()), bearer(&token)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(state.sessions.validate(&token).is_none());
}

#[tokio::test]
async fn admin_creates_a_user_with_an_assigned_role() {
    let state = state_with_admin();
    let token = login(&state, "admin@noteboard.local", "Adm1n!pass").await;

    let (status, Json(body)) = users::create_user(
        State(state.clone()),
        bearer(&token),
        Json(AdminUserPayload {
            email: Some("mod@example.com".into()),
            username: Some("mod".into()),
            password: Some("Valid123!".into()),
            role: Some("moderator".into()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "moderator");
}

#[tokio::test]
async fn admin_user_creation_rejects_unknown_roles() {
    let state = state_with_admin();
    let token = login(&state, "admin@noteboard.local", "Adm1n!pass").await;

    let err = users::create_user(
        State(state.clone()),
        bearer(&token),
        Json(AdminUserPayload {
            email: Some("x@example.com".into()),
            username: Some("x".into()),
            password: Some("Valid123!".into()),
            role: Some("superuser".into()),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(field_messages(err, "role"), vec!["superuser is not a valid role."]);
}

#[tokio::test]
async fn admin_updates_user_fields_through_the_whitelist() {
    let state = state_with_admin();
    let token = login(&state, "admin@noteboard.local", "Adm1n!pass").await;
    auth::signup(
        State(state.clone()),
        Json(signup_payload("alice@example.com", "alice", "Valid123!")),
    )
    .await
    .unwrap();
    let user = state.store.user_by_email("alice@example.com").unwrap();

    let (status, Json(body)) = users::update_user(
        State(state.clone()),
        bearer(&token),
        Path(user.id),
        Json(UserUpdatePayload {
            email: None,
            // Empty string counts as absent, not as clearing the field.
            username: Some(String::new()),
            password: None,
            role: Some("guest".into()),
            is_active: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "guest");
}

#[tokio::test]
async fn update_of_missing_user_is_404() {
    let state = state_with_admin();
    let token = login(&state, "admin@noteboard.local", "Adm1n!pass").await;
    let err = users::update_user(
        State(state.clone()),
        bearer(&token),
        Path(uuid::Uuid::new_v4()),
        Json(UserUpdatePayload {
            email: None,
            username: None,
            password: None,
            role: None,
            is_active: None,
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.http_status(), 404);
}
