//! Registration, login and logout endpoints. All three are open; logout only
//! revokes whatever token the request presents.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::identity::gate::bearer_token;
use crate::identity::Principal;
use crate::model::UserRepr;
use crate::security;
use crate::server::AppState;
use crate::store::StoreError;
use crate::validate::{check_email, check_password, check_username, FieldErrors};

#[derive(Debug, Deserialize)]
pub struct SignupPayload {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Map a store-level duplicate (the constraint backstop) onto the same
/// field message the validators produce.
pub(crate) fn duplicate_as_field_error(err: StoreError) -> AppError {
    match err {
        StoreError::Duplicate { field: "email", .. } => AppError::field(
            "email",
            "This email is not available. Please try another.",
        ),
        StoreError::Duplicate { field: "username", .. } => AppError::field(
            "username",
            "This username is not available. Please try another.",
        ),
        other => other.into(),
    }
}

/// Shared registration validation: presence/format/length for each field plus
/// cross-record uniqueness against the store. All failing fields accumulate.
fn validate_new_user(state: &AppState, email: &str, username: &str, password: &str) -> AppResult<()> {
    let mut errs = FieldErrors::new();

    let before = errs.len();
    check_email(&mut errs, email);
    if errs.len() == before && state.store.email_taken(email) {
        errs.push("email", "This email is not available. Please try another.");
    }

    let before = errs.len();
    check_username(&mut errs, username);
    if errs.len() == before && state.store.username_taken(username) {
        errs.push("username", "This username is not available. Please try another.");
    }

    check_password(&mut errs, password);
    errs.finish()
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupPayload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let email = payload.email.unwrap_or_default();
    let username = payload.username.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    validate_new_user(&state, &email, &username, &password)?;

    let hash = security::hash_password(&password)?;
    // Self-registered users start role-less; an admin assigns a role later.
    let user = state
        .store
        .create_user(&email, &username, &hash, None)
        .map_err(duplicate_as_field_error)?;
    info!("user.signup id={} username={}", user.id, user.username);

    Ok((StatusCode::CREATED, Json(json!({ "user": UserRepr::from(&user) }))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let Some(email) = payload.email else {
        return Err(AppError::field("non_field_errors", "An email address is required to log in."));
    };
    let Some(password) = payload.password else {
        return Err(AppError::field("non_field_errors", "A password is required to log in."));
    };

    let Some(user) = security::authenticate(&state.store, &email, &password) else {
        return Err(AppError::field(
            "non_field_errors",
            "A user with this email and password was not found.",
        ));
    };
    if !user.is_active {
        return Err(AppError::field("non_field_errors", "This user has been deactivated."));
    }

    let principal = Principal {
        user_id: user.id,
        email: user.email.clone(),
        username: user.username.clone(),
    };
    let session = state.sessions.issue(principal);
    info!("user.login id={} sid={}", user.id, session.session_id);

    Ok((
        StatusCode::OK,
        Json(json!({
            "email": user.email,
            "username": user.username,
            "token": session.token,
        })),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<(StatusCode, Json<Value>)> {
    let Some(token) = bearer_token(&headers) else {
        return Err(AppError::auth(
            "not_authenticated",
            "Authentication credentials were not provided.",
        ));
    };
    state.sessions.logout(&token);
    Ok((StatusCode::OK, Json(json!({ "status": "ok" }))))
}
