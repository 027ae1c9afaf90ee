//! Admin-side user endpoints: create a user with an assigned role
//! (`can_assign_role`) and update user fields including the role
//! (`can_update_user`). Updates go through an explicit field whitelist.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::identity::gate::tags;
use crate::identity::requiring;
use crate::model::UserRepr;
use crate::security;
use crate::server::auth::duplicate_as_field_error;
use crate::server::AppState;
use crate::store::UserPatch;
use crate::validate::{check_email, check_password, check_role, check_username, FieldErrors};

#[derive(Debug, Deserialize)]
pub struct AdminUserPayload {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserUpdatePayload {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AdminUserPayload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    requiring(tags::CAN_ASSIGN_ROLE).admit(&state.store, &state.sessions, &headers)?;

    let email = payload.email.unwrap_or_default();
    let username = payload.username.unwrap_or_default();
    let password = payload.password.unwrap_or_default();
    let role = payload.role.unwrap_or_default();

    let mut errs = FieldErrors::new();

    let before = errs.len();
    check_email(&mut errs, &email);
    if errs.len() == before && state.store.email_taken(&email) {
        errs.push("email", "This email is not available. Please try another.");
    }

    let before = errs.len();
    check_username(&mut errs, &username);
    if errs.len() == before && state.store.username_taken(&username) {
        errs.push("username", "This username is not available. Please try another.");
    }

    check_password(&mut errs, &password);

    let role_name = if role.is_empty() {
        errs.push("role", "Role field is required.");
        None
    } else {
        check_role(&mut errs, &role)
    };
    errs.finish()?;

    let hash = security::hash_password(&password)?;
    let user = state
        .store
        .create_user(&email, &username, &hash, role_name)
        .map_err(duplicate_as_field_error)?;
    info!("user.create id={} username={} role={}", user.id, user.username, role);

    Ok((StatusCode::CREATED, Json(json!(UserRepr::from(&user)))))
}

pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdatePayload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    requiring(tags::CAN_UPDATE_USER).admit(&state.store, &state.sessions, &headers)?;

    state
        .store
        .user_by_id(id)
        .ok_or_else(|| AppError::not_found("not_found".to_string(), format!("User with id {} does not exist.", id)))?;

    let mut errs = FieldErrors::new();
    let mut patch = UserPatch::default();

    // Empty-string fields count as absent; only provided fields are validated
    // and applied.
    if let Some(email) = payload.email.filter(|v| !v.is_empty()) {
        let before = errs.len();
        check_email(&mut errs, &email);
        // The availability scan does not exempt the user being updated; a
        // user cannot "re-take" their own email through this endpoint.
        if errs.len() == before && state.store.email_taken(&email) {
            errs.push("email", "This email is not available. Please try another.");
        }
        patch.email = Some(email);
    }
    if let Some(username) = payload.username.filter(|v| !v.is_empty()) {
        let before = errs.len();
        check_username(&mut errs, &username);
        if errs.len() == before && state.store.username_taken(&username) {
            errs.push("username", "This username is not available. Please try another.");
        }
        patch.username = Some(username);
    }
    if let Some(password) = payload.password.filter(|v| !v.is_empty()) {
        check_password(&mut errs, &password);
        if errs.is_empty() {
            patch.password_hash = Some(security::hash_password(&password)?);
        }
    }
    if let Some(role) = payload.role.filter(|v| !v.is_empty()) {
        patch.role = check_role(&mut errs, &role);
    }
    patch.is_active = payload.is_active;
    errs.finish()?;

    let user = state.store.update_user(id, patch).map_err(duplicate_as_field_error)?;
    if payload.is_active == Some(false) {
        let revoked = state.sessions.revoke_user(&id.to_string());
        info!("user.deactivate id={} sessions_revoked={}", id, revoked);
    }

    Ok((StatusCode::OK, Json(json!(UserRepr::from(&user)))))
}
