//! Role and permission endpoints. Role creation/listing/update are gated by
//! `can_create_role`; permission creation/update by `can_create_permission`.
//! Permission names are validated for system-wide uniqueness before any write.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::identity::gate::tags;
use crate::identity::requiring;
use crate::model::{Permission, PermissionRepr, Role, RoleRepr};
use crate::server::{AppState, PageParams};
use crate::store::SharedStore;
use crate::validate::{check_role, FieldErrors};

#[derive(Debug, Deserialize)]
pub struct RolePayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdatePayload {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PermissionsPayload {
    #[serde(default)]
    pub name: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct PermissionUpdatePayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

fn permission_repr(store: &SharedStore, perm: &Permission) -> AppResult<PermissionRepr> {
    let role = store
        .role_by_id(perm.role_id)
        .ok_or_else(|| AppError::internal("internal", "permission has no owning role"))?;
    Ok(PermissionRepr { id: perm.id, name: perm.name.clone(), role: role.name })
}

fn role_repr(store: &SharedStore, role: &Role, active_only: bool) -> RoleRepr {
    let permissions = store
        .permissions_for_role(role.id)
        .into_iter()
        .filter(|p| !active_only || p.active)
        .map(|p| PermissionRepr { id: p.id, name: p.name, role: role.name })
        .collect();
    RoleRepr { id: role.id, name: role.name, permissions }
}

fn check_permission_names(store: &SharedStore, errs: &mut FieldErrors, names: &[String]) {
    for (i, name) in names.iter().enumerate() {
        if name.is_empty() {
            errs.push("permissions".to_string(), "Permission names must not be empty.".to_string());
        } else if names[..i].contains(name) || store.permission_name_taken(name) {
            // Uniqueness is system-wide, not per role, and covers the payload
            // itself: a name repeated in one request is just as taken.
            errs.push("permissions".to_string(), format!("{} is not unique.", name));
        }
    }
}

pub async fn create_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RolePayload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    requiring(tags::CAN_CREATE_ROLE).admit(&state.store, &state.sessions, &headers)?;

    let mut errs = FieldErrors::new();
    let name = payload.name.unwrap_or_default();
    let role_name = if name.is_empty() {
        errs.push("name", "Name field is required.");
        None
    } else {
        let parsed = check_role(&mut errs, &name);
        if let Some(parsed) = parsed {
            if state.store.role_by_name(parsed).is_some() {
                errs.push("name", "This field must be unique.");
            }
        }
        parsed
    };

    if payload.permissions.is_none() {
        errs.push("permissions", "Permissions field is required.");
    }
    let permissions = payload.permissions.unwrap_or_default();
    check_permission_names(&state.store, &mut errs, &permissions);
    errs.finish()?;

    let role_name = role_name.expect("validated above");
    // Role and permissions go in as one atomic store step; a duplicate that
    // slipped past validation persists nothing.
    let (role, _) = state
        .store
        .create_role_with_permissions(role_name, &permissions)
        .map_err(AppError::from)?;
    info!("role.create id={} name={} permissions={}", role.id, role.name, permissions.len());

    Ok((StatusCode::CREATED, Json(json!(role_repr(&state.store, &role, true)))))
}

pub async fn list_roles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(page): Query<PageParams>,
) -> AppResult<(StatusCode, Json<Value>)> {
    requiring(tags::CAN_CREATE_ROLE).admit(&state.store, &state.sessions, &headers)?;

    let (limit, offset) = page.clamp();
    let (count, roles) = state.store.list_roles(limit, offset);
    let results: Vec<RoleRepr> =
        roles.iter().map(|r| role_repr(&state.store, r, false)).collect();

    Ok((StatusCode::OK, Json(json!({ "count": count, "results": results }))))
}

pub async fn update_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleUpdatePayload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    requiring(tags::CAN_CREATE_ROLE).admit(&state.store, &state.sessions, &headers)?;

    let mut role = state
        .store
        .role_by_id(id)
        .ok_or_else(|| AppError::not_found("not_found".to_string(), format!("Role with id {} does not exist.", id)))?;

    if let Some(name) = payload.name.filter(|n| !n.is_empty()) {
        let mut errs = FieldErrors::new();
        let parsed = check_role(&mut errs, &name);
        errs.finish()?;
        if let Some(parsed) = parsed {
            role = state
                .store
                .update_role_name(id, parsed)
                .map_err(|_| AppError::field("name", "This field must be unique."))?;
        }
    }

    Ok((StatusCode::OK, Json(json!(role_repr(&state.store, &role, false)))))
}

pub async fn create_permissions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<PermissionsPayload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    requiring(tags::CAN_CREATE_PERMISSION).admit(&state.store, &state.sessions, &headers)?;

    let role = state
        .store
        .role_by_id(id)
        .ok_or_else(|| AppError::not_found("not_found".to_string(), format!("Role with id {} does not exist.", id)))?;

    let mut errs = FieldErrors::new();
    if payload.name.is_none() {
        errs.push("name", "Name field is required.");
    }
    let names = payload.name.unwrap_or_default();
    check_permission_names(&state.store, &mut errs, &names);
    errs.finish()?;

    state.store.create_permissions(role.id, &names).map_err(AppError::from)?;
    info!("permission.create role={} count={}", role.name, names.len());

    Ok((StatusCode::CREATED, Json(json!(role_repr(&state.store, &role, false)))))
}

pub async fn update_permission(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<PermissionUpdatePayload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    requiring(tags::CAN_CREATE_PERMISSION).admit(&state.store, &state.sessions, &headers)?;

    let mut perm = state.store.permission_by_id(id).ok_or_else(|| {
        AppError::not_found("not_found".to_string(), format!("Permission with id {} does not exist.", id))
    })?;

    if let Some(name) = payload.name.filter(|n| !n.is_empty()) {
        if name != perm.name && state.store.permission_name_taken(&name) {
            return Err(AppError::field("name".to_string(), format!("{} is not unique.", name)));
        }
        perm = state
            .store
            .update_permission_name(id, &name)
            .map_err(AppError::from)?;
    }
    if let Some(active) = payload.active {
        perm = state.store.update_permission_active(id, active).map_err(AppError::from)?;
    }

    Ok((StatusCode::OK, Json(json!(permission_repr(&state.store, &perm)?))))
}
