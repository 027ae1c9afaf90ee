//! Authorization model and access control gate.
//!
//! The model maps a user's role to its active permission names; the gate is a
//! reusable pre-condition composed with each gated endpoint. Endpoints obtain
//! a gate through `requiring(tag)` and call `admit` before their body runs:
//! first the request must carry a valid, unexpired session for an active user
//! (401 otherwise), then the required permission must be held (403 otherwise).
//! The gate is stateless and reads the model's current data on every call.

use axum::http::HeaderMap;
use std::collections::HashSet;

use super::session::SessionManager;
use crate::error::{AppError, AppResult};
use crate::model::User;
use crate::store::SharedStore;

/// Permission tags known to the system. Endpoints are parameterized by these
/// rather than hard-coding checks, so new endpoints compose the same gate with
/// a different tag.
pub mod tags {
    pub const CAN_CREATE_ROLE: &str = "can_create_role";
    pub const CAN_CREATE_PERMISSION: &str = "can_create_permission";
    pub const CAN_ASSIGN_ROLE: &str = "can_assign_role";
    pub const CAN_UPDATE_USER: &str = "can_update_user";
    pub const CAN_CREATE_NOTE: &str = "can_create_note";

    pub const ALL: [&str; 5] = [
        CAN_CREATE_ROLE,
        CAN_CREATE_PERMISSION,
        CAN_ASSIGN_ROLE,
        CAN_UPDATE_USER,
        CAN_CREATE_NOTE,
    ];
}

/// Active permission names the user currently holds, derived transitively
/// through their role. Never fails: a role-less user, or a role name with no
/// backing role record, yields the empty set.
pub fn permissions_of(store: &SharedStore, user: &User) -> HashSet<String> {
    let Some(role_name) = user.role else {
        return HashSet::new();
    };
    let Some(role) = store.role_by_name(role_name) else {
        return HashSet::new();
    };
    store
        .permissions_for_role(role.id)
        .into_iter()
        .filter(|p| p.active)
        .map(|p| p.name)
        .collect()
}

/// A pre-condition requiring one permission tag. Construct via `requiring`.
#[derive(Debug, Clone, Copy)]
pub struct Gate {
    required: &'static str,
}

/// Factory for a gate bound to one required permission.
pub fn requiring(permission: &'static str) -> Gate {
    Gate { required: permission }
}

/// Extract the opaque session token from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("authorization").or_else(|| headers.get("Authorization"))?;
    let s = value.to_str().ok()?;
    let rest = s.strip_prefix("Bearer ").or_else(|| s.strip_prefix("bearer "))?;
    let token = rest.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

impl Gate {
    pub fn required(&self) -> &'static str {
        self.required
    }

    /// Pure membership test against the authorization model's current data.
    pub fn check(&self, store: &SharedStore, user: &User) -> bool {
        permissions_of(store, user).contains(self.required)
    }

    /// Authenticate the request, then check the required permission. On
    /// success the resolved user is returned for the endpoint body to use.
    pub fn admit(
        &self,
        store: &SharedStore,
        sessions: &SessionManager,
        headers: &HeaderMap,
    ) -> AppResult<User> {
        let user = authenticate_request(store, sessions, headers)?;
        if !self.check(store, &user) {
            return Err(AppError::forbidden(
                "permission_denied",
                "You do not have permission to perform this action.",
            ));
        }
        Ok(user)
    }
}

/// Stage one of the gate, also used by ungated-but-authenticated endpoints:
/// resolve the bearer token to a live session and an active user.
pub fn authenticate_request(
    store: &SharedStore,
    sessions: &SessionManager,
    headers: &HeaderMap,
) -> AppResult<User> {
    let Some(token) = bearer_token(headers) else {
        return Err(AppError::auth(
            "not_authenticated",
            "Authentication credentials were not provided.",
        ));
    };
    let Some(principal) = sessions.validate(&token) else {
        return Err(AppError::auth("invalid_token", "Invalid or expired token."));
    };
    match store.user_by_id(principal.user_id) {
        Some(user) if user.is_active => Ok(user),
        _ => Err(AppError::auth("invalid_token", "Invalid or expired token.")),
    }
}
