//!
//! noteboard HTTP server
//! ---------------------
//! Axum-based JSON API. Responsibilities:
//! - Registration, login and logout backed by the credential service.
//! - Role, permission and admin user endpoints behind the access control gate.
//! - Note CRUD with author-scoped mutation, plus like/dislike and rating.
//! - First-run provisioning of the default admin account.
//!
//! Control flow per gated request: access gate (authentication, then required
//! permission) -> payload validation -> one record-store mutation or query ->
//! serialized representation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post, put};
use axum::Router;
use serde::Deserialize;
use tracing::info;

use crate::identity::SessionManager;
use crate::security;
use crate::store::SharedStore;

pub mod auth;
pub mod notes;
pub mod roles;
pub mod users;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(store: SharedStore, session_ttl: Duration) -> Self {
        Self { store, sessions: Arc::new(SessionManager::with_ttl(session_ttl)) }
    }
}

/// Pagination query parameters shared by the list endpoints.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub const DEFAULT_PAGE_LIMIT: usize = 20;
pub const MAX_PAGE_LIMIT: usize = 100;

impl PageParams {
    pub fn clamp(&self) -> (usize, usize) {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT);
        (limit, self.offset.unwrap_or(0))
    }
}

/// Mount all routes onto a router bound to the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "noteboard ok" }))
        .route("/users/signup", post(auth::signup))
        .route("/users/login", post(auth::login))
        .route("/users/logout", post(auth::logout))
        .route("/roles/", post(roles::create_role))
        .route("/roles/list/", get(roles::list_roles))
        .route("/roles/{id}/update", put(roles::update_role))
        .route("/roles/{id}/", post(roles::create_permissions))
        .route("/permissions/{id}/", put(roles::update_permission))
        .route("/admin/users/create", post(users::create_user))
        .route("/admin/users/{id}/update", put(users::update_user))
        .route("/notes", post(notes::create_note))
        .route("/notes/list", get(notes::list_notes))
        .route("/notes/{id}", get(notes::retrieve_note))
        .route("/notes/{id}/update", put(notes::update_note))
        .route("/notes/{id}/delete", delete(notes::delete_note))
        .route("/notes/{id}/like", post(notes::like_note))
        .route("/notes/{id}/dislike", post(notes::dislike_note))
        .route("/notes/{id}/rate", post(notes::rate_note))
        .with_state(state)
}

/// Start the noteboard HTTP server on the given port.
pub async fn run_with_config(
    http_port: u16,
    session_ttl: Duration,
    admin_password: &str,
) -> anyhow::Result<()> {
    let store = SharedStore::new();
    security::ensure_default_admin(&store, admin_password)?;

    let state = AppState::new(store, session_ttl);
    let app = router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Convenience entry point reading configuration from the environment.
pub async fn run() -> anyhow::Result<()> {
    let http_port: u16 = std::env::var("NOTEBOARD_HTTP_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(7878);
    let ttl_secs: u64 = std::env::var("NOTEBOARD_SESSION_TTL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3600);
    let admin_password =
        std::env::var("NOTEBOARD_ADMIN_PASSWORD").unwrap_or_else(|_| "Adm1n!pass".to_string());
    run_with_config(http_port, Duration::from_secs(ttl_secs), &admin_password).await
}
