//! Note endpoints: CRUD plus like/dislike toggles and ratings. Every
//! operation here is gated by `can_create_note` (the one shared tag, kept
//! as the original wiring had it), and mutation is author-scoped.

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
use crate::model::{Note, NoteRepr};
use crate::server::{AppState, PageParams};
use crate::store::{NotePatch, SharedStore};
use crate::validate::{check_body, check_title, FieldErrors};

#[derive(Debug, Deserialize)]
pub struct NotePayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct RatingPayload {
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

fn note_repr(store: &SharedStore, note: &Note) -> AppResult<NoteRepr> {
    let author = store
        .user_by_id(note.author_id)
        .ok_or_else(|| AppError::internal("internal", "note has no author record"))?;
    Ok(NoteRepr::assemble(note, &author))
}

fn note_or_404(store: &SharedStore, id: Uuid) -> AppResult<Note> {
    store
        .note_by_id(id)
        .ok_or_else(|| AppError::not_found("not_found", "A note with this id does not exist."))
}

pub async fn create_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<NotePayload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let actor = requiring(tags::CAN_CREATE_NOTE).admit(&state.store, &state.sessions, &headers)?;

    let title = payload.title.unwrap_or_default();
    let body = payload.body.unwrap_or_default();
    let mut errs = FieldErrors::new();
    check_title(&mut errs, &title);
    check_body(&mut errs, &body);
    errs.finish()?;

    let note = state.store.create_note(
        actor.id,
        &title,
        payload.description.as_deref().unwrap_or(""),
        &body,
        payload.tags.unwrap_or_default(),
    );
    info!("note.create id={} slug={} author={}", note.id, note.slug, actor.id);

    Ok((StatusCode::CREATED, Json(json!(note_repr(&state.store, &note)?))))
}

pub async fn list_notes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(page): Query<PageParams>,
) -> AppResult<(StatusCode, Json<Value>)> {
    requiring(tags::CAN_CREATE_NOTE).admit(&state.store, &state.sessions, &headers)?;

    let (limit, offset) = page.clamp();
    let (count, notes) = state.store.list_notes(limit, offset);
    let results = notes
        .iter()
        .map(|n| note_repr(&state.store, n))
        .collect::<AppResult<Vec<_>>>()?;

    Ok((StatusCode::OK, Json(json!({ "count": count, "results": results }))))
}

pub async fn retrieve_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Value>)> {
    requiring(tags::CAN_CREATE_NOTE).admit(&state.store, &state.sessions, &headers)?;

    let note = note_or_404(&state.store, id)?;
    Ok((StatusCode::OK, Json(json!({ "note": note_repr(&state.store, &note)? }))))
}

pub async fn update_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<NotePayload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let actor = requiring(tags::CAN_CREATE_NOTE).admit(&state.store, &state.sessions, &headers)?;

    let note = note_or_404(&state.store, id)?;
    if note.author_id != actor.id {
        return Err(AppError::auth("ownership", "You can only update your note"));
    }

    let mut errs = FieldErrors::new();
    if let Some(title) = &payload.title {
        check_title(&mut errs, title);
    }
    if let Some(body) = &payload.body {
        check_body(&mut errs, body);
    }
    errs.finish()?;

    let patch = NotePatch {
        title: payload.title,
        description: payload.description,
        body: payload.body,
        tags: payload.tags,
    };
    let updated = state.store.update_note(id, patch).map_err(AppError::from)?;

    Ok((StatusCode::OK, Json(json!(note_repr(&state.store, &updated)?))))
}

pub async fn delete_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let actor = requiring(tags::CAN_CREATE_NOTE).admit(&state.store, &state.sessions, &headers)?;

    let note = note_or_404(&state.store, id)?;
    if note.author_id != actor.id {
        return Err(AppError::auth("ownership", "You can only delete your note"));
    }

    state.store.delete_note(id).map_err(AppError::from)?;
    info!("note.delete id={} author={}", id, actor.id);

    Ok((StatusCode::OK, Json(json!({ "message": "You have successfully deleted the note" }))))
}

pub async fn like_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Value>)> {
    react(state, headers, id, true).await
}

pub async fn dislike_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Value>)> {
    react(state, headers, id, false).await
}

async fn react(
    state: AppState,
    headers: HeaderMap,
    id: Uuid,
    like: bool,
) -> AppResult<(StatusCode, Json<Value>)> {
    let actor = requiring(tags::CAN_CREATE_NOTE).admit(&state.store, &state.sessions, &headers)?;

    note_or_404(&state.store, id)?;
    let note = state.store.toggle_reaction(id, actor.id, like).map_err(AppError::from)?;

    Ok((StatusCode::OK, Json(json!(note_repr(&state.store, &note)?))))
}

pub async fn rate_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<RatingPayload>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let actor = requiring(tags::CAN_CREATE_NOTE).admit(&state.store, &state.sessions, &headers)?;

    note_or_404(&state.store, id)?;
    let rating = state
        .store
        .add_rating(id, actor.id, payload.rating, payload.comment.as_deref().unwrap_or(""))
        .map_err(AppError::from)?;
    info!("note.rate note={} rater={} rating={}", id, actor.id, payload.rating);

    let note = note_or_404(&state.store, id)?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "note": note_repr(&state.store, &note)?,
            "rating": { "id": rating.id, "rating": rating.rating, "comment": rating.comment },
        })),
    ))
}
