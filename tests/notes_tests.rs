//! Note endpoint tests: slug derivation, author-scoped mutation, listing
//! order, reactions and ratings.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use std::time::Duration;

use noteboard::error::AppError;
use noteboard::identity::gate::tags;
use noteboard::model::{RoleName, User};
use noteboard::security;
use noteboard::server::auth::{self, LoginPayload};
use noteboard::server::notes::{self, NotePayload, RatingPayload};
use noteboard::server::{AppState, PageParams};
use noteboard::store::SharedStore;

/// Seed a member role holding can_create_note and two member users.
fn seeded_state() -> (AppState, User, User) {
    let state = AppState::new(SharedStore::new(), Duration::from_secs(3600));
    let role = state.store.create_role(RoleName::Member).unwrap();
    state.store.create_permission(role.id, tags::CAN_CREATE_NOTE).unwrap();
    let hash = security::hash_password("Valid123!").unwrap();
    let alice = state
        .store
        .create_user("alice@example.com", "alice", &hash, Some(RoleName::Member))
        .unwrap();
    let bob = state
        .store
        .create_user("bob@example.com", "bob", &hash, Some(RoleName::Member))
        .unwrap();
    (state, alice, bob)
}

async fn login(state: &AppState, email: &str) -> HeaderMap {
    let payload = LoginPayload { email: Some(email.into()), password: Some("Valid123!".into()) };
    let (_, Json(body)) = auth::login(State(state.clone()), Json(payload)).await.unwrap();
    let mut headers = HeaderMap::new();
    headers.insert(
        "authorization",
        format!("Bearer {}", body["token"].as_str().unwrap()).parse().unwrap(),
    );
    headers
}

fn note_payload(title: &str, body: &str) -> NotePayload {
    NotePayload {
        title: Some(title.into()),
        description: Some("a note".into()),
        body: Some(body.into()),
        tags: Some(vec!["test".into()]),
    }
}

async fn create(state: &AppState, headers: &HeaderMap, title: &str) -> serde_json::Value {
    let (status, Json(body)) = notes::create_note(
        State(state.clone()),
        headers.clone(),
        Json(note_payload(title, "body text")),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    body
}

fn id_of(body: &serde_json::Value) -> uuid::Uuid {
    serde_json::from_value(body["id"].clone()).unwrap()
}

#[tokio::test]
async fn notes_with_the_same_title_get_suffixed_slugs() {
    let (state, _alice, _bob) = seeded_state();
    let headers = login(&state, "alice@example.com").await;

    let first = create(&state, &headers, "Hello World").await;
    let second = create(&state, &headers, "Hello World").await;
    assert_eq!(first["slug"], "hello-world");
    assert_eq!(second["slug"], "hello-world-1");
    assert_eq!(first["author"]["username"], "alice");
}

#[tokio::test]
async fn note_creation_validates_title_and_body() {
    let (state, _alice, _bob) = seeded_state();
    let headers = login(&state, "alice@example.com").await;

    let err = notes::create_note(
        State(state.clone()),
        headers,
        Json(NotePayload { title: None, description: None, body: None, tags: None }),
    )
    .await
    .unwrap_err();
    match err {
        AppError::Validation { errors } => {
            assert_eq!(errors[0].message, "Title field is required.");
            assert_eq!(errors[1].message, "Body field is required.");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn list_returns_newest_first_with_count() {
    let (state, _alice, _bob) = seeded_state();
    let headers = login(&state, "alice@example.com").await;
    create(&state, &headers, "First").await;
    create(&state, &headers, "Second").await;

    let (_, Json(body)) = notes::list_notes(
        State(state.clone()),
        headers,
        Query(PageParams { limit: None, offset: None }),
    )
    .await
    .unwrap();
    assert_eq!(body["count"], 2);
    assert_eq!(body["results"][0]["title"], "Second");
    assert_eq!(body["results"][1]["title"], "First");
}

#[tokio::test]
async fn retrieve_unknown_note_is_404() {
    let (state, _alice, _bob) = seeded_state();
    let headers = login(&state, "alice@example.com").await;
    let err = notes::retrieve_note(State(state.clone()), headers, Path(uuid::Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 404);
}

#[tokio::test]
async fn only_the_author_can_update_or_delete() {
    let (state, _alice, _bob) = seeded_state();
    let alice_headers = login(&state, "alice@example.com").await;
    let bob_headers = login(&state, "bob@example.com").await;
    let note = create(&state, &alice_headers, "Owned").await;
    let id = id_of(&note);

    // A valid payload does not help a non-author.
    let err = notes::update_note(
        State(state.clone()),
        bob_headers.clone(),
        Path(id),
        Json(note_payload("Hijacked", "new body")),
    )
    .await
    .unwrap_err();
    assert_eq!(err.http_status(), 401);
    assert_eq!(err.body(), serde_json::json!({"message": "You can only update your note"}));

    let err = notes::delete_note(State(state.clone()), bob_headers, Path(id)).await.unwrap_err();
    assert_eq!(err.http_status(), 401);
    assert_eq!(err.body(), serde_json::json!({"message": "You can only delete your note"}));

    // The author can do both.
    let (status, Json(updated)) = notes::update_note(
        State(state.clone()),
        alice_headers.clone(),
        Path(id),
        Json(NotePayload {
            title: None,
            description: None,
            body: Some("edited".into()),
            tags: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["body"], "edited");
    assert_eq!(updated["slug"], "owned", "slug is stable when the title is unchanged");

    let (status, Json(deleted)) =
        notes::delete_note(State(state.clone()), alice_headers, Path(id)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["message"], "You have successfully deleted the note");
    assert!(state.store.note_by_id(id).is_none());
}

#[tokio::test]
async fn likes_toggle_and_displace_dislikes() {
    let (state, _alice, _bob) = seeded_state();
    let alice_headers = login(&state, "alice@example.com").await;
    let bob_headers = login(&state, "bob@example.com").await;
    let note = create(&state, &alice_headers, "Reactions").await;
    let id = id_of(&note);

    let (_, Json(liked)) =
        notes::like_note(State(state.clone()), bob_headers.clone(), Path(id)).await.unwrap();
    assert_eq!(liked["like"], 1);
    assert_eq!(liked["dislike"], 0);

    let (_, Json(switched)) =
        notes::dislike_note(State(state.clone()), bob_headers.clone(), Path(id)).await.unwrap();
    assert_eq!(switched["like"], 0);
    assert_eq!(switched["dislike"], 1);

    // Toggling again clears the reaction.
    let (_, Json(cleared)) =
        notes::dislike_note(State(state.clone()), bob_headers, Path(id)).await.unwrap();
    assert_eq!(cleared["like"], 0);
    assert_eq!(cleared["dislike"], 0);
}

#[tokio::test]
async fn rating_records_an_entry_and_sets_the_counter() {
    let (state, _alice, bob) = seeded_state();
    let alice_headers = login(&state, "alice@example.com").await;
    let bob_headers = login(&state, "bob@example.com").await;
    let note = create(&state, &alice_headers, "Rated").await;
    let id = id_of(&note);

    let (status, Json(body)) = notes::rate_note(
        State(state.clone()),
        bob_headers,
        Path(id),
        Json(RatingPayload { rating: 4, comment: Some("solid".into()) }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"]["rating"], 4);

    let ratings = state.store.ratings_for_note(id);
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0].rater_id, bob.id);
    assert_eq!(state.store.note_by_id(id).unwrap().ratings_counter, 4);
}

#[tokio::test]
async fn unauthenticated_note_access_is_401() {
    let (state, _alice, _bob) = seeded_state();
    let err = notes::list_notes(
        State(state.clone()),
        HeaderMap::new(),
        Query(PageParams { limit: None, offset: None }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.http_status(), 401);
}
