//!
//! noteboard record store
//! ----------------------
//! In-process store for users, roles, permissions, notes and ratings. Tables
//! are plain maps behind a single `parking_lot::RwLock`; the public handle is
//! the cloneable `SharedStore` wrapper.
//!
//! Key responsibilities:
//! - Query-by-field lookups (email, username, role name, slug).
//! - Uniqueness enforcement for user email/username, role names, system-wide
//!   permission names, and note slugs. All checks run under the write lock of
//!   the mutation that relies on them, so a check can never race its write.
//! - Whitelisted patch updates per entity; no generic attribute merging.
//!
//! Users are never hard-deleted, only deactivated via patch.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;
use crate::model::{Note, NoteRating, Permission, Role, RoleName, User};
use crate::slug::unique_slug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{field} is not available: {value}")]
    Duplicate { field: &'static str, value: String },
    #[error("{what} not found")]
    NotFound { what: &'static str },
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field, value } => {
                AppError::conflict("duplicate".to_string(), format!("{} is not available: {}", field, value))
            }
            StoreError::NotFound { what } => {
                AppError::not_found("not_found".to_string(), format!("{} not found", what))
            }
        }
    }
}

/// Whitelisted mutable fields for a user update. Absent fields are left alone.
#[derive(Debug, Default, Clone)]
pub struct UserPatch {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<RoleName>,
    pub is_active: Option<bool>,
}

/// Whitelisted mutable fields for a note update. A changed title re-derives
/// the slug; the uniqueness scan excludes the note being updated.
#[derive(Debug, Default, Clone)]
pub struct NotePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    roles: HashMap<Uuid, Role>,
    permissions: HashMap<Uuid, Permission>,
    notes: HashMap<Uuid, Note>,
    ratings: HashMap<Uuid, NoteRating>,
}

/// Thread-safe handle to the record store, shared across handlers.
#[derive(Clone)]
pub struct SharedStore(Arc<RwLock<Tables>>);

impl Default for SharedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedStore {
    pub fn new() -> Self {
        SharedStore(Arc::new(RwLock::new(Tables::default())))
    }

    // --- users ---

    pub fn user_count(&self) -> usize {
        self.0.read().users.len()
    }

    pub fn user_by_id(&self, id: Uuid) -> Option<User> {
        self.0.read().users.get(&id).cloned()
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.0.read().users.values().find(|u| u.email == email).cloned()
    }

    pub fn email_taken(&self, email: &str) -> bool {
        self.0.read().users.values().any(|u| u.email == email)
    }

    pub fn username_taken(&self, username: &str) -> bool {
        self.0.read().users.values().any(|u| u.username == username)
    }

    pub fn create_user(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
        role: Option<RoleName>,
    ) -> Result<User, StoreError> {
        let mut t = self.0.write();
        if t.users.values().any(|u| u.email == email) {
            return Err(StoreError::Duplicate { field: "email", value: email.to_string() });
        }
        if t.users.values().any(|u| u.username == username) {
            return Err(StoreError::Duplicate { field: "username", value: username.to_string() });
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<User, StoreError> {
        let mut t = self.0.write();
        if let Some(email) = &patch.email {
            if t.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Duplicate { field: "email", value: email.clone() });
            }
        }
        if let Some(username) = &patch.username {
            if t.users.values().any(|u| u.id != id && &u.username == username) {
                return Err(StoreError::Duplicate { field: "username", value: username.clone() });
            }
        }
        let user = t.users.get_mut(&id).ok_or(StoreError::NotFound { what: "user" })?;
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(username) = patch.username {
            user.username = username;
        }
        if let Some(hash) = patch.password_hash {
            user.password_hash = hash;
        }
        if let Some(role) = patch.role {
            user.role = Some(role);
        }
        if let Some(active) = patch.is_active {
            user.is_active = active;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    // --- roles ---

    pub fn role_by_id(&self, id: Uuid) -> Option<Role> {
        self.0.read().roles.get(&id).cloned()
    }

    pub fn role_by_name(&self, name: RoleName) -> Option<Role> {
        self.0.read().roles.values().find(|r| r.name == name).cloned()
    }

    pub fn create_role(&self, name: RoleName) -> Result<Role, StoreError> {
        let mut t = self.0.write();
        if t.roles.values().any(|r| r.name == name) {
            return Err(StoreError::Duplicate { field: "name", value: name.to_string() });
        }
        let role = Role { id: Uuid::new_v4(), name, created_at: Utc::now() };
        t.roles.insert(role.id, role.clone());
        Ok(role)
    }

    pub fn update_role_name(&self, id: Uuid, name: RoleName) -> Result<Role, StoreError> {
        let mut t = self.0.write();
        if t.roles.values().any(|r| r.id != id && r.name == name) {
            return Err(StoreError::Duplicate { field: "name", value: name.to_string() });
        }
        let role = t.roles.get_mut(&id).ok_or(StoreError::NotFound { what: "role" })?;
        role.name = name;
        Ok(role.clone())
    }

    /// Roles in creation order with the total count, for paginated listings.
    pub fn list_roles(&self, limit: usize, offset: usize) -> (usize, Vec<Role>) {
        let t = self.0.read();
        let mut roles: Vec<Role> = t.roles.values().cloned().collect();
        roles.sort_by_key(|r| r.created_at);
        let count = roles.len();
        (count, roles.into_iter().skip(offset).take(limit).collect())
    }

    // --- permissions ---

    pub fn permission_by_id(&self, id: Uuid) -> Option<Permission> {
        self.0.read().permissions.get(&id).cloned()
    }

    pub fn permission_name_taken(&self, name: &str) -> bool {
        self.0.read().permissions.values().any(|p| p.name == name)
    }

    pub fn create_permission(&self, role_id: Uuid, name: &str) -> Result<Permission, StoreError> {
        let mut t = self.0.write();
        if !t.roles.contains_key(&role_id) {
            return Err(StoreError::NotFound { what: "role" });
        }
        // Permission names are unique across the whole system, not per role.
        if t.permissions.values().any(|p| p.name == name) {
            return Err(StoreError::Duplicate { field: "name", value: name.to_string() });
        }
        let perm = Permission { id: Uuid::new_v4(), name: name.to_string(), role_id, active: true };
        t.permissions.insert(perm.id, perm.clone());
        Ok(perm)
    }

    /// Create several permissions under one role as a single atomic step.
    /// Every name is checked against the existing table and against the rest
    /// of the batch before anything is inserted, so a rejected batch leaves
    /// the table untouched.
    pub fn create_permissions(
        &self,
        role_id: Uuid,
        names: &[String],
    ) -> Result<Vec<Permission>, StoreError> {
        let mut t = self.0.write();
        if !t.roles.contains_key(&role_id) {
            return Err(StoreError::NotFound { what: "role" });
        }
        ensure_permission_names_free(&t, names)?;
        Ok(insert_permissions(&mut t, role_id, names))
    }

    /// Create a role together with its initial permissions under one write
    /// lock. All-or-nothing: a duplicate role name or permission name (against
    /// the table or within the batch) persists neither the role nor any
    /// permission.
    pub fn create_role_with_permissions(
        &self,
        name: RoleName,
        permission_names: &[String],
    ) -> Result<(Role, Vec<Permission>), StoreError> {
        let mut t = self.0.write();
        if t.roles.values().any(|r| r.name == name) {
            return Err(StoreError::Duplicate { field: "name", value: name.to_string() });
        }
        ensure_permission_names_free(&t, permission_names)?;
        let role = Role { id: Uuid::new_v4(), name, created_at: Utc::now() };
        t.roles.insert(role.id, role.clone());
        let perms = insert_permissions(&mut t, role.id, permission_names);
        Ok((role, perms))
    }

    pub fn update_permission_name(&self, id: Uuid, name: &str) -> Result<Permission, StoreError> {
        let mut t = self.0.write();
        if t.permissions.values().any(|p| p.id != id && p.name == name) {
            return Err(StoreError::Duplicate { field: "name", value: name.to_string() });
        }
        let perm = t.permissions.get_mut(&id).ok_or(StoreError::NotFound { what: "permission" })?;
        perm.name = name.to_string();
        Ok(perm.clone())
    }

    pub fn update_permission_active(&self, id: Uuid, active: bool) -> Result<Permission, StoreError> {
        let mut t = self.0.write();
        let perm = t.permissions.get_mut(&id).ok_or(StoreError::NotFound { what: "permission" })?;
        perm.active = active;
        Ok(perm.clone())
    }

    pub fn permissions_for_role(&self, role_id: Uuid) -> Vec<Permission> {
        let t = self.0.read();
        let mut perms: Vec<Permission> =
            t.permissions.values().filter(|p| p.role_id == role_id).cloned().collect();
        perms.sort_by(|a, b| a.name.cmp(&b.name));
        perms
    }

    // --- notes ---

    pub fn note_by_id(&self, id: Uuid) -> Option<Note> {
        self.0.read().notes.get(&id).cloned()
    }

    pub fn create_note(
        &self,
        author_id: Uuid,
        title: &str,
        description: &str,
        body: &str,
        tags: Vec<String>,
    ) -> Note {
        let mut t = self.0.write();
        let slug = unique_slug(title, |s| t.notes.values().any(|n| n.slug == s));
        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            slug,
            title: title.to_string(),
            description: description.to_string(),
            body: body.to_string(),
            tags,
            author_id,
            like: Default::default(),
            dislike: Default::default(),
            ratings_counter: 0,
            created_at: now,
            updated_at: now,
        };
        t.notes.insert(note.id, note.clone());
        note
    }

    /// Notes newest-first with the total count, for paginated listings.
    pub fn list_notes(&self, limit: usize, offset: usize) -> (usize, Vec<Note>) {
        let t = self.0.read();
        let mut notes: Vec<Note> = t.notes.values().cloned().collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let count = notes.len();
        (count, notes.into_iter().skip(offset).take(limit).collect())
    }

    pub fn update_note(&self, id: Uuid, patch: NotePatch) -> Result<Note, StoreError> {
        let mut t = self.0.write();
        if !t.notes.contains_key(&id) {
            return Err(StoreError::NotFound { what: "note" });
        }
        let new_slug = match &patch.title {
            Some(title) => {
                let current_title = t.notes[&id].title.clone();
                if *title != current_title {
                    Some(unique_slug(title, |s| {
                        t.notes.values().any(|n| n.id != id && n.slug == s)
                    }))
                } else {
                    None
                }
            }
            None => None,
        };
        let note = t.notes.get_mut(&id).expect("presence checked above");
        if let Some(title) = patch.title {
            note.title = title;
        }
        if let Some(slug) = new_slug {
            note.slug = slug;
        }
        if let Some(description) = patch.description {
            note.description = description;
        }
        if let Some(body) = patch.body {
            note.body = body;
        }
        if let Some(tags) = patch.tags {
            note.tags = tags;
        }
        note.updated_at = Utc::now();
        Ok(note.clone())
    }

    pub fn delete_note(&self, id: Uuid) -> Result<(), StoreError> {
        let mut t = self.0.write();
        t.notes.remove(&id).ok_or(StoreError::NotFound { what: "note" })?;
        t.ratings.retain(|_, r| r.note_id != id);
        Ok(())
    }

    /// Toggle the user's membership in the note's like or dislike set. Liking
    /// clears an existing dislike and vice versa.
    pub fn toggle_reaction(&self, note_id: Uuid, user_id: Uuid, like: bool) -> Result<Note, StoreError> {
        let mut t = self.0.write();
        let note = t.notes.get_mut(&note_id).ok_or(StoreError::NotFound { what: "note" })?;
        let (target, opposite) = if like {
            (&mut note.like, &mut note.dislike)
        } else {
            (&mut note.dislike, &mut note.like)
        };
        if !target.remove(&user_id) {
            target.insert(user_id);
            opposite.remove(&user_id);
        }
        Ok(note.clone())
    }

    /// Record a rating and set the note's ratings counter to the submitted
    /// value (the counter mirrors the most recent rating, not a tally).
    pub fn add_rating(
        &self,
        note_id: Uuid,
        rater_id: Uuid,
        rating: i64,
        comment: &str,
    ) -> Result<NoteRating, StoreError> {
        let mut t = self.0.write();
        let note = t.notes.get_mut(&note_id).ok_or(StoreError::NotFound { what: "note" })?;
        note.ratings_counter = rating;
        let entry = NoteRating {
            id: Uuid::new_v4(),
            rater_id,
            note_id,
            rating,
            comment: comment.to_string(),
        };
        t.ratings.insert(entry.id, entry.clone());
        Ok(entry)
    }

    pub fn ratings_for_note(&self, note_id: Uuid) -> Vec<NoteRating> {
        self.0.read().ratings.values().filter(|r| r.note_id == note_id).cloned().collect()
    }
}

/// Reject any batch name already in the permission table or repeated earlier
/// in the same batch. Runs under the caller's write lock, before any insert.
fn ensure_permission_names_free(t: &Tables, names: &[String]) -> Result<(), StoreError> {
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) || t.permissions.values().any(|p| &p.name == name) {
            return Err(StoreError::Duplicate { field: "name", value: name.clone() });
        }
    }
    Ok(())
}

fn insert_permissions(t: &mut Tables, role_id: Uuid, names: &[String]) -> Vec<Permission> {
    names
        .iter()
        .map(|name| {
            let perm =
                Permission { id: Uuid::new_v4(), name: name.clone(), role_id, active: true };
            t.permissions.insert(perm.id, perm.clone());
            perm
        })
        .collect()
}
