//! Core entities held by the record store, plus the public (serialized)
//! representations returned over HTTP. Password hashes never appear in a
//! representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Closed set of role names. Anything else is rejected at validation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    Admin,
    Moderator,
    Member,
    Guest,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => "admin",
            RoleName::Moderator => "moderator",
            RoleName::Member => "member",
            RoleName::Guest => "guest",
        }
    }
}

impl FromStr for RoleName {
    type Err = ();

    // Case-sensitive on purpose: only the lowercase spellings are valid.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(RoleName::Admin),
            "moderator" => Ok(RoleName::Moderator),
            "member" => Ok(RoleName::Member),
            "guest" => Ok(RoleName::Guest),
            _ => Err(()),
        }
    }
}

impl Display for RoleName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    /// PHC-formatted Argon2 hash.
    pub password_hash: String,
    /// None for self-registered users until an admin assigns a role.
    pub role: Option<RoleName>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: RoleName,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    /// Unique system-wide, not just within the owning role.
    pub name: String,
    pub role_id: Uuid,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tags: Vec<String>,
    pub author_id: Uuid,
    pub like: HashSet<Uuid>,
    pub dislike: HashSet<Uuid>,
    pub ratings_counter: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRating {
    pub id: Uuid,
    pub rater_id: Uuid,
    pub note_id: Uuid,
    pub rating: i64,
    pub comment: String,
}

// --- Public representations ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRepr {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub role: Option<RoleName>,
}

impl From<&User> for UserRepr {
    fn from(u: &User) -> Self {
        Self { id: u.id, email: u.email.clone(), username: u.username.clone(), role: u.role }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRepr {
    pub id: Uuid,
    pub name: String,
    /// Name of the owning role.
    pub role: RoleName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRepr {
    pub id: Uuid,
    pub name: RoleName,
    pub permissions: Vec<PermissionRepr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRepr {
    pub id: Uuid,
    pub author: UserRepr,
    pub body: String,
    pub tags: Vec<String>,
    pub created_at_date: String,
    pub description: String,
    pub slug: String,
    pub title: String,
    pub updated_at_date: String,
    /// Count of users who liked the note.
    pub like: usize,
    /// Count of users who disliked the note.
    pub dislike: usize,
}

impl NoteRepr {
    pub fn assemble(note: &Note, author: &User) -> Self {
        Self {
            id: note.id,
            author: UserRepr::from(author),
            body: note.body.clone(),
            tags: note.tags.clone(),
            created_at_date: note.created_at.to_rfc3339(),
            description: note.description.clone(),
            slug: note.slug.clone(),
            title: note.title.clone(),
            updated_at_date: note.updated_at.to_rfc3339(),
            like: note.like.len(),
            dislike: note.dislike.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_name_round_trip() {
        for name in ["admin", "moderator", "member", "guest"] {
            let role: RoleName = name.parse().expect("valid role");
            assert_eq!(role.as_str(), name);
        }
    }

    #[test]
    fn role_name_rejects_unknown_and_cased() {
        assert!(RoleName::from_str("superuser").is_err());
        assert!(RoleName::from_str("Admin").is_err());
        assert!(RoleName::from_str("").is_err());
    }
}
