//! Field-level request validation
//! ------------------------------
//! Shared validators for the registration, user, role and note payloads.
//! Messages are stable, human-readable strings naming the offending field;
//! each validator reports at most one message per field, and the password
//! policy runs its checks in a fixed order with the first violation winning.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, FieldError};
use crate::model::RoleName;

pub const MAX_FIELD_LEN: usize = 128;
pub const MAX_TITLE_LEN: usize = 255;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));

/// Accumulator for per-field validation failures. Callers run every field's
/// validator, then call `finish()` so all failing fields surface in one
/// response rather than just the first.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: Into<String>>(&mut self, field: S, message: S) {
        self.errors.push(FieldError::new(field.into(), message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(self.errors))
        }
    }
}

/// Email checks: presence, length bound, format. Uniqueness is checked by the
/// caller against the record store.
pub fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.is_empty() {
        errors.push("email", "Email field is required.");
    } else if email.len() > MAX_FIELD_LEN {
        errors.push("email", "Email must be at most 128 characters.");
    } else if !EMAIL_RE.is_match(email) {
        errors.push("email", "Enter a valid email address.");
    }
}

pub fn check_username(errors: &mut FieldErrors, username: &str) {
    if username.is_empty() {
        errors.push("username", "Username field is required.");
    } else if username.len() > MAX_FIELD_LEN {
        errors.push("username", "Username must be at most 128 characters.");
    }
}

/// Password policy. Four checks in fixed order after the presence check; the
/// first violated check's message is reported, not all of them.
pub fn check_password(errors: &mut FieldErrors, password: &str) {
    if password.is_empty() {
        errors.push("password", "Password field is required.");
    } else if password.chars().count() < 8 {
        errors.push("password", "Create a password at least 8 characters.");
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("password", "Create a password with at least one number.");
    } else if !password.chars().any(|c| c.is_uppercase())
        || password.chars().any(|c| c.is_whitespace())
    {
        errors.push("password", "Create a password with at least one uppercase letter");
    } else if password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        errors.push("password", "Create a password with at least one special character.");
    }
}

/// Parse a role name against the closed set, reporting the offending value.
pub fn check_role(errors: &mut FieldErrors, role: &str) -> Option<RoleName> {
    match role.parse::<RoleName>() {
        Ok(name) => Some(name),
        Err(()) => {
            errors.push("role".to_string(), format!("{} is not a valid role.", role));
            None
        }
    }
}

pub fn check_title(errors: &mut FieldErrors, title: &str) {
    if title.is_empty() {
        errors.push("title", "Title field is required.");
    } else if title.len() > MAX_TITLE_LEN {
        errors.push("title", "Title must be at most 255 characters.");
    }
}

pub fn check_body(errors: &mut FieldErrors, body: &str) {
    if body.is_empty() {
        errors.push("body", "Body field is required.");
    }
}
