//! Credential service: Argon2 password hashing/verification and first-run
//! provisioning of the default admin account.

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use tracing::info;

use crate::identity::gate::tags;
use crate::model::{RoleName, User};
use crate::store::SharedStore;

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!(e.to_string()))?
        .to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else {
        false
    }
}

/// Look up a user by email and verify the password against the stored hash.
/// Returns the matching user regardless of active flag; callers decide how to
/// surface deactivation.
pub fn authenticate(store: &SharedStore, email: &str, password: &str) -> Option<User> {
    let user = store.user_by_email(email)?;
    if verify_password(&user.password_hash, password) {
        Some(user)
    } else {
        None
    }
}

/// First-run provisioning: when the store holds no users, create the `admin`
/// role carrying every permission tag and an active admin user. Idempotent.
pub fn ensure_default_admin(store: &SharedStore, admin_password: &str) -> Result<()> {
    if store.user_count() > 0 {
        return Ok(());
    }
    let role = store.create_role(RoleName::Admin)?;
    for tag in tags::ALL {
        store.create_permission(role.id, tag)?;
    }
    let hash = hash_password(admin_password)?;
    let user = store.create_user(
        "admin@noteboard.local",
        "admin",
        &hash,
        Some(RoleName::Admin),
    )?;
    info!("provisioned default admin user id={} role=admin", user.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let phc = hash_password("Valid123!").expect("hash");
        assert!(phc.starts_with("$argon2"));
        assert!(verify_password(&phc, "Valid123!"));
        assert!(!verify_password(&phc, "Valid123?"));
        assert!(!verify_password("not-a-phc-string", "Valid123!"));
    }

    #[test]
    fn default_admin_is_provisioned_once() {
        let store = SharedStore::new();
        ensure_default_admin(&store, "Adm1n!pass").expect("bootstrap");
        ensure_default_admin(&store, "Adm1n!pass").expect("idempotent");
        assert_eq!(store.user_count(), 1);
        let admin = store.user_by_email("admin@noteboard.local").expect("admin exists");
        assert_eq!(admin.role, Some(RoleName::Admin));
        assert!(authenticate(&store, "admin@noteboard.local", "Adm1n!pass").is_some());
        assert!(authenticate(&store, "admin@noteboard.local", "wrong").is_none());
    }
}
