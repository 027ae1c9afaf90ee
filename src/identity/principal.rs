use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated identity behind a request. Holds only stable identifiers;
/// permissions are resolved live against the authorization model so that role
/// or permission changes apply to existing sessions immediately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
}
