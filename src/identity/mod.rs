//! Identity: authenticated principals, opaque session tokens, and the access
//! control gate consulted before gated endpoints execute.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
pub mod gate;

pub use gate::{permissions_of, requiring, Gate};
pub use principal::Principal;
pub use session::{Session, SessionManager, SessionToken};
