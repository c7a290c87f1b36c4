//! Authentication and authorization.
//!
//! `password` and `token` are pure services. `resolver` turns a request's
//! session token into the identity it belongs to, and `role_gate` restricts a
//! handler to identities holding a sufficient role.

pub mod password;
pub mod resolver;
pub mod role_gate;
pub mod token;

pub use password::{PasswordError, PasswordHasher};
pub use resolver::{AUTH_COOKIE_NAME, CurrentUser, resolve_identity};
pub use role_gate::{AdminOnly, AdminUser, Authorized, Privilege, authorize};
pub use token::{TokenCodec, TokenError};
