use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{error, warn};

use crate::auth::resolver::CurrentUser;
use crate::db::entities::user;
use crate::db::enums::Role;
use crate::web::{AppState, error::AppError};

/// A privilege a route can demand. Adding a role means adding a `Role`
/// variant and deciding which privileges admit it.
pub trait Privilege: Send + Sync + 'static {
    const NAME: &'static str;

    fn permits(role: Role) -> bool;
}

/// Satisfied only by administrators.
pub struct AdminOnly;

impl Privilege for AdminOnly {
    const NAME: &'static str = "admin";

    fn permits(role: Role) -> bool {
        role.is_admin()
    }
}

/// Checks an already-resolved identity against `P`.
///
/// `None` means the identity resolver did not run before the gate. That is a
/// wiring bug, so it is reported as an internal error and never allowed.
pub fn authorize<P: Privilege>(identity: Option<&user::Model>) -> Result<(), AppError> {
    let Some(identity) = identity else {
        error!(privilege = P::NAME, "Role gate reached without a resolved identity.");
        return Err(AppError::InternalServerError(
            "role gate evaluated before identity resolution".to_string(),
        ));
    };

    if P::permits(identity.role) {
        Ok(())
    } else {
        warn!(
            user_id = identity.id,
            role = %identity.role,
            privilege = P::NAME,
            "Identity lacks the privilege required by this route."
        );
        Err(AppError::Forbidden)
    }
}

/// An identity that has passed both the resolver and the `P` gate.
pub struct Authorized<P: Privilege> {
    pub user: user::Model,
    _privilege: PhantomData<P>,
}

pub type AdminUser = Authorized<AdminOnly>;

impl<P: Privilege> FromRequestParts<Arc<AppState>> for Authorized<P> {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        authorize::<P>(Some(&identity))?;

        Ok(Self {
            user: identity,
            _privilege: PhantomData,
        })
    }
}
