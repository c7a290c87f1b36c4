use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tokio::task;
use tracing::info;

use crate::auth::{PasswordHasher, TokenCodec};
use crate::db::entities::user;
use crate::db::enums::Role;
use crate::db::is_unique_violation;
use crate::db::services::{NewUserRecord, user_service};
use crate::web::error::AppError;
use crate::web::models::LoginRequest;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

const INVALID_EMAIL: &str = "Invalid email format.";
const DUPLICATE_EMAIL: &str = "The email already exists";

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Everything needed to register an identity. `image` is the stored filename
/// of an already-saved avatar, if one was uploaded.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    pub image: Option<String>,
}

/// A successful login: the issued session token and the identity it names.
/// The token is handed to the client as a cookie, never in a response body.
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub token: String,
    pub user_id: i32,
    pub email: String,
}

/// A partial profile update. Only present, non-empty fields are applied.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
}

async fn hash_password(hasher: PasswordHasher, plaintext: String) -> Result<String, AppError> {
    let digest = task::spawn_blocking(move || hasher.hash(&plaintext)).await??;
    Ok(digest)
}

async fn verify_password(
    hasher: PasswordHasher,
    digest: String,
    plaintext: String,
) -> Result<bool, AppError> {
    let matches = task::spawn_blocking(move || hasher.verify(&digest, &plaintext)).await??;
    Ok(matches)
}

fn map_user_write_error(err: sea_orm::DbErr) -> AppError {
    if is_unique_violation(&err) {
        AppError::UserAlreadyExists(DUPLICATE_EMAIL.to_string())
    } else {
        AppError::DatabaseError(err.to_string())
    }
}

pub async fn register_user(
    db: &DatabaseConnection,
    hasher: PasswordHasher,
    req: NewIdentity,
) -> Result<user::Model, AppError> {
    if !is_valid_email(&req.email) {
        return Err(AppError::InvalidInput(INVALID_EMAIL.to_string()));
    }
    if req.password.is_empty() {
        return Err(AppError::InvalidInput("Password is required.".to_string()));
    }

    if user_service::find_user_by_email(db, &req.email).await?.is_some() {
        return Err(AppError::UserAlreadyExists(DUPLICATE_EMAIL.to_string()));
    }

    let password_hash = hash_password(hasher, req.password).await?;

    let created = user_service::create_user(
        db,
        NewUserRecord {
            email: req.email,
            name: req.name,
            password_hash,
            role: req.role,
            image: req.image,
        },
    )
    .await
    .map_err(map_user_write_error)?;

    info!(user_id = created.id, role = %created.role, "Registered new user.");
    Ok(created)
}

/// Verifies an email/password pair. Unknown email and wrong password are
/// distinct errors here so they can be logged apart; both render as the same
/// generic 401.
pub async fn authenticate(
    db: &DatabaseConnection,
    hasher: PasswordHasher,
    email: &str,
    password: &str,
) -> Result<user::Model, AppError> {
    let user = match user_service::find_user_by_email(db, email).await? {
        Some(u) => u,
        None => {
            info!(%email, "Login attempt for an unknown email.");
            return Err(AppError::UserNotFound);
        }
    };

    let valid_password =
        verify_password(hasher, user.password_hash.clone(), password.to_string()).await?;
    if !valid_password {
        info!(user_id = user.id, "Login attempt with a wrong password.");
        return Err(AppError::InvalidCredentials);
    }

    Ok(user)
}

pub async fn login_user(
    db: &DatabaseConnection,
    hasher: PasswordHasher,
    codec: &TokenCodec,
    req: LoginRequest,
    now: DateTime<Utc>,
) -> Result<LoginSession, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput("Email and password are required.".to_string()));
    }

    let user = authenticate(db, hasher, &req.email, &req.password).await?;

    let token = codec
        .issue(user.id, now)
        .map_err(|e| AppError::TokenCreationError(e.to_string()))?;

    info!(user_id = user.id, "User logged in.");
    Ok(LoginSession {
        token,
        user_id: user.id,
        email: user.email,
    })
}

/// Applies `changes` to `identity` and persists the result in one `UPDATE`.
/// A changed email is re-validated and a changed password is re-hashed.
pub async fn update_profile(
    db: &DatabaseConnection,
    hasher: PasswordHasher,
    identity: user::Model,
    changes: ProfileChanges,
) -> Result<user::Model, AppError> {
    let mut active: user::ActiveModel = identity.clone().into();

    if let Some(email) = changes.email.filter(|e| !e.is_empty()) {
        if !is_valid_email(&email) {
            return Err(AppError::InvalidInput(INVALID_EMAIL.to_string()));
        }
        if email != identity.email {
            active.email = Set(email);
        }
    }
    if let Some(name) = changes.name.filter(|n| !n.is_empty()) {
        if name != identity.name {
            active.name = Set(name);
        }
    }
    if let Some(password) = changes.password.filter(|p| !p.is_empty()) {
        active.password_hash = Set(hash_password(hasher, password).await?);
    }
    if let Some(image) = changes.image.filter(|i| !i.is_empty()) {
        active.image = Set(Some(image));
    }

    if !active.is_changed() {
        return Ok(identity);
    }

    let updated = user_service::save_user(db, active)
        .await
        .map_err(map_user_write_error)?;
    info!(user_id = updated.id, "Updated user profile.");
    Ok(updated)
}
