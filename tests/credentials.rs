mod common;

use chrono::{Duration, Utc};
use sea_orm::{ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter};

use common::spawn_app;
use tag_registry::auth::resolve_identity;
use tag_registry::db::entities::user;
use tag_registry::db::enums::Role;
use tag_registry::services::auth_service::{self, NewIdentity, ProfileChanges};
use tag_registry::web::error::AppError;
use tag_registry::web::models::LoginRequest;

fn identity(email: &str, password: &str) -> NewIdentity {
    NewIdentity {
        email: email.to_string(),
        password: password.to_string(),
        name: "Alice".to_string(),
        role: Role::Standard,
        image: None,
    }
}

#[tokio::test]
async fn test_authenticate_matches_only_the_registered_password() {
    let app = spawn_app().await;
    let hasher = app.state.password_hasher;
    let alice = app.seed_user("a@b.com", "pw", "Alice", Role::Standard).await;
    assert_ne!(alice.password_hash, "pw");

    let found = auth_service::authenticate(app.db(), hasher, "a@b.com", "pw")
        .await
        .unwrap();
    assert_eq!(found.id, alice.id);

    let wrong = auth_service::authenticate(app.db(), hasher, "a@b.com", "nope").await;
    assert!(matches!(wrong, Err(AppError::InvalidCredentials)));

    let unknown = auth_service::authenticate(app.db(), hasher, "x@y.com", "pw").await;
    assert!(matches!(unknown, Err(AppError::UserNotFound)));
}

#[tokio::test]
async fn test_duplicate_registration_keeps_one_row() {
    let app = spawn_app().await;
    let hasher = app.state.password_hasher;
    auth_service::register_user(app.db(), hasher, identity("a@b.com", "pw"))
        .await
        .unwrap();

    let second = auth_service::register_user(app.db(), hasher, identity("a@b.com", "other")).await;
    match second {
        Err(AppError::UserAlreadyExists(msg)) => assert_eq!(msg, "The email already exists"),
        other => panic!("expected duplicate email, got {other:?}"),
    }

    let rows = user::Entity::find()
        .filter(user::Column::Email.eq("a@b.com"))
        .count(app.db())
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_registration_rejects_bad_input() {
    let app = spawn_app().await;
    let hasher = app.state.password_hasher;

    let bad_email = auth_service::register_user(app.db(), hasher, identity("not-an-email", "pw")).await;
    assert!(matches!(bad_email, Err(AppError::InvalidInput(msg)) if msg == "Invalid email format."));

    let no_password = auth_service::register_user(app.db(), hasher, identity("a@b.com", "")).await;
    assert!(matches!(no_password, Err(AppError::InvalidInput(_))));

    assert_eq!(user::Entity::find().count(app.db()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_login_issues_token_for_the_identity() {
    let app = spawn_app().await;
    let alice = app.seed_user("a@b.com", "pw", "Alice", Role::Standard).await;
    let now = Utc::now();

    let session = auth_service::login_user(
        app.db(),
        app.state.password_hasher,
        &app.state.token_codec,
        LoginRequest {
            email: "a@b.com".to_string(),
            password: "pw".to_string(),
        },
        now,
    )
    .await
    .unwrap();

    assert_eq!(session.user_id, alice.id);
    assert_eq!(session.email, "a@b.com");
    assert_eq!(
        app.state.token_codec.validate(&session.token, now + Duration::seconds(1)),
        Ok(alice.id)
    );
}

#[tokio::test]
async fn test_partial_profile_update() {
    let app = spawn_app().await;
    let hasher = app.state.password_hasher;
    let alice = app.seed_user("a@b.com", "pw", "Alice", Role::Standard).await;

    let renamed = auth_service::update_profile(
        app.db(),
        hasher,
        alice.clone(),
        ProfileChanges {
            name: Some("Alicia".to_string()),
            email: Some(String::new()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(renamed.name, "Alicia");
    assert_eq!(renamed.email, alice.email);
    assert_eq!(renamed.password_hash, alice.password_hash);

    let repassworded = auth_service::update_profile(
        app.db(),
        hasher,
        renamed,
        ProfileChanges {
            password: Some("new-pw".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_ne!(repassworded.password_hash, alice.password_hash);
    assert!(auth_service::authenticate(app.db(), hasher, "a@b.com", "new-pw").await.is_ok());
    assert!(auth_service::authenticate(app.db(), hasher, "a@b.com", "pw").await.is_err());
}

#[tokio::test]
async fn test_profile_update_validates_email() {
    let app = spawn_app().await;
    let hasher = app.state.password_hasher;
    let alice = app.seed_user("a@b.com", "pw", "Alice", Role::Standard).await;
    app.seed_user("b@b.com", "pw", "Bob", Role::Standard).await;

    let invalid = auth_service::update_profile(
        app.db(),
        hasher,
        alice.clone(),
        ProfileChanges {
            email: Some("broken@".to_string()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(invalid, Err(AppError::InvalidInput(_))));

    let taken = auth_service::update_profile(
        app.db(),
        hasher,
        alice,
        ProfileChanges {
            email: Some("b@b.com".to_string()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(taken, Err(AppError::UserAlreadyExists(_))));
}

#[tokio::test]
async fn test_resolver_follows_the_stored_identity() {
    let app = spawn_app().await;
    let codec = &app.state.token_codec;
    let alice = app.seed_user("a@b.com", "pw", "Alice", Role::Standard).await;
    let now = Utc::now();
    let token = codec.issue(alice.id, now).unwrap();

    let resolved = resolve_identity(app.db(), codec, Some(&token), now).await.unwrap();
    assert_eq!(resolved.id, alice.id);

    let missing = resolve_identity(app.db(), codec, None, now).await;
    assert!(matches!(missing, Err(AppError::Unauthenticated(_))));

    let expired = resolve_identity(app.db(), codec, Some(&token), now + Duration::days(31)).await;
    assert!(matches!(expired, Err(AppError::Unauthenticated(_))));

    alice.delete(app.db()).await.unwrap();
    let deleted = resolve_identity(app.db(), codec, Some(&token), now).await;
    assert!(matches!(deleted, Err(AppError::Unauthenticated(_))));
}
