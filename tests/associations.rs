mod common;

use sea_orm::{EntityTrait, ModelTrait, PaginatorTrait};

use common::spawn_app;
use tag_registry::db::entities::user_tag;
use tag_registry::db::enums::Role;
use tag_registry::db::services::{self, TagChanges};
use tag_registry::web::error::AppError;

#[tokio::test]
async fn test_add_tag_twice_keeps_one_association() {
    let app = spawn_app().await;
    let alice = app.seed_user("a@b.com", "pw", "Alice", Role::Standard).await;
    let rust = services::create_tag(app.db(), "rust", None).await.unwrap();

    let added = services::add_tag_to_user(app.db(), &alice, "rust").await.unwrap();
    assert_eq!(added.id, rust.id);

    let again = services::add_tag_to_user(app.db(), &alice, "rust").await;
    assert!(matches!(again, Err(AppError::AlreadyAssociated)));

    assert_eq!(services::count_associations(app.db(), alice.id, rust.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_storage_rejects_duplicate_pair_without_fast_path() {
    let app = spawn_app().await;
    let alice = app.seed_user("a@b.com", "pw", "Alice", Role::Standard).await;
    let rust = services::create_tag(app.db(), "rust", None).await.unwrap();

    services::link_tag_to_user(app.db(), alice.id, rust.id).await.unwrap();
    let second = services::link_tag_to_user(app.db(), alice.id, rust.id).await;
    assert!(matches!(second, Err(AppError::AlreadyAssociated)));

    assert_eq!(services::count_associations(app.db(), alice.id, rust.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_unknown_tag_is_not_found() {
    let app = spawn_app().await;
    let alice = app.seed_user("a@b.com", "pw", "Alice", Role::Standard).await;

    match services::add_tag_to_user(app.db(), &alice, "missing").await {
        Err(AppError::NotFound(msg)) => assert_eq!(msg, "Tag not found"),
        other => panic!("expected not found, got {other:?}"),
    }
    let empty = services::add_tag_to_user(app.db(), &alice, "  ").await;
    assert!(matches!(empty, Err(AppError::InvalidInput(_))));
}

#[tokio::test]
async fn test_tags_are_listed_in_association_order() {
    let app = spawn_app().await;
    let alice = app.seed_user("a@b.com", "pw", "Alice", Role::Standard).await;
    for name in ["zig", "rust", "go"] {
        services::create_tag(app.db(), name, None).await.unwrap();
    }
    for name in ["rust", "zig", "go"] {
        services::add_tag_to_user(app.db(), &alice, name).await.unwrap();
    }

    let names: Vec<String> = services::get_tags_for_user(app.db(), alice.id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, ["rust", "zig", "go"]);
}

#[tokio::test]
async fn test_deleting_user_or_tag_cascades() {
    let app = spawn_app().await;
    let alice = app.seed_user("a@b.com", "pw", "Alice", Role::Standard).await;
    let bob = app.seed_user("b@b.com", "pw", "Bob", Role::Standard).await;
    let rust = services::create_tag(app.db(), "rust", None).await.unwrap();
    let go = services::create_tag(app.db(), "go", None).await.unwrap();
    for user in [&alice, &bob] {
        services::add_tag_to_user(app.db(), user, "rust").await.unwrap();
        services::add_tag_to_user(app.db(), user, "go").await.unwrap();
    }
    assert_eq!(user_tag::Entity::find().count(app.db()).await.unwrap(), 4);

    alice.delete(app.db()).await.unwrap();
    assert_eq!(user_tag::Entity::find().count(app.db()).await.unwrap(), 2);

    go.delete(app.db()).await.unwrap();
    let remaining = services::get_tags_for_user(app.db(), bob.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, rust.id);
    assert_eq!(user_tag::Entity::find().count(app.db()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_tag_names_are_unique() {
    let app = spawn_app().await;
    services::create_tag(app.db(), "rust", None).await.unwrap();

    match services::create_tag(app.db(), "rust", None).await {
        Err(AppError::Conflict(msg)) => assert_eq!(msg, "The tag name already exists"),
        other => panic!("expected conflict, got {other:?}"),
    }

    let go = services::create_tag(app.db(), "go", None).await.unwrap();
    let renamed = services::update_tag(
        app.db(),
        go,
        TagChanges {
            name: Some("rust".to_string()),
            image: None,
        },
    )
    .await;
    assert!(matches!(renamed, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_partial_tag_update() {
    let app = spawn_app().await;
    let tag = services::create_tag(app.db(), "rust", Some("old.png".to_string()))
        .await
        .unwrap();

    let unchanged = services::update_tag(app.db(), tag.clone(), TagChanges::default())
        .await
        .unwrap();
    assert_eq!(unchanged, tag);

    let with_image = services::update_tag(
        app.db(),
        tag.clone(),
        TagChanges {
            name: Some(String::new()),
            image: Some("new.png".to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(with_image.name, "rust");
    assert_eq!(with_image.image.as_deref(), Some("new.png"));

    let users = services::get_users_for_tag(app.db(), tag.id).await.unwrap();
    assert!(users.is_empty());
}
