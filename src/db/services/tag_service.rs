use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::{info, warn};

use crate::db::entities::{tag, user, user_tag};
use crate::db::is_unique_violation;
use crate::web::error::AppError;

// --- Tag Service Functions ---

const DUPLICATE_TAG_NAME: &str = "The tag name already exists";

/// Partial update of a tag. Absent or empty values leave the column as is.
#[derive(Debug, Clone, Default)]
pub struct TagChanges {
    pub name: Option<String>,
    pub image: Option<String>,
}

fn map_tag_write_error(err: DbErr) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict(DUPLICATE_TAG_NAME.to_string())
    } else {
        AppError::DatabaseError(err.to_string())
    }
}

/// Creates a tag. Tag names are unique; a clash is reported as a conflict.
pub async fn create_tag(
    db: &DatabaseConnection,
    name: &str,
    image: Option<String>,
) -> Result<tag::Model, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("Tag name is required.".to_string()));
    }

    let now = Utc::now();
    let new_tag = tag::ActiveModel {
        name: Set(name.to_string()),
        image: Set(image),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = new_tag.insert(db).await.map_err(map_tag_write_error)?;
    info!(tag_id = created.id, name = %created.name, "Created tag.");
    Ok(created)
}

/// Applies `changes` to `tag` in a single `UPDATE`. Returns the tag unchanged
/// when nothing was submitted.
pub async fn update_tag(
    db: &DatabaseConnection,
    tag: tag::Model,
    changes: TagChanges,
) -> Result<tag::Model, AppError> {
    let mut active: tag::ActiveModel = tag.clone().into();

    if let Some(name) = changes.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        if name != tag.name {
            active.name = Set(name);
        }
    }
    if let Some(image) = changes.image.filter(|i| !i.is_empty()) {
        active.image = Set(Some(image));
    }

    if !active.is_changed() {
        return Ok(tag);
    }

    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(map_tag_write_error)
}

pub async fn find_tag_by_id(db: &DatabaseConnection, tag_id: i32) -> Result<Option<tag::Model>, DbErr> {
    tag::Entity::find_by_id(tag_id).one(db).await
}

pub async fn find_tag_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<tag::Model>, DbErr> {
    tag::Entity::find()
        .filter(tag::Column::Name.eq(name))
        .one(db)
        .await
}

/// One page of tags ordered by name, optionally filtered by a substring of the
/// name, plus the total number of matching tags.
pub async fn list_tags(
    db: &DatabaseConnection,
    search: Option<&str>,
    order: Order,
    page: u64,
    page_size: u64,
) -> Result<(Vec<tag::Model>, u64), DbErr> {
    let mut select = tag::Entity::find()
        .order_by(tag::Column::Name, order)
        .order_by_asc(tag::Column::Id);
    if let Some(term) = search {
        select = select.filter(tag::Column::Name.contains(term));
    }

    let paginator = select.paginate(db, page_size);
    let total_items = paginator.num_items().await?;
    let tags = paginator.fetch_page(page.saturating_sub(1)).await?;
    Ok((tags, total_items))
}

pub async fn search_tags(db: &DatabaseConnection, term: &str) -> Result<Vec<tag::Model>, DbErr> {
    tag::Entity::find()
        .filter(tag::Column::Name.contains(term))
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await
}

// --- User <-> Tag Associations ---

/// Tags associated with a user, in the order they were associated.
pub async fn get_tags_for_user(db: &DatabaseConnection, user_id: i32) -> Result<Vec<tag::Model>, DbErr> {
    tag::Entity::find()
        .inner_join(user_tag::Entity)
        .filter(user_tag::Column::UserId.eq(user_id))
        .order_by_asc(user_tag::Column::CreatedAt)
        .order_by_asc(tag::Column::Id)
        .all(db)
        .await
}

/// Users carrying a tag, in the order they were associated.
pub async fn get_users_for_tag(db: &DatabaseConnection, tag_id: i32) -> Result<Vec<user::Model>, DbErr> {
    user::Entity::find()
        .inner_join(user_tag::Entity)
        .filter(user_tag::Column::TagId.eq(tag_id))
        .order_by_asc(user_tag::Column::CreatedAt)
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
}

pub async fn count_associations(db: &DatabaseConnection, user_id: i32, tag_id: i32) -> Result<u64, DbErr> {
    user_tag::Entity::find()
        .filter(user_tag::Column::UserId.eq(user_id))
        .filter(user_tag::Column::TagId.eq(tag_id))
        .count(db)
        .await
}

/// Inserts the (user, tag) pair. The composite primary key of `user_tags` is
/// what keeps the pair unique; losing a race against a concurrent insert of
/// the same pair is reported exactly like the pre-check in `add_tag_to_user`.
pub async fn link_tag_to_user(db: &DatabaseConnection, user_id: i32, tag_id: i32) -> Result<(), AppError> {
    let association = user_tag::ActiveModel {
        user_id: Set(user_id),
        tag_id: Set(tag_id),
        created_at: Set(Utc::now()),
    };

    match user_tag::Entity::insert(association).exec_without_returning(db).await {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => {
            warn!(user_id, tag_id, "Association insert hit the uniqueness constraint.");
            Err(AppError::AlreadyAssociated)
        }
        Err(e) => Err(AppError::DatabaseError(e.to_string())),
    }
}

/// Associates the tag named `tag_name` with `user`.
///
/// The tag must already exist. The name check against the user's current tags
/// is only a fast path; `link_tag_to_user` enforces uniqueness for real.
pub async fn add_tag_to_user(
    db: &DatabaseConnection,
    user: &user::Model,
    tag_name: &str,
) -> Result<tag::Model, AppError> {
    let tag_name = tag_name.trim();
    if tag_name.is_empty() {
        return Err(AppError::InvalidInput("Tag name is required.".to_string()));
    }

    let tag = find_tag_by_name(db, tag_name)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;

    let current_tags = get_tags_for_user(db, user.id).await?;
    if current_tags.iter().any(|existing| existing.name == tag.name) {
        return Err(AppError::AlreadyAssociated);
    }

    link_tag_to_user(db, user.id, tag.id).await?;
    info!(user_id = user.id, tag_id = tag.id, "Associated tag with user.");
    Ok(tag)
}
