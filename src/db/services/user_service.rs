use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};

use crate::db::entities::user;
use crate::db::enums::Role;

// --- User Service Functions ---

/// Field values for a new `users` row. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub image: Option<String>,
}

/// Inserts a user. A duplicate email surfaces as a unique-constraint error.
pub async fn create_user(db: &DatabaseConnection, record: NewUserRecord) -> Result<user::Model, DbErr> {
    let now = Utc::now();
    let new_user = user::ActiveModel {
        email: Set(record.email),
        name: Set(record.name),
        password_hash: Set(record.password_hash),
        role: Set(record.role),
        image: Set(record.image),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    new_user.insert(db).await
}

pub async fn find_user_by_id(db: &DatabaseConnection, user_id: i32) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find_by_id(user_id).one(db).await
}

pub async fn find_user_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
}

/// Writes the changed columns of `user` in a single `UPDATE`.
pub async fn save_user(db: &DatabaseConnection, mut user: user::ActiveModel) -> Result<user::Model, DbErr> {
    user.updated_at = Set(Utc::now());
    user.update(db).await
}

fn name_or_email_contains(term: &str) -> Condition {
    Condition::any()
        .add(user::Column::Name.contains(term))
        .add(user::Column::Email.contains(term))
}

/// One page of users ordered by id, optionally filtered by a substring of
/// name or email, plus the total number of matching users.
pub async fn list_users(
    db: &DatabaseConnection,
    search: Option<&str>,
    page: u64,
    page_size: u64,
) -> Result<(Vec<user::Model>, u64), DbErr> {
    let mut select = user::Entity::find().order_by_asc(user::Column::Id);
    if let Some(term) = search {
        select = select.filter(name_or_email_contains(term));
    }

    let paginator = select.paginate(db, page_size);
    let total_items = paginator.num_items().await?;
    let users = paginator.fetch_page(page.saturating_sub(1)).await?;
    Ok((users, total_items))
}

pub async fn search_users(db: &DatabaseConnection, term: &str) -> Result<Vec<user::Model>, DbErr> {
    user::Entity::find()
        .filter(name_or_email_contains(term))
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
}
