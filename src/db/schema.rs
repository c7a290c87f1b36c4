use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};
use tracing::info;

use crate::db::entities::{tag, user, user_tag};

/// Creates the `users`, `tags` and `user_tags` tables when they do not exist.
/// Existing tables are left untouched; there is no migration step.
pub async fn sync_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = [
        schema.create_table_from_entity(user::Entity),
        schema.create_table_from_entity(tag::Entity),
        schema.create_table_from_entity(user_tag::Entity),
    ];

    for statement in statements.iter_mut() {
        statement.if_not_exists();
        db.execute(backend.build(&*statement)).await?;
    }

    info!("Database schema is in place.");
    Ok(())
}
