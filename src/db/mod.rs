pub mod entities;
pub mod enums;
pub mod schema;
pub mod services;

use sea_orm::{DbErr, RuntimeErr, SqlErr};

/// Returns true when the database rejected a write because of a unique or
/// primary-key constraint.
pub fn is_unique_violation(err: &DbErr) -> bool {
    match err {
        DbErr::Query(RuntimeErr::SqlxError(sqlx_error))
        | DbErr::Exec(RuntimeErr::SqlxError(sqlx_error)) => match sqlx_error {
            sqlx::Error::Database(database_error) => database_error.is_unique_violation(),
            _ => false,
        },
        _ => matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))),
    }
}
