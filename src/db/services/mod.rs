//! Data access for users, tags and their associations.
//!
//! Functions here talk to the database through SeaORM and return either raw
//! `DbErr`s (plain reads and writes) or `AppError`s where a constraint
//! violation has a domain meaning that must not leak out as a generic
//! database failure.

pub mod tag_service;
pub mod user_service;

pub use tag_service::*;
pub use user_service::*;
