//! SeaORM entities for the three tables the service owns.
//!
//! `user_tags` is the join table of the many-to-many relation; its composite
//! primary key is the authoritative guard against duplicate associations.

pub mod tag;
pub mod user;
pub mod user_tag;
