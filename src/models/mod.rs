//! Core data models for the collection service.
//!
//! These entities represent collections and the images they own.
//! They map cleanly to database tables via `sqlx::FromRow` and serialize
//! naturally as JSON via `serde`.

pub mod collection;
pub mod image;
pub mod page;
