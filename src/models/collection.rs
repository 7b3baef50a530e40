//! Represents a collection: a named grouping of images.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::page::Change;

/// A collection row.
///
/// The id is opaque and never changes after creation. Timestamps are
/// milliseconds since the Unix epoch.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Collection {
    /// Opaque identifier, also used as the directory name on disk.
    pub id: String,

    /// Free-text title (required, non-empty).
    pub title: String,

    /// When this collection was created.
    pub created: i64,

    /// When this collection was last modified.
    pub updated: i64,
}

/// Parameters for inserting a collection.
///
/// Leaving both timestamps at zero stamps the row with the current time.
#[derive(Debug, Clone, Default)]
pub struct CreateCollectionParams {
    pub id: Option<String>,
    pub title: String,
    pub created: i64,
    pub updated: i64,
}

/// Field-level patch for a collection. Only fields flagged `changed` are written.
#[derive(Debug, Clone, Default)]
pub struct CollectionChanges {
    pub title: Change<String>,
    pub created: Change<i64>,
}
