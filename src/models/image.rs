//! Represents an image stored inside a collection.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Metadata for one stored image file.
///
/// `(collection_id, filename)` addresses the image. The bytes live at
/// `<collection>/images/<filename>`; `hash` is not unique across rows.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Owning collection.
    pub collection_id: String,

    /// Hex SHA-256 of the file content.
    pub hash: String,

    /// Stored base name, normally `<hash><ext>`.
    pub filename: String,

    pub created: i64,
    pub updated: i64,
}

#[derive(Debug, Clone, Default)]
pub struct CreateImageParams {
    pub collection_id: String,
    pub hash: String,
    pub filename: String,
    pub created: i64,
    pub updated: i64,
}
