//! SQLite persistence for collections and their images.
//!
//! Every write commits on its own; callers that also touch the filesystem
//! decide the order of the two steps.

use crate::models::{
    collection::{Collection, CollectionChanges, CreateCollectionParams},
    image::{CreateImageParams, Image},
    page::{FetchOptions, Page, page_offset, total_pages},
};
use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use thiserror::Error;
use tracing::{Span, debug};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("item not found")]
    NotFound,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

const COLLECTION_COLUMNS: &str = "id, title, created, updated";
const IMAGE_COLUMNS: &str = "collection_id, hash, filename, created, updated";

#[derive(Clone)]
pub struct CollectionRepository {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
    span: Span,
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Fresh collision-resistant collection id (32 lowercase hex chars).
pub fn new_collection_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Both timestamps unset means "stamp with now".
fn resolve_timestamps(created: i64, updated: i64) -> (i64, i64) {
    if created == 0 && updated == 0 {
        let now = now_millis();
        (now, now)
    } else {
        (created, updated)
    }
}

fn not_found_on_missing_row(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        other => RepositoryError::Sqlx(other),
    }
}

impl CollectionRepository {
    pub fn new(db: Arc<SqlitePool>, span: Span) -> Self {
        Self { db, span }
    }

    pub async fn create_collection(&self, params: CreateCollectionParams) -> RepositoryResult<String> {
        let (created, updated) = resolve_timestamps(params.created, params.updated);
        let id = params
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(new_collection_id);

        let id: String = sqlx::query_scalar(
            "INSERT INTO collections (id, title, created, updated)
             VALUES (?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&id)
        .bind(&params.title)
        .bind(created)
        .bind(updated)
        .fetch_one(&*self.db)
        .await?;

        debug!(parent: &self.span, collection_id = %id, "created collection");
        Ok(id)
    }

    pub async fn get_collection_by_id(&self, id: &str) -> RepositoryResult<Collection> {
        sqlx::query_as::<_, Collection>(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(not_found_on_missing_row)
    }

    #[cfg(test)]
    pub async fn get_all_collections(&self) -> RepositoryResult<Vec<Collection>> {
        let rows = sqlx::query_as::<_, Collection>(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections ORDER BY created ASC, id ASC"
        ))
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    /// Page through collections. `per_page <= 0` returns everything as one page.
    pub async fn get_paged_collections(
        &self,
        opts: FetchOptions,
    ) -> RepositoryResult<(Vec<Collection>, Page)> {
        let total_items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM collections")
            .fetch_one(&*self.db)
            .await?;

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections ORDER BY created ASC, id ASC"
        ));
        push_limit(&mut builder, opts);

        let items: Vec<Collection> = builder.build_query_as().fetch_all(&*self.db).await?;
        Ok((items, page_info(opts, total_items)))
    }

    /// Write the flagged fields and refresh `updated`. Nothing flagged is a no-op.
    pub async fn update_collection(
        &self,
        id: &str,
        changes: CollectionChanges,
    ) -> RepositoryResult<()> {
        if !changes.title.changed && !changes.created.changed {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE collections SET ");
        {
            let mut fields = builder.separated(", ");
            if changes.title.changed {
                fields.push("title = ");
                fields.push_bind_unseparated(changes.title.value);
            }
            if changes.created.changed {
                fields.push("created = ");
                fields.push_bind_unseparated(changes.created.value);
            }
            fields.push("updated = ");
            fields.push_bind_unseparated(now_millis());
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);

        let result = builder.build().execute(&*self.db).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        debug!(parent: &self.span, collection_id = %id, "updated collection");
        Ok(())
    }

    /// Delete a collection row together with its image rows.
    ///
    /// The directory on disk is left alone.
    pub async fn remove_collection(&self, id: &str) -> RepositoryResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM images WHERE collection_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM collections WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        debug!(parent: &self.span, collection_id = %id, "removed collection");
        Ok(())
    }

    pub async fn create_image(&self, params: CreateImageParams) -> RepositoryResult<Image> {
        let (created, updated) = resolve_timestamps(params.created, params.updated);

        let image = sqlx::query_as::<_, Image>(&format!(
            "INSERT INTO images (collection_id, hash, filename, created, updated)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(&params.collection_id)
        .bind(&params.hash)
        .bind(&params.filename)
        .bind(created)
        .bind(updated)
        .fetch_one(&*self.db)
        .await?;

        Ok(image)
    }

    #[cfg(test)]
    pub async fn get_image(&self, collection_id: &str, filename: &str) -> RepositoryResult<Image> {
        sqlx::query_as::<_, Image>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM images
             WHERE collection_id = ? AND filename = ?
             ORDER BY created ASC, rowid ASC
             LIMIT 1"
        ))
        .bind(collection_id)
        .bind(filename)
        .fetch_one(&*self.db)
        .await
        .map_err(not_found_on_missing_row)
    }

    /// All images of a collection in ingestion order.
    pub async fn get_all_images_by_collection_id(
        &self,
        collection_id: &str,
    ) -> RepositoryResult<Vec<Image>> {
        let rows = sqlx::query_as::<_, Image>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM images
             WHERE collection_id = ?
             ORDER BY created ASC, rowid ASC"
        ))
        .bind(collection_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    #[cfg(test)]
    pub async fn get_paged_images_by_collection_id(
        &self,
        collection_id: &str,
        opts: FetchOptions,
    ) -> RepositoryResult<(Vec<Image>, Page)> {
        let total_items: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM images WHERE collection_id = ?")
                .bind(collection_id)
                .fetch_one(&*self.db)
                .await?;

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {IMAGE_COLUMNS} FROM images WHERE collection_id = "
        ));
        builder.push_bind(collection_id);
        builder.push(" ORDER BY created ASC, rowid ASC");
        push_limit(&mut builder, opts);

        let items: Vec<Image> = builder.build_query_as().fetch_all(&*self.db).await?;
        Ok((items, page_info(opts, total_items)))
    }

    /// Delete every row of `collection_id` stored under `filename`.
    pub async fn remove_image(&self, collection_id: &str, filename: &str) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM images WHERE collection_id = ? AND filename = ?")
            .bind(collection_id)
            .bind(filename)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

fn push_limit(builder: &mut QueryBuilder<'_, Sqlite>, opts: FetchOptions) {
    if opts.per_page > 0 {
        builder.push(" LIMIT ");
        builder.push_bind(opts.per_page);
        builder.push(" OFFSET ");
        builder.push_bind(page_offset(opts.page, opts.per_page));
    }
}

fn page_info(opts: FetchOptions, total_items: i64) -> Page {
    Page {
        page: opts.page,
        per_page: opts.per_page,
        total_items,
        total_pages: total_pages(opts.per_page, total_items),
    }
}
