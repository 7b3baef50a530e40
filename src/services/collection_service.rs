//! Collection lifecycle: keeps the `collections` table and the collection
//! directories in step.
//!
//! Creation makes the directory first and then the row. Deletion removes the
//! rows first and then the directory tree in one recursive removal.

use crate::{
    models::{
        collection::{Collection, CollectionChanges, CreateCollectionParams},
        image::Image,
        page::{Change, FetchOptions, Page},
    },
    services::{
        archive::sanitize_entry_name,
        collection_repository::{CollectionRepository, RepositoryError, new_collection_id},
        layout::{WorkDir, is_valid_collection_id},
    },
};
use std::{
    io::{self, ErrorKind},
    path::PathBuf,
};
use thiserror::Error;
use tokio::fs;
use tracing::{Span, info};

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("collection not found")]
    NotFound,
    #[error("image not found")]
    ImageNotFound,
    #[error("{0}")]
    Validation(String),
    #[error("filesystem error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CollectionError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => CollectionError::NotFound,
            other => CollectionError::Repository(other),
        }
    }
}

pub type CollectionResult<T> = Result<T, CollectionError>;

#[derive(Clone)]
pub struct CollectionService {
    repo: CollectionRepository,
    work_dir: WorkDir,
    span: Span,
}

/// Trim a title and make sure something is left.
fn normalize_title(title: &str) -> CollectionResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CollectionError::Validation("title is required".into()));
    }
    Ok(title.to_string())
}

impl CollectionService {
    pub fn new(repo: CollectionRepository, work_dir: WorkDir, span: Span) -> Self {
        Self {
            repo,
            work_dir,
            span,
        }
    }

    #[cfg(test)]
    pub fn repository(&self) -> &CollectionRepository {
        &self.repo
    }

    /// Look up a collection; ids that could not name a directory are simply unknown.
    pub async fn get(&self, id: &str) -> CollectionResult<Collection> {
        if !is_valid_collection_id(id) {
            return Err(CollectionError::NotFound);
        }
        Ok(self.repo.get_collection_by_id(id).await?)
    }

    pub async fn list(&self, opts: FetchOptions) -> CollectionResult<(Vec<Collection>, Page)> {
        Ok(self.repo.get_paged_collections(opts).await?)
    }

    pub async fn images(&self, id: &str) -> CollectionResult<Vec<Image>> {
        let collection = self.get(id).await?;
        Ok(self
            .repo
            .get_all_images_by_collection_id(&collection.id)
            .await?)
    }

    pub async fn create(&self, title: &str) -> CollectionResult<Collection> {
        let title = normalize_title(title)?;
        let id = new_collection_id();

        self.work_dir.collection_dir_by_id(&id).create().await?;
        let id = self
            .repo
            .create_collection(CreateCollectionParams {
                id: Some(id),
                title,
                ..Default::default()
            })
            .await?;

        info!(parent: &self.span, collection_id = %id, "collection created");
        self.get(&id).await
    }

    /// Apply an edit. `title: None` leaves the title alone; a title equal to
    /// the stored one is not flagged as changed.
    pub async fn edit(&self, id: &str, title: Option<&str>) -> CollectionResult<()> {
        let collection = self.get(id).await?;

        let mut changes = CollectionChanges::default();
        if let Some(title) = title {
            let title = normalize_title(title)?;
            changes.title = Change {
                changed: title != collection.title,
                value: title,
            };
        }

        Ok(self.repo.update_collection(&collection.id, changes).await?)
    }

    /// Remove the collection's rows, then its whole directory tree.
    pub async fn delete(&self, id: &str) -> CollectionResult<()> {
        let collection = self.get(id).await?;

        self.repo.remove_collection(&collection.id).await?;
        self.work_dir
            .collection_dir_by_id(&collection.id)
            .remove()
            .await?;

        info!(parent: &self.span, collection_id = %collection.id, "collection deleted");
        Ok(())
    }

    /// Remove an image's rows and its file.
    pub async fn delete_image(&self, id: &str, filename: &str) -> CollectionResult<()> {
        let path = self.image_path(id, filename)?;
        let collection = self.get(id).await?;

        self.repo
            .remove_image(&collection.id, filename)
            .await
            .map_err(|err| match err {
                RepositoryError::NotFound => CollectionError::ImageNotFound,
                other => CollectionError::Repository(other),
            })?;

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    /// Path of a stored image file, refusing anything that is not a bare file name.
    pub fn image_path(&self, id: &str, filename: &str) -> CollectionResult<PathBuf> {
        if !is_valid_collection_id(id) {
            return Err(CollectionError::NotFound);
        }
        if sanitize_entry_name(filename) != Some(filename) {
            return Err(CollectionError::ImageNotFound);
        }
        Ok(self.work_dir.collection_dir_by_id(id).images().join(filename))
    }
}
