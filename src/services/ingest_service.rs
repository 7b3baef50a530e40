//! Turns uploaded ZIP archives into stored images.
//!
//! For every archive entry, in natural order of entry names:
//! 1. the bytes are decompressed into memory,
//! 2. written to `<collection>/images/<sha256><ext>`,
//! 3. recorded as an `images` row.
//!
//! Each step is awaited before the next entry is read. The first failure
//! stops the upload; files and rows written before it stay in place.

use crate::{
    models::{
        collection::Collection,
        image::{CreateImageParams, Image},
    },
    services::{
        archive::{ArchiveError, ArchiveExtractor, entry_extension, sanitize_entry_name},
        collection_repository::{CollectionRepository, RepositoryError},
        content_store::{ContentStoreError, write_hashed_file},
        layout::WorkDir,
    },
};
use bytes::Bytes;
use serde::Serialize;
use std::io::{self, Cursor};
use thiserror::Error;
use tracing::{Span, debug, info, warn};

const ZIP_MEDIA_TYPES: [&str; 2] = ["application/zip", "application/x-zip-compressed"];

/// Coarse classification used by the HTTP layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    ArchiveInvalid,
    StorageIo,
    PersistenceFailure,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("collection `{0}` not found")]
    CollectionNotFound(String),
    #[error("invalid upload: {0}")]
    Validation(String),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Storage(#[from] ContentStoreError),
    #[error("failed to prepare collection directory: {0}")]
    Directory(#[source] io::Error),
    #[error("failed to record image: {0}")]
    Persistence(#[source] RepositoryError),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::CollectionNotFound(_) => ErrorKind::NotFound,
            IngestError::Validation(_) => ErrorKind::Validation,
            IngestError::Archive(_) => ErrorKind::ArchiveInvalid,
            IngestError::Storage(_) | IngestError::Directory(_) => ErrorKind::StorageIo,
            IngestError::Persistence(RepositoryError::NotFound) => ErrorKind::NotFound,
            IngestError::Persistence(_) => ErrorKind::PersistenceFailure,
        }
    }
}

/// A file received in an upload request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    /// Declared `Content-Type` of the part, as sent by the client.
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub images: Vec<Image>,
}

#[derive(Clone)]
pub struct IngestionService {
    repo: CollectionRepository,
    work_dir: WorkDir,
    span: Span,
}

impl IngestionService {
    pub fn new(repo: CollectionRepository, work_dir: WorkDir, span: Span) -> Self {
        Self {
            repo,
            work_dir,
            span,
        }
    }

    /// Ingest every uploaded file into `collection_id`, in the order received.
    ///
    /// Stops at the first file that fails; earlier files stay ingested and
    /// later ones are not attempted.
    pub async fn ingest_files(
        &self,
        collection_id: &str,
        files: Vec<UploadedFile>,
    ) -> Result<IngestReport, IngestError> {
        let collection = self
            .repo
            .get_collection_by_id(collection_id)
            .await
            .map_err(|err| match err {
                RepositoryError::NotFound => {
                    IngestError::CollectionNotFound(collection_id.to_string())
                }
                other => IngestError::Persistence(other),
            })?;

        self.work_dir
            .collection_dir_by_id(&collection.id)
            .create()
            .await
            .map_err(IngestError::Directory)?;

        let mut report = IngestReport::default();
        for file in files {
            match self.ingest_upload(&collection, file).await? {
                Some(images) => {
                    report.files_processed += 1;
                    report.images.extend(images);
                }
                None => report.files_skipped += 1,
            }
        }

        info!(
            parent: &self.span,
            collection_id = %collection.id,
            processed = report.files_processed,
            skipped = report.files_skipped,
            images = report.images.len(),
            "upload finished"
        );
        Ok(report)
    }

    /// Ingest one file. Returns `None` when the file is not a ZIP archive.
    ///
    /// The collection's directories must already exist.
    pub async fn ingest_upload(
        &self,
        collection: &Collection,
        file: UploadedFile,
    ) -> Result<Option<Vec<Image>>, IngestError> {
        let Some(content_type) = file.content_type.as_deref() else {
            debug!(parent: &self.span, file = ?file.file_name, "no content type, skipping");
            return Ok(None);
        };

        let media_type = parse_media_type(content_type)
            .ok_or_else(|| IngestError::Validation(format!("bad content type `{content_type}`")))?;

        if !ZIP_MEDIA_TYPES.contains(&media_type.as_str()) {
            debug!(parent: &self.span, file = ?file.file_name, %media_type, "not an archive, skipping");
            return Ok(None);
        }

        self.ingest_archive(collection, file.data).await.map(Some)
    }

    async fn ingest_archive(
        &self,
        collection: &Collection,
        data: Bytes,
    ) -> Result<Vec<Image>, IngestError> {
        let images_dir = self.work_dir.collection_dir_by_id(&collection.id).images();
        let extractor = ArchiveExtractor::open(Cursor::new(data))?;
        if extractor.is_empty() {
            debug!(parent: &self.span, "archive has no file entries");
        } else {
            debug!(parent: &self.span, entries = extractor.len(), "opened archive");
        }

        let mut images = Vec::with_capacity(extractor.len());
        for entry in extractor {
            let entry = entry?;
            let Some(base_name) = sanitize_entry_name(&entry.name) else {
                warn!(parent: &self.span, entry = %entry.name, "skipping entry without a usable name");
                continue;
            };

            let stored =
                write_hashed_file(&entry.data, &images_dir, entry_extension(base_name)).await?;
            debug!(parent: &self.span, entry = %entry.name, path = %stored.path.display(), "stored entry");

            let image = self
                .repo
                .create_image(CreateImageParams {
                    collection_id: collection.id.clone(),
                    filename: stored.filename(),
                    hash: stored.hash,
                    ..Default::default()
                })
                .await
                .map_err(IngestError::Persistence)?;
            images.push(image);
        }

        Ok(images)
    }
}

/// Lowercased `type/subtype` of a `Content-Type` value, parameters dropped.
fn parse_media_type(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next()?.trim();
    let (kind, subtype) = essence.split_once('/')?;
    if kind.is_empty() || subtype.is_empty() || essence.contains(char::is_whitespace) {
        return None;
    }
    Some(essence.to_ascii_lowercase())
}
