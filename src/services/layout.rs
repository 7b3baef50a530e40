//! On-disk layout of the work directory.
//!
//! ```text
//! <work_dir>/data.db
//! <work_dir>/collections/<collection_id>/images/<hash><ext>
//! ```

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::fs;

const DATABASE_FILE: &str = "data.db";
const COLLECTIONS_DIR: &str = "collections";
const IMAGES_DIR: &str = "images";
const MAX_COLLECTION_ID_LEN: usize = 64;

/// Root of all persistent state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDir(PathBuf);

impl WorkDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn database_file(&self) -> PathBuf {
        self.0.join(DATABASE_FILE)
    }

    pub fn collections_dir(&self) -> PathBuf {
        self.0.join(COLLECTIONS_DIR)
    }

    /// Map a collection id to its directory. Does not touch the filesystem.
    pub fn collection_dir_by_id(&self, id: &str) -> CollectionDir {
        CollectionDir(self.collections_dir().join(id))
    }

    /// Create the work dir and its `collections` subdirectory.
    pub async fn create(&self) -> io::Result<()> {
        fs::create_dir_all(self.collections_dir()).await
    }
}

/// Directory owned by a single collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDir(PathBuf);

impl CollectionDir {
    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn images(&self) -> PathBuf {
        self.0.join(IMAGES_DIR)
    }

    /// Create the collection root and its images directory.
    ///
    /// Existing directories are fine; the parent `collections` dir must exist.
    pub async fn create(&self) -> io::Result<()> {
        for dir in [self.path().to_path_buf(), self.images()] {
            match fs::create_dir(&dir).await {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Recursively remove the collection directory. A missing directory is not an error.
    pub async fn remove(&self) -> io::Result<()> {
        match fs::remove_dir_all(self.path()).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// Ids double as directory names, so only a conservative alphabet is accepted.
pub fn is_valid_collection_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_COLLECTION_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
