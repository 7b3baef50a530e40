//! Content-addressed file writes.
//!
//! A file's name is the hex SHA-256 of its bytes plus the caller's extension.
//! Writing the same bytes twice lands on the same path and simply overwrites.

use sha2::{Digest, Sha256};
use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum ContentStoreError {
    #[error("failed to write `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where a payload ended up and the digest it was named after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub hash: String,
}

impl StoredFile {
    /// Base name of the written file (`<hash><ext>`).
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.hash.clone())
    }
}

/// Lowercase hex SHA-256 of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Write `data` to `dir/<sha256><ext>` and report the path and hash.
///
/// `dir` must already exist. `ext` is appended verbatim, so it should carry
/// its leading dot (or be empty).
pub async fn write_hashed_file(
    data: &[u8],
    dir: &Path,
    ext: &str,
) -> Result<StoredFile, ContentStoreError> {
    let hash = hash_bytes(data);
    let path = dir.join(format!("{}{}", hash, ext));

    fs::write(&path, data)
        .await
        .map_err(|source| ContentStoreError::Io {
            path: path.clone(),
            source,
        })?;

    Ok(StoredFile { path, hash })
}
