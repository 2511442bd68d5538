//! Content-addressed media store
//!
//! Places normalized files at digest-derived sharded paths. Placement is a
//! single atomic rename, so concurrent ingests of the same content are safe
//! without locks: the second writer observes the existing file and discards
//! its temp copy.

use crate::config::StoreConfig;
use crate::error::IngestError;
use crate::media::CanonicalFormat;
use crate::path_map::derive_path;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

/// Result of placing a file in the store
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Canonical path the content now lives at
    pub path: PathBuf,
    /// Whether identical content was already stored
    pub already_existed: bool,
}

/// Content-addressed file store
pub struct MediaStore {
    config: StoreConfig,
}

impl MediaStore {
    /// Create a store, ensuring its root and temp directories exist.
    pub async fn new(config: StoreConfig) -> Result<Self, IngestError> {
        fs::create_dir_all(&config.store_root).await?;
        fs::create_dir_all(&config.temp_root).await?;

        info!(root = %config.store_root.display(), "Initialized media store");

        Ok(Self { config })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Temp-file location for a request, named by the owner id so a crashed
    /// request can be traced back. Falls back to a UUID for empty ids.
    pub fn temp_path_for(&self, owner_id: &str) -> PathBuf {
        let stem = if owner_id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            owner_id.to_string()
        };
        self.config
            .temp_root
            .join(format!("{stem}{}", CanonicalFormat::Image.extension()))
    }

    /// Move a temp file to its canonical digest-derived path.
    ///
    /// If the target already exists the content is already stored (equal
    /// digest means byte-identical content), and the temp file is deleted
    /// instead. Either way, on success exactly one file exists at the
    /// canonical path and the temp file is gone.
    ///
    /// A failed rename leaves the temp file in place rather than deleting
    /// the only copy of the data.
    pub async fn ingest(&self, temp_path: &Path, digest: &str) -> Result<IngestOutcome, IngestError> {
        let extension = temp_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let (directory, filename) = derive_path(&self.config.store_root, digest, &extension)?;
        let target = directory.join(&filename);

        if fs::metadata(&target).await.is_ok() {
            fs::remove_file(temp_path).await?;
            debug!(digest = %digest, "Content already stored, removed temp file");
            return Ok(IngestOutcome {
                path: target,
                already_existed: true,
            });
        }

        fs::create_dir_all(&directory).await?;
        fs::rename(temp_path, &target).await?;

        info!(digest = %digest, path = %target.display(), "Stored media object");

        Ok(IngestOutcome {
            path: target,
            already_existed: false,
        })
    }

    /// Resolve the canonical path for a stored object.
    ///
    /// Fails with [`IngestError::ObjectNotFound`] if nothing is stored under
    /// the digest.
    pub async fn canonical_path(
        &self,
        digest: &str,
        format: CanonicalFormat,
    ) -> Result<PathBuf, IngestError> {
        let (directory, filename) =
            derive_path(&self.config.store_root, digest, format.extension())?;
        let path = directory.join(filename);

        if fs::metadata(&path).await.is_err() {
            return Err(IngestError::ObjectNotFound(digest.to_string()));
        }

        Ok(path)
    }

    /// Whether an object is stored under the digest.
    pub async fn exists(&self, digest: &str, format: CanonicalFormat) -> bool {
        self.canonical_path(digest, format).await.is_ok()
    }

    /// Read a stored object's canonical bytes.
    pub async fn read(&self, digest: &str, format: CanonicalFormat) -> Result<Vec<u8>, IngestError> {
        let path = self.canonical_path(digest, format).await?;
        Ok(fs::read(&path).await?)
    }
}
