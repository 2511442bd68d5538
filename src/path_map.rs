//! Sharded storage-path derivation
//!
//! Pure digest-to-path mapping with no I/O. The two-level shard scheme
//! bounds any single directory to at most 256x256 subtrees, so directory
//! scans stay cheap no matter how large the store grows.
//!
//! The mapping is part of the on-disk contract: changing it breaks every
//! existing store.

use crate::error::IngestError;
use std::path::{Path, PathBuf};

/// Derive the storage directory and filename for a digest.
///
/// ```text
/// digest:    c9f0a50243285ecdee9cd88f9db86730
/// root:      /data/media/objects
/// directory: /data/media/objects/c9/f0
/// filename:  c9f0a50243285ecdee9cd88f9db86730.jpg
/// ```
///
/// Digests with fewer than 4 characters cannot be sharded and are rejected
/// with [`IngestError::InvalidDigest`].
pub fn derive_path(
    root: &Path,
    digest: &str,
    extension: &str,
) -> Result<(PathBuf, String), IngestError> {
    if digest.len() < 4 || !digest.is_ascii() {
        return Err(IngestError::InvalidDigest {
            length: digest.len(),
        });
    }

    let directory = root.join(&digest[0..2]).join(&digest[2..4]);
    let filename = format!("{digest}{extension}");

    Ok((directory, filename))
}
