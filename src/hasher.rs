//! Streaming content digests
//!
//! SHA-256, lowercase hex. Files are read in fixed-size chunks so peak
//! memory stays bounded regardless of input size.

use crate::error::IngestError;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Read chunk size (8 KiB)
const CHUNK_SIZE: usize = 8 * 1024;

/// Compute the content digest of a file.
///
/// Open and read failures propagate as [`IngestError::Io`]; no partial
/// digest is ever returned.
pub async fn digest_file<P: AsRef<Path>>(path: P) -> Result<String, IngestError> {
    let mut file = File::open(path.as_ref()).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the content digest of an in-memory buffer.
pub fn digest_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
