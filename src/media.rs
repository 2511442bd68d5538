//! Core media types

use serde::{Deserialize, Serialize};

/// The single encoding every accepted image is normalized into.
///
/// One variant today (JPEG); the enum exists so the extension and mime
/// mapping have exactly one definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanonicalFormat {
    Image,
}

impl CanonicalFormat {
    /// File extension used at the canonical storage path.
    pub fn extension(&self) -> &'static str {
        match self {
            CanonicalFormat::Image => ".jpg",
        }
    }

    /// Content type sent with the multipart image part.
    pub fn mime(&self) -> &'static str {
        match self {
            CanonicalFormat::Image => "image/jpeg",
        }
    }

    /// Wire label used in dispatch metadata.
    pub fn label(&self) -> &'static str {
        match self {
            CanonicalFormat::Image => "IMAGE",
        }
    }
}

/// A stored, normalized media object.
///
/// The storage path is never carried here; it is always recomputed from the
/// digest, which keeps path derivation the single source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaObject {
    /// Lowercase hex content digest of the canonical bytes
    pub digest: String,
    pub format: CanonicalFormat,
}
