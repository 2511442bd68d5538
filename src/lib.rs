//! media-ingest — content-addressed image ingestion with analysis dispatch
//!
//! Accepts base64-encoded images, normalizes them to a canonical JPEG
//! encoding, stores them under digest-derived sharded paths, and forwards
//! them to external analysis services (face index, general recognition).
//!
//! ## Pipeline
//!
//! ```text
//! base64 payload
//!   └─> normalize   decode PNG/JPEG, flatten alpha onto white, JPEG q100
//!   └─> hasher      SHA-256 of the canonical bytes, streamed in 8 KiB chunks
//!   └─> store       atomic rename into the sharded tree, dedup on digest
//!   └─> dispatch    multipart POST to each endpoint's /upload (best-effort)
//! ```
//!
//! ## Storage layout
//!
//! ```text
//! {store_root}/
//! ├── c9/
//! │   └── f0/
//! │       └── c9f0a50243285ecdee9cd88f9db86730.jpg
//! └── ...
//! {temp_root}/
//! └── {owner_id}.jpg        # pre-ingestion temp files, never orphaned
//! ```
//!
//! Equal digests mean byte-identical content at a single shared path; the
//! path is always recomputed from the digest, never stored. Analysis is
//! best-effort: a dispatch failure never rolls back an ingestion, and "no
//! match found" is an ordinary outcome rather than an error.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod hasher;
pub mod media;
pub mod normalize;
pub mod path_map;
pub mod pipeline;
pub mod store;

// Re-exports
pub use config::{Config, EndpointConfig, EndpointKind, StoreConfig};
pub use dispatch::{AnalysisClient, AnalysisOutcome, AnalysisReport};
pub use error::IngestError;
pub use media::{CanonicalFormat, MediaObject};
pub use pipeline::{encode_file_base64, Ingestor};
pub use store::{IngestOutcome, MediaStore};
