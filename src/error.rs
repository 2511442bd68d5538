//! Error types for media-ingest

use thiserror::Error;

/// Errors surfaced by the ingestion pipeline.
///
/// Analysis-service failures are deliberately absent: absence of a match and
/// endpoint misbehavior are both [`crate::dispatch::AnalysisOutcome`] values,
/// because analysis is best-effort and must never fail an ingestion.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Invalid digest length: {length}")]
    InvalidDigest { length: usize },

    #[error("Unsupported image encoding: {0}")]
    UnsupportedFormat(String),

    #[error("No stored object for digest: {0}")]
    ObjectNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
