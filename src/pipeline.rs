//! End-to-end ingestion pipeline
//!
//! base64 payload -> normalize -> digest -> store -> dispatch. Stages run
//! strictly in order; the only shared state between concurrent calls is the
//! filesystem, which the store's rename semantics make safe.

use crate::dispatch::{AnalysisClient, AnalysisOutcome};
use crate::error::IngestError;
use crate::hasher::digest_file;
use crate::media::{CanonicalFormat, MediaObject};
use crate::normalize::write_normalized;
use crate::store::MediaStore;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::path::Path;
use tokio::fs;
use tracing::warn;

/// Owns the store and the configured analysis clients.
pub struct Ingestor {
    store: MediaStore,
    analyzers: Vec<AnalysisClient>,
}

impl Ingestor {
    pub fn new(store: MediaStore) -> Self {
        Self {
            store,
            analyzers: Vec::new(),
        }
    }

    /// Add an analysis endpoint to notify after each ingestion.
    pub fn with_analyzer(mut self, client: AnalysisClient) -> Self {
        self.analyzers.push(client);
        self
    }

    pub fn store(&self) -> &MediaStore {
        &self.store
    }

    /// Ingest a base64-encoded image and dispatch it to every configured
    /// analysis endpoint.
    ///
    /// Dispatch is best-effort: once the object is stored, an endpoint
    /// failure is logged and reported in the outcomes, never as an error.
    pub async fn ingest_base64(
        &self,
        owner_id: &str,
        payload: &str,
    ) -> Result<(MediaObject, Vec<AnalysisOutcome>), IngestError> {
        if payload.is_empty() {
            return Err(IngestError::UnsupportedFormat(
                "empty base64 payload".to_string(),
            ));
        }

        let raw = BASE64
            .decode(payload)
            .map_err(|e| IngestError::UnsupportedFormat(format!("invalid base64: {e}")))?;

        let temp_path = self.store.temp_path_for(owner_id);
        write_normalized(&raw, &temp_path).await?;

        // From here the temp file exists; every failure path removes it.
        // The caller still holds the source payload, so cleanup never
        // discards the only copy.
        let digest = match digest_file(&temp_path).await {
            Ok(digest) => digest,
            Err(e) => {
                remove_temp(&temp_path).await;
                return Err(e);
            }
        };

        if let Err(e) = self.store.ingest(&temp_path, &digest).await {
            remove_temp(&temp_path).await;
            return Err(e);
        }

        let object = MediaObject {
            digest,
            format: CanonicalFormat::Image,
        };

        let mut outcomes = Vec::with_capacity(self.analyzers.len());
        for client in &self.analyzers {
            match client
                .dispatch(&self.store, owner_id, &object.digest, object.format)
                .await
            {
                Ok(outcome) => {
                    if let AnalysisOutcome::ServiceError { status, detail } = &outcome {
                        warn!(
                            digest = %object.digest,
                            kind = ?client.kind(),
                            ?status,
                            detail = %detail,
                            "Analysis dispatch failed"
                        );
                    }
                    outcomes.push(outcome);
                }
                // The stored object stays put either way
                Err(e) => {
                    warn!(digest = %object.digest, kind = ?client.kind(), error = %e, "Analysis dispatch error");
                    outcomes.push(AnalysisOutcome::ServiceError {
                        status: None,
                        detail: e.to_string(),
                    });
                }
            }
        }

        Ok((object, outcomes))
    }
}

async fn remove_temp(temp_path: &Path) {
    if let Err(e) = fs::remove_file(temp_path).await {
        warn!(path = %temp_path.display(), error = %e, "Failed to remove temp file");
    }
}

/// Read a file and base64-encode it, for building ingest payloads.
pub async fn encode_file_base64<P: AsRef<Path>>(path: P) -> Result<String, IngestError> {
    let bytes = fs::read(path.as_ref()).await?;
    Ok(BASE64.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EndpointConfig, StoreConfig};
    use crate::normalize::normalize_image;
    use image::{DynamicImage, ImageFormat, RgbaImage};
    use std::io::Cursor;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png_payload() -> (Vec<u8>, String) {
        let img = RgbaImage::from_pixel(4, 4, image::Rgba([0, 128, 255, 255]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        let bytes = out.into_inner();
        let encoded = BASE64.encode(&bytes);
        (bytes, encoded)
    }

    async fn ingestor_with_temp() -> (Ingestor, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = MediaStore::new(StoreConfig::under(temp_dir.path()))
            .await
            .unwrap();
        (Ingestor::new(store), temp_dir)
    }

    async fn temp_dir_is_empty(ingestor: &Ingestor) -> bool {
        let mut entries = fs::read_dir(&ingestor.store().config().temp_root)
            .await
            .unwrap();
        entries.next_entry().await.unwrap().is_none()
    }

    #[tokio::test]
    async fn test_ingest_round_trip() {
        let (ingestor, _guard) = ingestor_with_temp().await;
        let (png, payload) = png_payload();

        let (object, outcomes) = ingestor.ingest_base64("person-1", &payload).await.unwrap();
        assert!(outcomes.is_empty());

        // Stored bytes are exactly the canonical re-encoding of the input
        let stored = ingestor
            .store()
            .read(&object.digest, object.format)
            .await
            .unwrap();
        assert_eq!(stored, normalize_image(&png).unwrap());
        assert!(temp_dir_is_empty(&ingestor).await);
    }

    #[tokio::test]
    async fn test_repeat_ingest_is_idempotent() {
        let (ingestor, _guard) = ingestor_with_temp().await;
        let (_, payload) = png_payload();

        let (first, _) = ingestor.ingest_base64("a", &payload).await.unwrap();
        let (second, _) = ingestor.ingest_base64("b", &payload).await.unwrap();

        assert_eq!(first.digest, second.digest);
        assert!(temp_dir_is_empty(&ingestor).await);
    }

    #[tokio::test]
    async fn test_invalid_base64_rejected() {
        let (ingestor, _guard) = ingestor_with_temp().await;

        let result = ingestor.ingest_base64("a", "%%% not base64 %%%").await;
        assert!(matches!(result, Err(IngestError::UnsupportedFormat(_))));

        let result = ingestor.ingest_base64("a", "").await;
        assert!(matches!(result, Err(IngestError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn test_undecodable_image_leaves_no_temp_file() {
        let (ingestor, _guard) = ingestor_with_temp().await;
        let payload = BASE64.encode(b"this is not an image");

        let result = ingestor.ingest_base64("a", &payload).await;
        assert!(matches!(result, Err(IngestError::UnsupportedFormat(_))));
        assert!(temp_dir_is_empty(&ingestor).await);
    }

    #[tokio::test]
    async fn test_dispatch_failure_does_not_fail_ingestion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let store = MediaStore::new(StoreConfig::under(temp_dir.path()))
            .await
            .unwrap();
        let ingestor = Ingestor::new(store)
            .with_analyzer(AnalysisClient::new(EndpointConfig::face_recognition(
                server.uri(),
            )));

        let (_, payload) = png_payload();
        let (object, outcomes) = ingestor.ingest_base64("person-2", &payload).await.unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(matches!(
            outcomes[0],
            AnalysisOutcome::ServiceError {
                status: Some(500),
                ..
            }
        ));
        // The object was ingested regardless
        assert!(ingestor.store().exists(&object.digest, object.format).await);
    }

    #[tokio::test]
    async fn test_dispatch_after_ingest_hits_both_endpoints() {
        let faces = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "title": "Not Found",
                "message": "no faces found."
            })))
            .expect(1)
            .mount(&faces)
            .await;

        let recognition = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "categories": [{"category": "indoor", "description": "", "score": 0.5}],
                "content-type": "image/jpeg",
                "id": "2",
                "md5": "x",
                "time": ""
            })))
            .expect(1)
            .mount(&recognition)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let store = MediaStore::new(StoreConfig::under(temp_dir.path()))
            .await
            .unwrap();
        let ingestor = Ingestor::new(store)
            .with_analyzer(AnalysisClient::new(EndpointConfig::face_recognition(
                faces.uri(),
            )))
            .with_analyzer(AnalysisClient::new(EndpointConfig::recognition(
                recognition.uri(),
            )));

        let (_, payload) = png_payload();
        let (_, outcomes) = ingestor.ingest_base64("person-3", &payload).await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0], AnalysisOutcome::NotFound));
        assert!(matches!(outcomes[1], AnalysisOutcome::Matched(_)));
        faces.verify().await;
        recognition.verify().await;
    }

    #[tokio::test]
    async fn test_encode_file_base64_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("img.bin");
        fs::write(&path, b"payload bytes").await.unwrap();

        let encoded = encode_file_base64(&path).await.unwrap();
        assert_eq!(BASE64.decode(&encoded).unwrap(), b"payload bytes");
    }
}
