//! Dispatch of stored objects to external analysis endpoints
//!
//! Both analysis services (face index, general recognition) share one wire
//! shape: multipart POST to `{base}/upload` with the raw image bytes. The
//! differences — whether a metadata part rides along, and the shape of the
//! success payload — are driven by [`EndpointKind`], so there is exactly one
//! upload routine and one response-classification rule.

use crate::config::{EndpointConfig, EndpointKind};
use crate::error::IngestError;
use crate::media::CanonicalFormat;
use crate::store::MediaStore;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

/// Namespace tag the face index files stored objects under
const METADATA_NAMESPACE: &str = "legion";

/// Sentinel message the face index returns when the image has no face.
/// Compared case-insensitively; this is the only place the rule lives.
const NO_FACES_MESSAGE: &str = "no faces found.";

/// Success payload from the face index
#[derive(Debug, Clone, Deserialize)]
pub struct FaceIndexResponse {
    pub hash: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub file: String,
}

/// One classification from the recognition service
#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionCategory {
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub score: f64,
}

/// Success payload from the recognition service
#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionResponse {
    pub categories: Vec<RecognitionCategory>,
    #[serde(rename = "content-type", default)]
    pub content_type: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub md5: String,
    #[serde(default)]
    pub time: String,
}

/// Error payload analysis services return alongside non-200 statuses
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    title: String,
    #[serde(default)]
    message: String,
}

/// Metadata part attached to face-index uploads
#[derive(Debug, Serialize)]
struct FaceMetadata {
    /// Retrieval path for the stored object (query key is frozen wire text)
    path: String,
    #[serde(rename = "type")]
    namespace: &'static str,
    /// Client-side route back to the owning record
    link: String,
}

/// Decoded success payload, per endpoint kind
#[derive(Debug, Clone)]
pub enum AnalysisReport {
    Face(FaceIndexResponse),
    Recognition(RecognitionResponse),
}

/// Result of one dispatch.
///
/// `NotFound` is a normal outcome, not an error: most images contain no
/// recognizable face. `ServiceError` covers transport failures and
/// unexpected statuses; retrying is the caller's decision.
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Matched(AnalysisReport),
    NotFound,
    ServiceError {
        /// HTTP status, absent for transport-level failures
        status: Option<u16>,
        detail: String,
    },
}

/// Client for one analysis endpoint
pub struct AnalysisClient {
    client: Client,
    config: EndpointConfig,
}

impl AnalysisClient {
    /// Build a client with the endpoint's request timeout applied.
    pub fn new(config: EndpointConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    pub fn kind(&self) -> EndpointKind {
        self.config.kind
    }

    fn upload_url(&self) -> String {
        format!("{}/upload", self.config.base_url.trim_end_matches('/'))
    }

    /// Upload a stored object for analysis and classify the response.
    ///
    /// Fails with [`IngestError::ObjectNotFound`] when nothing is stored
    /// under the digest; every endpoint-side problem comes back as an
    /// [`AnalysisOutcome`] instead of an error.
    pub async fn dispatch(
        &self,
        store: &MediaStore,
        owner_id: &str,
        digest: &str,
        format: CanonicalFormat,
    ) -> Result<AnalysisOutcome, IngestError> {
        let path = store.canonical_path(digest, format).await?;
        let bytes = fs::read(&path).await?;

        let image = Part::bytes(bytes)
            .file_name(format!("{digest}{}", format.extension()))
            .mime_str(format.mime())
            .expect("canonical mime type is valid");

        let mut form = Form::new().part("image", image);

        if self.config.kind == EndpointKind::FaceRecognition {
            let metadata = FaceMetadata {
                path: format!("files?md5hash={digest}&format={}", format.label()),
                namespace: METADATA_NAMESPACE,
                link: format!("#/person/{owner_id}"),
            };
            form = form.text("data", serde_json::to_string(&metadata)?);
        }

        let url = self.upload_url();
        debug!(endpoint = %url, digest = %digest, kind = ?self.config.kind, "Dispatching stored object");

        let response = match self.client.post(&url).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(endpoint = %url, error = %e, "Analysis endpoint unreachable");
                return Ok(AnalysisOutcome::ServiceError {
                    status: e.status().map(|s| s.as_u16()),
                    detail: e.to_string(),
                });
            }
        };

        Ok(self.classify_response(response).await)
    }

    /// Single definition of the response contract for both endpoint kinds.
    async fn classify_response(&self, response: reqwest::Response) -> AnalysisOutcome {
        let status = response.status();

        if status == StatusCode::OK {
            return match self.config.kind {
                EndpointKind::FaceRecognition => {
                    match response.json::<FaceIndexResponse>().await {
                        Ok(body) => {
                            info!(face_hash = %body.hash, "Face indexed");
                            AnalysisOutcome::Matched(AnalysisReport::Face(body))
                        }
                        Err(e) => AnalysisOutcome::ServiceError {
                            status: Some(status.as_u16()),
                            detail: format!("undecodable success payload: {e}"),
                        },
                    }
                }
                EndpointKind::Recognition => {
                    match response.json::<RecognitionResponse>().await {
                        Ok(body) => {
                            if let Some(first) = body.categories.first() {
                                info!(category = %first.category, "Recognition category");
                            }
                            AnalysisOutcome::Matched(AnalysisReport::Recognition(body))
                        }
                        Err(e) => AnalysisOutcome::ServiceError {
                            status: Some(status.as_u16()),
                            detail: format!("undecodable success payload: {e}"),
                        },
                    }
                }
            };
        }

        let body = response.text().await.unwrap_or_default();

        // A 404 whose payload carries the sentinel message means the image
        // was processed and simply contained no face.
        if status == StatusCode::NOT_FOUND {
            if let Ok(err) = serde_json::from_str::<ServiceErrorBody>(&body) {
                if err.message.eq_ignore_ascii_case(NO_FACES_MESSAGE) {
                    debug!(title = %err.title, "No faces found");
                    return AnalysisOutcome::NotFound;
                }
            }
        }

        AnalysisOutcome::ServiceError {
            status: Some(status.as_u16()),
            detail: body,
        }
    }
}
