//! Configuration for the media store and analysis endpoints
//!
//! Everything is an explicit struct handed to a constructor; there is no
//! process-global state, so tests can run against temporary directories and
//! mock endpoints.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("media-ingest")
}

fn default_store_root() -> PathBuf {
    default_data_dir().join("objects")
}

fn default_temp_root() -> PathBuf {
    default_data_dir().join("tmp")
}

fn default_timeout_secs() -> u64 {
    30
}

/// Filesystem layout for the content-addressed store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root of the sharded object tree
    #[serde(default = "default_store_root")]
    pub store_root: PathBuf,

    /// Directory for pre-ingestion temp files
    #[serde(default = "default_temp_root")]
    pub temp_root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_root: default_store_root(),
            temp_root: default_temp_root(),
        }
    }
}

impl StoreConfig {
    /// Config rooted under a single directory (tests, embedded use).
    pub fn under<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            store_root: root.join("objects"),
            temp_root: root.join("tmp"),
        }
    }
}

/// The two analysis services sharing the upload wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndpointKind {
    /// Face index: expects a metadata part alongside the image
    FaceRecognition,
    /// Object/scene recognition: image part only
    Recognition,
}

/// One external analysis endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL; the dispatcher posts to `{base_url}/upload`
    pub base_url: String,

    pub kind: EndpointKind,

    /// Request timeout — the only unbounded-latency operation in the
    /// pipeline is the external HTTP call, so it is always bounded here.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl EndpointConfig {
    /// Endpoint for the face-recognition service.
    pub fn face_recognition(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            kind: EndpointKind::FaceRecognition,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Endpoint for the general recognition service.
    pub fn recognition(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            kind: EndpointKind::Recognition,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Set a non-default request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    /// Zero or more analysis endpoints to notify after ingestion
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

impl Config {
    /// Load config from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save config to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
