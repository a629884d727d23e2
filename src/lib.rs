//! actview - Feature activation viewer for sparse-autoencoder dictionaries
//!
//! This crate provides:
//! - A typed model of features, sample groups and samples with validation
//! - MessagePack decoding with snake_case to camelCase key normalization
//! - An HTTP client for the activation backend (feature pages and custom input)
//! - The custom-input panel state and a terminal renderer for feature cards

pub mod codec;
pub mod feature;
pub mod panel;
pub mod render;
pub mod source;

pub use feature::{analysis_label, Feature, Sample, SampleGroup};
pub use panel::CustomInputPanel;
pub use source::{ActivationSource, HttpSource, SourceError};

use std::path::Path;
use thiserror::Error;

/// Environment variable that overrides the configured backend URL
pub const BACKEND_URL_ENV: &str = "ACTVIEW_BACKEND_URL";

/// Errors from loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for the viewer
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ViewerConfig {
    /// Base URL of the activation backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Request timeout in seconds (None = wait indefinitely)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_backend_url() -> String {
    "http://localhost:24577".to_string()
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            timeout_secs: None,
        }
    }
}

impl ViewerConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Apply an override for the backend URL, ignoring blank values
    pub fn with_backend_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.backend_url = url;
        }
        self
    }

    /// Apply the `ACTVIEW_BACKEND_URL` environment variable if set
    pub fn with_env_overrides(self) -> Self {
        let url = std::env::var(BACKEND_URL_ENV).ok();
        self.with_backend_url(url)
    }
}
