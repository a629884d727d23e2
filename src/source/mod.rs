//! Activation sources: where features and custom-input samples come from

mod http;

pub use http::HttpSource;

use crate::codec::DecodeError;
use crate::feature::{Feature, Sample, SchemaError};
use async_trait::async_trait;
use thiserror::Error;

/// Warning shown when a submission is attempted with no text
pub const EMPTY_INPUT_WARNING: &str = "Please enter your input.";

/// Errors that can occur while fetching activation data
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{}", EMPTY_INPUT_WARNING)]
    EmptyInput,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status; carries the body text
    #[error("{0}")]
    Request(String),

    #[error("failed to decode response: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid response: {0}")]
    Validation(#[from] SchemaError),
}

/// Trait for activation data backends
#[async_trait]
pub trait ActivationSource: Send + Sync {
    /// Source name for logging
    fn name(&self) -> &str;

    /// Fetch a feature with its precomputed sample groups
    async fn feature(&self, dictionary: &str, feature_index: u64) -> Result<Feature, SourceError>;

    /// Run the feature over custom text and return the resulting sample
    ///
    /// Issues exactly one request per call and never retries.
    async fn custom_input(
        &self,
        dictionary: &str,
        feature_index: u64,
        text: &str,
    ) -> Result<Sample, SourceError>;
}
