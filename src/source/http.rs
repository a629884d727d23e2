//! HTTP backend that serves MessagePack-encoded activations

use super::{ActivationSource, SourceError};
use crate::codec::{self, MSGPACK_MIME};
use crate::feature::{self, Feature, Sample, Validate};
use crate::ViewerConfig;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Client for the activation backend's REST API
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    /// Create a source for `base_url` with no request timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self, SourceError> {
        Ok(Self::with_client(base_url, Client::builder().build()?))
    }

    /// Create a source from configuration
    pub fn from_config(config: &ViewerConfig) -> Result<Self, SourceError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self::with_client(&config.backend_url, builder.build()?))
    }

    /// Create a source around an existing client
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn feature_url(&self, dictionary: &str, feature_index: u64) -> String {
        format!(
            "{}/dictionaries/{}/features/{}",
            self.base_url,
            urlencoding::encode(dictionary),
            feature_index
        )
    }

    fn custom_url(&self, dictionary: &str, feature_index: u64, text: &str) -> String {
        format!(
            "{}/custom?input_text={}",
            self.feature_url(dictionary, feature_index),
            urlencoding::encode(text)
        )
    }

    /// Send a request and run the body through decode, camelize and validate
    async fn fetch<T>(&self, request: RequestBuilder) -> Result<T, SourceError>
    where
        T: DeserializeOwned + Validate,
    {
        let start = Instant::now();
        let response = request.header(ACCEPT, MSGPACK_MIME).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            warn!(status = %status, body = %body, "Backend returned an error");
            return Err(SourceError::Request(body));
        }

        let bytes = response.bytes().await?;
        debug!(
            status = %status,
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Received activation payload"
        );

        let value = codec::camelize_keys(codec::decode(&bytes)?);
        Ok(feature::from_value(value)?)
    }
}

#[async_trait]
impl ActivationSource for HttpSource {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn feature(&self, dictionary: &str, feature_index: u64) -> Result<Feature, SourceError> {
        let url = self.feature_url(dictionary, feature_index);
        info!(dictionary, feature_index, "Fetching feature");

        self.fetch(self.client.get(&url)).await
    }

    async fn custom_input(
        &self,
        dictionary: &str,
        feature_index: u64,
        text: &str,
    ) -> Result<Sample, SourceError> {
        if text.is_empty() {
            return Err(SourceError::EmptyInput);
        }

        let url = self.custom_url(dictionary, feature_index, text);
        info!(
            dictionary,
            feature_index,
            chars = text.chars().count(),
            "Submitting custom input"
        );

        self.fetch(self.client.post(&url)).await
    }
}
