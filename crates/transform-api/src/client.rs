//! HTTP client for the remote transformation service.

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{ExecutionOptions, LayerExecutionError, LayerId, LayerTransformer, TransformOutput};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::RemoteError;

/// Applied when no timeout is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the service lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransformRequest<'a> {
    layer_id: LayerId,
    code: &'a str,
    options: &'a ExecutionOptions,
}

/// [`LayerTransformer`] backed by `POST {base_url}/transform`.
#[derive(Debug, Clone)]
pub struct RemoteTransformer {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl RemoteTransformer {
    pub fn new(config: RemoteConfig) -> Self {
        let endpoint = format!("{}/transform", config.base_url.trim_end_matches('/'));
        Self {
            client: reqwest::Client::new(),
            endpoint,
            timeout: config.timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends one layer to the service, bounded by the configured timeout.
    #[instrument(skip(self, code, options), fields(endpoint = %self.endpoint, bytes = code.len()))]
    pub async fn request(
        &self,
        layer: LayerId,
        code: &str,
        options: &ExecutionOptions,
    ) -> Result<TransformOutput, RemoteError> {
        let body = TransformRequest {
            layer_id: layer,
            code,
            options,
        };
        match tokio::time::timeout(self.timeout, self.send(&body)).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout(self.timeout)),
        }
    }

    async fn send(&self, body: &TransformRequest<'_>) -> Result<TransformOutput, RemoteError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(body)
            .send()
            .await
            .map_err(RemoteError::Transport)?;

        let status = response.status();
        let text = response.text().await.map_err(RemoteError::Transport)?;
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let output: TransformOutput = serde_json::from_str(&text).map_err(RemoteError::Decode)?;
        debug!(
            improvements = output.improvements.len(),
            "remote transform complete"
        );
        Ok(output)
    }
}

#[async_trait]
impl LayerTransformer for RemoteTransformer {
    async fn transform(
        &self,
        layer: LayerId,
        code: &str,
        options: &ExecutionOptions,
    ) -> Result<TransformOutput, LayerExecutionError> {
        self.request(layer, code, options)
            .await
            .map_err(|e| e.into_layer_error(layer))
    }

    fn name(&self) -> &str {
        "remote"
    }
}
