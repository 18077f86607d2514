//! Failures of the remote transformation client and their mapping onto layer errors.

use std::time::Duration;

use pipeline::{LayerExecutionError, LayerId};
use thiserror::Error;

/// Failures talking to the remote transformation service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request could not be sent or the connection dropped.
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// No response arrived within the configured timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The service answered with a non-success status.
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not a transform result.
    #[error("malformed response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl RemoteError {
    /// Attaches the layer the request was made for.
    pub fn into_layer_error(self, layer: LayerId) -> LayerExecutionError {
        match self {
            RemoteError::Timeout(timeout) => LayerExecutionError::Timeout { layer, timeout },
            other => LayerExecutionError::Remote {
                layer,
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}
