//! Error types for the orchestration domain.
//!
//! [`LaminateError`] covers conditions that stop a run before any layer
//! executes. [`LayerExecutionError`] covers a single layer's transformation
//! failing; the orchestrator records those on the layer's result and carries
//! on with the next layer.

use std::time::Duration;

use thiserror::Error;

use crate::LayerId;

// ---------------------------------------------------------------------------
// Run-level errors
// ---------------------------------------------------------------------------

/// Errors that stop an orchestration run before its layer loop starts.
///
/// Callers never see these as a bare `Err`: the orchestrator folds them into
/// an [`crate::OrchestrationResult`] with `errors` populated and the input
/// returned unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LaminateError {
    /// No code, or only whitespace, was supplied.
    #[error("no code provided")]
    EmptyInput,

    /// Engine configuration is invalid.
    ///
    /// Produced at construction time; no orchestrator starts with an invalid
    /// configuration.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Layer-level errors
// ---------------------------------------------------------------------------

/// Failure of one layer transformation, carrying the underlying cause.
#[derive(Debug, Error)]
pub enum LayerExecutionError {
    /// The remote transformation service answered with an error or an
    /// unusable body.
    #[error("remote transform of layer {layer} failed: {message}")]
    Remote {
        layer: LayerId,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The remote transformation service did not answer in time.
    #[error("remote transform of layer {layer} timed out after {timeout:?}")]
    Timeout { layer: LayerId, timeout: Duration },

    /// The in-process handler rejected or failed on the input.
    #[error("local transform of layer {layer} failed: {message}")]
    Local { layer: LayerId, message: String },
}

impl LayerExecutionError {
    /// The layer the failure belongs to.
    pub fn layer(&self) -> LayerId {
        match self {
            Self::Remote { layer, .. }
            | Self::Timeout { layer, .. }
            | Self::Local { layer, .. } => *layer,
        }
    }

    /// Convenience constructor for handler failures.
    pub fn local(layer: LayerId, message: impl Into<String>) -> Self {
        Self::Local {
            layer,
            message: message.into(),
        }
    }
}
