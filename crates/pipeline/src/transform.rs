//! Port for running one layer's transformation.
//!
//! The orchestrator only ever sees a [`LayerTransformer`]. Whether a layer runs
//! on a remote service or in-process is decided by how the composition root
//! wires strategies together, typically a [`FallbackTransformer`] wrapping a
//! remote client and the local handlers.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{ExecutionOptions, LayerExecutionError, LayerId};

/// Code produced by a transformation plus what it changed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransformOutput {
    pub code: String,
    #[serde(default)]
    pub improvements: Vec<String>,
}

impl TransformOutput {
    pub fn unchanged(code: &str) -> Self {
        Self {
            code: code.to_string(),
            improvements: Vec::new(),
        }
    }
}

/// Runs a single layer against a code string.
///
/// Implementations must be pure functions of `(layer, code)`: no state may be
/// shared between calls made for different runs.
#[async_trait]
pub trait LayerTransformer: Send + Sync {
    async fn transform(
        &self,
        layer: LayerId,
        code: &str,
        options: &ExecutionOptions,
    ) -> Result<TransformOutput, LayerExecutionError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: LayerTransformer + ?Sized> LayerTransformer for Arc<T> {
    async fn transform(
        &self,
        layer: LayerId,
        code: &str,
        options: &ExecutionOptions,
    ) -> Result<TransformOutput, LayerExecutionError> {
        (**self).transform(layer, code, options).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Tries `primary`; on any failure runs `secondary` for the same layer.
pub struct FallbackTransformer<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> FallbackTransformer<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl<P, S> LayerTransformer for FallbackTransformer<P, S>
where
    P: LayerTransformer,
    S: LayerTransformer,
{
    async fn transform(
        &self,
        layer: LayerId,
        code: &str,
        options: &ExecutionOptions,
    ) -> Result<TransformOutput, LayerExecutionError> {
        match self.primary.transform(layer, code, options).await {
            Ok(output) => Ok(output),
            Err(error) => {
                warn!(
                    layer = layer.as_u8(),
                    primary = self.primary.name(),
                    fallback = self.secondary.name(),
                    error = %error,
                    "primary transformer failed; falling back"
                );
                self.secondary.transform(layer, code, options).await
            }
        }
    }

    fn name(&self) -> &str {
        "fallback"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Failing;

    #[async_trait]
    impl LayerTransformer for Failing {
        async fn transform(
            &self,
            layer: LayerId,
            _code: &str,
            _options: &ExecutionOptions,
        ) -> Result<TransformOutput, LayerExecutionError> {
            Err(LayerExecutionError::Remote {
                layer,
                message: "connection refused".into(),
                source: None,
            })
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct Upper(AtomicUsize);

    #[async_trait]
    impl LayerTransformer for Upper {
        async fn transform(
            &self,
            _layer: LayerId,
            code: &str,
            _options: &ExecutionOptions,
        ) -> Result<TransformOutput, LayerExecutionError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(TransformOutput {
                code: code.to_uppercase(),
                improvements: vec!["upper".into()],
            })
        }

        fn name(&self) -> &str {
            "upper"
        }
    }

    #[tokio::test]
    async fn falls_back_when_primary_fails() {
        let secondary = Arc::new(Upper(AtomicUsize::new(0)));
        let transformer = FallbackTransformer::new(Failing, Arc::clone(&secondary));

        let output = transformer
            .transform(LayerId::EntityCleanup, "abc", &ExecutionOptions::default())
            .await
            .unwrap();

        assert_eq!(output.code, "ABC");
        assert_eq!(secondary.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn secondary_is_untouched_when_primary_succeeds() {
        let secondary = Arc::new(Upper(AtomicUsize::new(0)));
        let transformer =
            FallbackTransformer::new(Upper(AtomicUsize::new(0)), Arc::clone(&secondary));

        transformer
            .transform(LayerId::Configuration, "abc", &ExecutionOptions::default())
            .await
            .unwrap();

        assert_eq!(secondary.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn secondary_failure_is_reported() {
        let transformer = FallbackTransformer::new(Failing, Failing);
        let err = transformer
            .transform(LayerId::Hydration, "abc", &ExecutionOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.layer(), LayerId::Hydration);
    }
}
