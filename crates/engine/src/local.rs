//! In-process transformation strategy.

use async_trait::async_trait;
use pipeline::{
    ExecutionOptions, LayerExecutionError, LayerId, LayerTransformer, TransformOutput,
};

use crate::handlers::handler_for;

/// Largest input the local handlers accept.
pub const MAX_INPUT_BYTES: usize = 4 * 1024 * 1024;

/// Runs layers with the built-in [`crate::handlers`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTransformer;

#[async_trait]
impl LayerTransformer for LocalTransformer {
    async fn transform(
        &self,
        layer: LayerId,
        code: &str,
        options: &ExecutionOptions,
    ) -> Result<TransformOutput, LayerExecutionError> {
        if code.len() > MAX_INPUT_BYTES {
            return Err(LayerExecutionError::local(
                layer,
                format!("input of {} bytes exceeds {MAX_INPUT_BYTES}", code.len()),
            ));
        }
        handler_for(layer).apply(code, options)
    }

    fn name(&self) -> &str {
        "local"
    }
}
