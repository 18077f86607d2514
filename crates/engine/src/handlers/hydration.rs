//! Layer 4: guards around browser-only storage access.

use std::sync::LazyLock;

use pipeline::detector::has_window_guard;
use pipeline::{ExecutionOptions, LayerExecutionError, TransformOutput};
use regex::{Captures, Regex};

use super::{counted, LayerHandler};

static STORAGE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\b(?:window|globalThis)\.)?\blocalStorage\.(getItem|setItem|removeItem)\s*\(")
        .expect("valid regex")
});

/// Rewrites `localStorage.getItem(k)` to `globalThis.localStorage?.getItem(k)`.
///
/// The optional chain short-circuits to `undefined` during server rendering
/// and binds as tightly as the original call, so surrounding operators such
/// as `||`, `!` or `===` keep their meaning. No brackets are added.
pub struct HydrationLayer;

impl LayerHandler for HydrationLayer {
    fn is_applicable(&self, code: &str) -> bool {
        !has_window_guard(code) && STORAGE_CALL.is_match(code)
    }

    fn apply(
        &self,
        code: &str,
        _options: &ExecutionOptions,
    ) -> Result<TransformOutput, LayerExecutionError> {
        if has_window_guard(code) {
            return Ok(TransformOutput::unchanged(code));
        }

        let mut guarded = 0;
        let code = STORAGE_CALL.replace_all(code, |caps: &Captures| {
            guarded += 1;
            format!("globalThis.localStorage?.{}(", &caps[1])
        });

        let mut improvements = Vec::new();
        if guarded > 0 {
            improvements.push(format!(
                "Added SSR guards to {}",
                counted(guarded, "localStorage call")
            ));
        }
        Ok(TransformOutput {
            code: code.into_owned(),
            improvements,
        })
    }
}
