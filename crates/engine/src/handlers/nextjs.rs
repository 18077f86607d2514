//! Layer 5: Next.js App Router client directives.

use std::sync::LazyLock;

use pipeline::{ExecutionOptions, LayerExecutionError, TransformOutput};
use regex::Regex;

use super::LayerHandler;

static HOOK_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\buse(State|Effect|Reducer|Ref|Context|Callback|Memo|LayoutEffect)\s*\(")
        .expect("valid regex")
});
static CLIENT_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*['"]use client['"]"#).expect("valid regex"));

/// Prepends `'use client'` to files that call React hooks.
pub struct NextJsLayer;

impl LayerHandler for NextJsLayer {
    fn is_applicable(&self, code: &str) -> bool {
        HOOK_CALL.is_match(code) && !CLIENT_DIRECTIVE.is_match(code)
    }

    fn apply(
        &self,
        code: &str,
        _options: &ExecutionOptions,
    ) -> Result<TransformOutput, LayerExecutionError> {
        if !self.is_applicable(code) {
            return Ok(TransformOutput::unchanged(code));
        }
        Ok(TransformOutput {
            code: format!("'use client';\n\n{code}"),
            improvements: vec!["Added 'use client' directive for React hooks".to_string()],
        })
    }
}
