//! Layer 2: entity decoding and debug-statement cleanup.

use std::sync::LazyLock;

use pipeline::{ExecutionOptions, LayerExecutionError, TransformOutput};
use regex::{Captures, Regex};

use super::{counted, LayerHandler};

static HTML_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(quot|#x27|#39|amp);").expect("valid regex"));
// Only statements that start a line; inline calls are left for a human.
static CONSOLE_LOG_STATEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)(console\.log\()").expect("valid regex"));

/// Decodes HTML entities and comments out `console.log` statements.
///
/// `console.log` statements are commented out rather than deleted so the
/// output keeps the input's bracket balance.
pub struct EntityCleanupLayer;

impl LayerHandler for EntityCleanupLayer {
    fn is_applicable(&self, code: &str) -> bool {
        HTML_ENTITY.is_match(code) || CONSOLE_LOG_STATEMENT.is_match(code)
    }

    fn apply(
        &self,
        code: &str,
        _options: &ExecutionOptions,
    ) -> Result<TransformOutput, LayerExecutionError> {
        let mut improvements = Vec::new();

        let mut entities = 0;
        let code = HTML_ENTITY.replace_all(code, |caps: &Captures| {
            entities += 1;
            match &caps[1] {
                "quot" => "\"",
                "amp" => "&",
                _ => "'",
            }
        });
        if entities > 0 {
            improvements.push(format!("Fixed {}", counted(entities, "HTML entity")));
        }

        let mut logs = 0;
        let code = CONSOLE_LOG_STATEMENT.replace_all(&code, |caps: &Captures| {
            logs += 1;
            format!("{}// {}", &caps[1], &caps[2])
        });
        if logs > 0 {
            improvements.push(format!(
                "Commented out {}",
                counted(logs, "console.log statement")
            ));
        }

        Ok(TransformOutput {
            code: code.into_owned(),
            improvements,
        })
    }
}
