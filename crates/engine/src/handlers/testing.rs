//! Layer 6: make swallowed errors visible.

use std::sync::LazyLock;

use pipeline::{ExecutionOptions, LayerExecutionError, TransformOutput};
use regex::{Captures, Regex};

use super::{counted, deferred, LayerHandler, PAIRED_EDITS_PER_PASS};

static EMPTY_CATCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"catch\s*\(\s*(\w+)\s*\)\s*\{\s*\}").expect("valid regex"));

/// Fills empty `catch` blocks with a `console.error` call.
///
/// Each call adds a parenthesis pair, so at most [`PAIRED_EDITS_PER_PASS`]
/// blocks are filled per run.
pub struct TestingLayer;

impl LayerHandler for TestingLayer {
    fn is_applicable(&self, code: &str) -> bool {
        EMPTY_CATCH.is_match(code)
    }

    fn apply(
        &self,
        code: &str,
        _options: &ExecutionOptions,
    ) -> Result<TransformOutput, LayerExecutionError> {
        let mut filled = 0;
        let mut left = 0;
        let code = EMPTY_CATCH.replace_all(code, |caps: &Captures| {
            if filled == PAIRED_EDITS_PER_PASS {
                left += 1;
                return caps[0].to_string();
            }
            filled += 1;
            format!("catch ({0}) {{ console.error({0}); }}", &caps[1])
        });

        let mut improvements = Vec::new();
        if filled > 0 {
            improvements.push(format!(
                "Logged errors in {}",
                counted(filled, "empty catch block")
            ));
        }
        if left > 0 {
            improvements.push(deferred(left, "empty catch block"));
        }
        Ok(TransformOutput {
            code: code.into_owned(),
            improvements,
        })
    }
}
