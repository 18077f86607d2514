//! Layer 1: compiler target and framework flags.

use std::sync::LazyLock;

use pipeline::{ExecutionOptions, LayerExecutionError, TransformOutput};
use regex::{Captures, Regex};

use super::{counted, LayerHandler};

static OUTDATED_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)("target"\s*:\s*")es[35](")"#).expect("valid regex"));
static STRICT_MODE_OFF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"reactStrictMode(\s*):(\s*)false").expect("valid regex"));

/// Upgrades outdated compiler targets and re-enables React strict mode.
pub struct ConfigurationLayer;

impl LayerHandler for ConfigurationLayer {
    fn is_applicable(&self, code: &str) -> bool {
        OUTDATED_TARGET.is_match(code) || STRICT_MODE_OFF.is_match(code)
    }

    fn apply(
        &self,
        code: &str,
        _options: &ExecutionOptions,
    ) -> Result<TransformOutput, LayerExecutionError> {
        let mut improvements = Vec::new();

        let mut targets = 0;
        let code = OUTDATED_TARGET.replace_all(code, |caps: &Captures| {
            targets += 1;
            format!("{}es2020{}", &caps[1], &caps[2])
        });
        if targets > 0 {
            improvements.push(format!(
                "Upgraded {} to es2020",
                counted(targets, "compiler target")
            ));
        }

        let mut flags = 0;
        let code = STRICT_MODE_OFF.replace_all(&code, |caps: &Captures| {
            flags += 1;
            format!("reactStrictMode{}:{}true", &caps[1], &caps[2])
        });
        if flags > 0 {
            improvements.push("Enabled React strict mode".to_string());
        }

        Ok(TransformOutput {
            code: code.into_owned(),
            improvements,
        })
    }
}
