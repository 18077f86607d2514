//! Layer 3: list keys and image alt text.

use std::sync::LazyLock;

use pipeline::detector::{count_images_without_alt, count_unkeyed_map_elements};
use pipeline::{ExecutionOptions, LayerExecutionError, TransformOutput};
use regex::{Captures, Regex};

use super::{counted, deferred, LayerHandler, PAIRED_EDITS_PER_PASS};

static MAPPED_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\.map\(\s*\(?\s*(\w+)\s*(?:,\s*(\w+)\s*)?\)?\s*=>(\s*\(?\s*)<([A-Za-z][\w.]*)([^>]*)>",
    )
    .expect("valid regex")
});
static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<img\b([^>]*)>").expect("valid regex"));

/// Adds `key={index}` to mapped elements and `alt=""` to images.
///
/// Each key adds a brace pair, so only [`PAIRED_EDITS_PER_PASS`] keys are
/// added per run. Alt text adds no brackets and is never limited.
pub struct ComponentsLayer;

impl LayerHandler for ComponentsLayer {
    fn is_applicable(&self, code: &str) -> bool {
        count_unkeyed_map_elements(code) > 0 || count_images_without_alt(code) > 0
    }

    fn apply(
        &self,
        code: &str,
        _options: &ExecutionOptions,
    ) -> Result<TransformOutput, LayerExecutionError> {
        let mut improvements = Vec::new();

        let mut keys = 0;
        let mut skipped_keys = 0;
        let code = MAPPED_ELEMENT.replace_all(code, |caps: &Captures| {
            let attrs = &caps[5];
            if attrs.contains("key=") {
                return caps[0].to_string();
            }
            if keys == PAIRED_EDITS_PER_PASS {
                skipped_keys += 1;
                return caps[0].to_string();
            }
            keys += 1;
            let item = &caps[1];
            let index = caps.get(2).map_or("index", |m| m.as_str());
            format!(
                ".map(({item}, {index}) =>{}<{} key={{{index}}}{attrs}>",
                &caps[3], &caps[4]
            )
        });
        if keys > 0 {
            improvements.push(format!("Added {}", counted(keys, "missing list key")));
        }
        if skipped_keys > 0 {
            improvements.push(deferred(skipped_keys, "missing list key"));
        }

        let mut alts = 0;
        let code = IMG_TAG.replace_all(&code, |caps: &Captures| {
            if caps[1].contains("alt=") {
                return caps[0].to_string();
            }
            alts += 1;
            format!("<img alt=\"\"{}>", &caps[1])
        });
        if alts > 0 {
            improvements.push(format!("Added alt text to {}", counted(alts, "image")));
        }

        Ok(TransformOutput {
            code: code.into_owned(),
            improvements,
        })
    }
}
