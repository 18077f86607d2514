//! Structural sanity check for one layer's output.
//!
//! This is a syntactic guard, not a parser: corrupted output that still
//! balances its braces passes.

use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

/// Largest tolerated change in brace or parenthesis count.
pub const BALANCE_THRESHOLD: usize = 2;

/// Output fragments that only appear when a regex rewrite went wrong.
const CORRUPTION_SIGNATURES: &[(&str, &str)] = &[
    ("()()", "adjacent empty call pair"),
    ("() => () =>", "doubled arrow function"),
    ("undefined undefined", "repeated undefined token"),
];

/// Decision on whether to keep a layer's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub should_revert: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verdict {
    pub fn accept() -> Self {
        Self {
            should_revert: false,
            reason: None,
        }
    }

    pub fn revert(reason: impl Into<String>) -> Self {
        Self {
            should_revert: true,
            reason: Some(reason.into()),
        }
    }
}

/// Compares the code before and after a layer ran.
///
/// Identical input and output are always accepted. A panic raised while
/// checking is reported as a revert carrying the panic message.
pub fn validate(before: &str, after: &str) -> Verdict {
    if before == after {
        return Verdict::accept();
    }
    match panic::catch_unwind(AssertUnwindSafe(|| check(before, after))) {
        Ok(verdict) => verdict,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown validation failure".to_string());
            Verdict::revert(format!("validation failed: {message}"))
        }
    }
}

fn count_chars(code: &str, targets: [char; 2]) -> usize {
    code.chars().filter(|c| targets.contains(c)).count()
}

fn check(before: &str, after: &str) -> Verdict {
    let braces = (count_chars(before, ['{', '}']), count_chars(after, ['{', '}']));
    if braces.0.abs_diff(braces.1) > BALANCE_THRESHOLD {
        return Verdict::revert(format!(
            "bracket mismatch ({} braces before, {} after)",
            braces.0, braces.1
        ));
    }

    let parens = (count_chars(before, ['(', ')']), count_chars(after, ['(', ')']));
    if parens.0.abs_diff(parens.1) > BALANCE_THRESHOLD {
        return Verdict::revert(format!(
            "parenthesis mismatch ({} parentheses before, {} after)",
            parens.0, parens.1
        ));
    }

    for (signature, label) in CORRUPTION_SIGNATURES {
        if after.contains(signature) && !before.contains(signature) {
            return Verdict::revert(format!("corruption detected: {label} `{signature}`"));
        }
    }

    Verdict::accept()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn repeated_objects_are_reverted_as_bracket_mismatch() {
        let verdict = validate("{a:1}", "{a:1}{a:1}{a:1}");
        assert!(verdict.should_revert);
        assert!(verdict.reason.unwrap().contains("bracket"));
    }

    #[test]
    fn small_brace_changes_are_tolerated() {
        assert_eq!(validate("a", "{a}"), Verdict::accept());
    }

    #[test]
    fn unbalanced_parentheses_are_reverted() {
        let verdict = validate("f(x)", "f(((x)");
        assert!(!verdict.should_revert);
        let verdict = validate("f(x)", "f((((x)");
        assert!(verdict.reason.unwrap().contains("parenthesis"));
    }

    #[test]
    fn new_corruption_signatures_are_reverted() {
        let verdict = validate("onClick={handle}", "onClick={() => () => handle}");
        assert!(verdict.should_revert);
        assert!(verdict.reason.unwrap().contains("doubled arrow"));
    }

    #[test]
    fn pre_existing_signatures_are_not_blamed_on_the_layer() {
        let before = "run()()\nlet a = 1;";
        let after = "run()()\nconst a = 1;";
        assert_eq!(validate(before, after), Verdict::accept());
    }

    #[test]
    fn entity_decoding_is_accepted() {
        assert_eq!(
            validate("<div>&quot;hi&quot;</div>", "<div>\"hi\"</div>"),
            Verdict::accept()
        );
    }

    proptest! {
        #[test]
        fn identical_code_is_never_reverted(code in ".{0,200}") {
            prop_assert!(!validate(&code, &code).should_revert);
        }
    }
}
