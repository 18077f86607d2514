//! Issue detection over raw source text.
//!
//! [`detect`] is a pure function of its input: it scans for a fixed table of
//! problem patterns and reports each pattern that occurs at least once as a
//! single [`DetectedIssue`] carrying the number of occurrences. Each pattern
//! maps to exactly one fixing layer and one severity.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{DetectedIssue, IssueKind, IssueSeverity};
use crate::LayerId;

static OUTDATED_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)"target"\s*:\s*"es(3|5)""#).expect("valid regex"));
static STRICT_MODE_OFF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"reactStrictMode\s*:\s*false").expect("valid regex"));
static HTML_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(quot|#x27|#39|amp);").expect("valid regex"));
static CONSOLE_LOG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bconsole\.log\(").expect("valid regex"));
static MAPPED_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.map\(\s*\(?[\w\s,]*\)?\s*=>\s*\(?\s*<[A-Za-z][\w.]*([^>]*)>").expect("valid regex")
});
static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<img\b([^>]*)>").expect("valid regex"));
static LOCAL_STORAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\blocalStorage\.").expect("valid regex"));
static BROWSER_GLOBAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(window|document)\.").expect("valid regex"));
static WINDOW_GUARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"typeof\s+window").expect("valid regex"));

/// Returns `true` if the code already checks for a browser environment.
pub fn has_window_guard(code: &str) -> bool {
    WINDOW_GUARD.is_match(code)
}

/// Number of elements rendered from a `.map(` callback without a `key`.
pub fn count_unkeyed_map_elements(code: &str) -> usize {
    MAPPED_ELEMENT
        .captures_iter(code)
        .filter(|caps| !caps[1].contains("key="))
        .count()
}

/// Number of `<img>` tags without an `alt` attribute.
pub fn count_images_without_alt(code: &str) -> usize {
    IMG_TAG
        .captures_iter(code)
        .filter(|caps| !caps[1].contains("alt="))
        .count()
}

fn count_when(cond: bool, re: &Regex, code: &str) -> usize {
    if cond {
        re.find_iter(code).count()
    } else {
        0
    }
}

fn looks_like_config(file_path: Option<&str>) -> bool {
    match file_path {
        None => true,
        Some(path) => {
            let lower = path.to_ascii_lowercase();
            lower.ends_with(".json")
                || lower.contains("tsconfig")
                || lower.contains("next.config")
                || lower.contains("package.json")
        }
    }
}

fn issue(
    kind: IssueKind,
    severity: IssueSeverity,
    description: &str,
    fixed_by_layer: LayerId,
    pattern: &str,
    count: usize,
) -> Option<DetectedIssue> {
    (count > 0).then(|| DetectedIssue {
        kind,
        severity,
        description: description.to_string(),
        fixed_by_layer,
        pattern: pattern.to_string(),
        count: Some(count),
    })
}

/// Scans `code` for known problem patterns.
///
/// `file_path`, when given, restricts configuration checks to config-like
/// files. Issues are returned in layer order.
pub fn detect(code: &str, file_path: Option<&str>) -> Vec<DetectedIssue> {
    use IssueKind::*;
    use IssueSeverity::*;

    let guarded = has_window_guard(code);
    let config = looks_like_config(file_path);

    [
        issue(
            Config,
            High,
            "Outdated TypeScript compiler target",
            LayerId::Configuration,
            "outdated-target",
            count_when(config, &OUTDATED_TARGET, code),
        ),
        issue(
            Config,
            Medium,
            "React strict mode disabled",
            LayerId::Configuration,
            "strict-mode-off",
            count_when(config, &STRICT_MODE_OFF, code),
        ),
        issue(
            Pattern,
            Medium,
            "HTML entities",
            LayerId::EntityCleanup,
            "html-entities",
            HTML_ENTITY.find_iter(code).count(),
        ),
        issue(
            Pattern,
            Low,
            "console.log statements",
            LayerId::EntityCleanup,
            "console-log",
            CONSOLE_LOG.find_iter(code).count(),
        ),
        issue(
            Component,
            High,
            "List items rendered without a key",
            LayerId::Components,
            "missing-key",
            count_unkeyed_map_elements(code),
        ),
        issue(
            Component,
            Medium,
            "Images without alt text",
            LayerId::Components,
            "missing-alt",
            count_images_without_alt(code),
        ),
        issue(
            Hydration,
            High,
            "Unguarded localStorage access",
            LayerId::Hydration,
            "unguarded-local-storage",
            count_when(!guarded, &LOCAL_STORAGE, code),
        ),
        issue(
            Hydration,
            Medium,
            "Unguarded browser global access",
            LayerId::Hydration,
            "unguarded-browser-global",
            count_when(!guarded, &BROWSER_GLOBAL, code),
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn html_entities_collapse_into_one_medium_pattern_issue() {
        let issues = detect("<div>&quot;hi&quot;</div>", None);
        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.kind, IssueKind::Pattern);
        assert_eq!(issue.severity, IssueSeverity::Medium);
        assert_eq!(issue.description, "HTML entities");
        assert_eq!(issue.fixed_by_layer, LayerId::EntityCleanup);
        assert_eq!(issue.count, Some(2));
    }

    #[test]
    fn unguarded_local_storage_is_a_high_hydration_issue() {
        let issues = detect("const v = localStorage.getItem('x');", None);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::Hydration);
        assert_eq!(issues[0].severity, IssueSeverity::High);
        assert_eq!(issues[0].fixed_by_layer, LayerId::Hydration);
    }

    #[test]
    fn guarded_browser_access_is_not_reported() {
        let code = "if (typeof window !== 'undefined') { localStorage.getItem('x'); window.alert(1); }";
        assert!(detect(code, None).is_empty());
    }

    #[rstest]
    #[case("items.map(item => <li>{item}</li>)", 1)]
    #[case("items.map((item) => <li key={item.id}>{item}</li>)", 0)]
    #[case("items.map((item, i) => (<Row value={item} />))", 1)]
    fn counts_unkeyed_map_elements(#[case] code: &str, #[case] expected: usize) {
        assert_eq!(count_unkeyed_map_elements(code), expected);
    }

    #[rstest]
    #[case(r#"<img src="a.png">"#, 1)]
    #[case(r#"<img src="a.png" alt="logo" />"#, 0)]
    #[case(r#"<img src="a.png" /><img src="b.png" />"#, 2)]
    fn counts_images_without_alt(#[case] code: &str, #[case] expected: usize) {
        assert_eq!(count_images_without_alt(code), expected);
    }

    #[test]
    fn config_patterns_respect_file_path() {
        let code = r#"{ "compilerOptions": { "target": "es5" } }"#;
        assert_eq!(detect(code, Some("tsconfig.json"))[0].pattern, "outdated-target");
        assert_eq!(detect(code, None)[0].severity, IssueSeverity::High);
        assert!(detect(code, Some("src/App.tsx")).is_empty());
    }

    #[test]
    fn clean_code_has_no_issues() {
        assert!(detect("export const add = (a, b) => a + b;", None).is_empty());
    }

    #[test]
    fn issues_are_reported_in_layer_order() {
        let code = "console.log(1);\nlocalStorage.getItem('k');\n<img src='x'>";
        let layers: Vec<LayerId> = detect(code, None).iter().map(|i| i.fixed_by_layer).collect();
        let mut sorted = layers.clone();
        sorted.sort();
        assert_eq!(layers, sorted);
        assert_eq!(layers.len(), 3);
    }
}
