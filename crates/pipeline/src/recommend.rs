//! Turns detected issues into a recommended layer set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::registry;
use crate::types::{Confidence, DetectedIssue, Impact, IssueSeverity};
use crate::LayerId;

/// A recommended run, derived from a set of issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Ascending, dependency-closed, always contains the foundation layer.
    pub layers: Vec<LayerId>,
    pub reasons: Vec<String>,
    pub confidence: Confidence,
    pub impact: Impact,
}

/// The full answer to an analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub recommended_layers: Vec<LayerId>,
    pub detected_issues: Vec<DetectedIssue>,
    pub confidence: Confidence,
    pub estimated_impact: Impact,
    pub reasons: Vec<String>,
}

impl AnalysisReport {
    pub fn new(issues: Vec<DetectedIssue>, recommendation: Recommendation) -> Self {
        Self {
            recommended_layers: recommendation.layers,
            detected_issues: issues,
            confidence: recommendation.confidence,
            estimated_impact: recommendation.impact,
            reasons: recommendation.reasons,
        }
    }
}

/// Builds a [`Recommendation`] from `issues`.
///
/// Confidence is `min(0.95, 0.6 + 0.35 * high / total)`, or
/// [`Confidence::NEUTRAL`] when there are no issues.
pub fn recommend(issues: &[DetectedIssue]) -> Recommendation {
    let mut requested = vec![LayerId::FOUNDATION];
    let mut by_layer: BTreeMap<LayerId, Vec<&DetectedIssue>> = BTreeMap::new();
    for issue in issues {
        requested.push(issue.fixed_by_layer);
        by_layer.entry(issue.fixed_by_layer).or_default().push(issue);
    }

    let mut reasons = Vec::new();
    for (layer, group) in &by_layer {
        let high = group
            .iter()
            .filter(|i| i.severity == IssueSeverity::High)
            .count();
        if high > 0 {
            reasons.push(format!(
                "Layer {layer} ({}): {high} high-severity issue{} detected",
                registry::name(*layer),
                if high == 1 { "" } else { "s" }
            ));
        }
    }

    let high_total = issues
        .iter()
        .filter(|i| i.severity == IssueSeverity::High)
        .count();
    let confidence = if issues.is_empty() {
        Confidence::NEUTRAL
    } else {
        let raw = (0.6 + 0.35 * high_total as f64 / issues.len() as f64).min(0.95);
        Confidence::new(raw).unwrap_or(Confidence::NEUTRAL)
    };

    Recommendation {
        layers: registry::close_layers(&requested).corrected,
        reasons,
        confidence,
        impact: Impact::from_high_severity_count(high_total),
    }
}
