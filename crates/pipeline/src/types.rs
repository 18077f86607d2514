//! Shared value types for the orchestration domain.
//!
//! Unlike the identifiers in [`crate::identifiers`], these types carry values
//! with invariants (confidence scores are in `[0.0, 1.0]`, durations serialize
//! as whole milliseconds) and participate in domain computations.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::LayerId;

// ---------------------------------------------------------------------------
// Execution options
// ---------------------------------------------------------------------------

/// Caller-supplied switches for one orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionOptions {
    /// Emit the per-layer trace at `info` instead of `debug`.
    pub verbose: bool,
    /// Compute the result but write nothing to the caches.
    pub dry_run: bool,
    /// Consult and populate the run and layer caches.
    pub use_cache: bool,
    /// Skip layers whose handler reports nothing to do.
    pub skip_unnecessary: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            dry_run: false,
            use_cache: true,
            skip_unnecessary: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Detected issues
// ---------------------------------------------------------------------------

/// Category of a [`DetectedIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Config,
    Pattern,
    Component,
    Hydration,
}

/// Severity of a [`DetectedIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
}

/// One problem pattern found in the scanned source.
///
/// All occurrences of the same pattern collapse into a single issue; `count`
/// carries the number of occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub severity: IssueSeverity,
    pub description: String,
    /// The layer whose handler fixes this pattern.
    pub fixed_by_layer: LayerId,
    /// Short label of the matched pattern.
    pub pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// Confidence of a recommendation, in the range `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    /// Confidence reported when there is no evidence either way.
    pub const NEUTRAL: Confidence = Confidence(0.5);

    /// Creates a [`Confidence`], returning `None` if `value` is outside
    /// the valid range `[0.0, 1.0]`.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Returns the score as an `f64` in `[0.0, 1.0]`.
    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Coarse estimate of how much a recommended run will change the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Minimal,
    Low,
    Medium,
    High,
}

impl Impact {
    /// Buckets the number of high-severity issues.
    pub fn from_high_severity_count(count: usize) -> Self {
        match count {
            n if n > 5 => Impact::High,
            n if n > 2 => Impact::Medium,
            n if n > 0 => Impact::Low,
            _ => Impact::Minimal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Impact::Minimal => "minimal",
            Impact::Low => "low",
            Impact::Medium => "medium",
            Impact::High => "high",
        }
    }
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// Serde adapter encoding a [`Duration`] as integer milliseconds.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Mean of a set of durations; zero for an empty set.
pub(crate) fn mean_duration(total: Duration, count: usize) -> Duration {
    match u32::try_from(count) {
        Ok(0) => Duration::ZERO,
        Ok(n) => total / n,
        Err(_) => Duration::from_secs_f64(total.as_secs_f64() / count as f64),
    }
}
