//! Outcome types produced by an orchestration run.
//!
//! A [`LayerResult`] is created once per layer per run and never mutated
//! after it is appended; an [`OrchestrationResult`] is owned by the call that
//! produced it and is cloned (never shared) into the caches and history.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::duration_ms;
use crate::LayerId;

/// Outcome of running one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerResult {
    pub layer_id: LayerId,
    pub success: bool,
    /// Code after this layer: the transformed code when accepted, otherwise
    /// the input it was given.
    pub code: String,
    #[serde(with = "duration_ms")]
    pub execution_time: Duration,
    pub change_count: usize,
    pub improvements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
    #[serde(default)]
    pub from_cache: bool,
    #[serde(default)]
    pub skipped: bool,
}

impl LayerResult {
    /// A layer whose output passed validation.
    pub fn accepted(
        layer_id: LayerId,
        code: String,
        execution_time: Duration,
        change_count: usize,
        improvements: Vec<String>,
    ) -> Self {
        Self {
            layer_id,
            success: true,
            code,
            execution_time,
            change_count,
            improvements,
            error: None,
            revert_reason: None,
            from_cache: false,
            skipped: false,
        }
    }

    /// A layer whose output was rejected by the safety validator.
    pub fn reverted(
        layer_id: LayerId,
        previous_code: String,
        execution_time: Duration,
        reason: String,
    ) -> Self {
        Self {
            layer_id,
            success: false,
            code: previous_code,
            execution_time,
            change_count: 0,
            improvements: Vec::new(),
            error: None,
            revert_reason: Some(reason),
            from_cache: false,
            skipped: false,
        }
    }

    /// A layer whose transformation failed outright.
    pub fn failed(
        layer_id: LayerId,
        previous_code: String,
        execution_time: Duration,
        error: String,
    ) -> Self {
        Self {
            layer_id,
            success: false,
            code: previous_code,
            execution_time,
            change_count: 0,
            improvements: Vec::new(),
            error: Some(error),
            revert_reason: None,
            from_cache: false,
            skipped: false,
        }
    }

    /// A layer the skip check predicted to be a no-op.
    pub fn skipped(layer_id: LayerId, code: String) -> Self {
        Self {
            layer_id,
            success: true,
            code,
            execution_time: Duration::ZERO,
            change_count: 0,
            improvements: vec!["Skipped: no applicable patterns found".to_string()],
            error: None,
            revert_reason: None,
            from_cache: false,
            skipped: true,
        }
    }

    /// Returns a copy marked as served from cache.
    pub fn into_cached(mut self) -> Self {
        self.from_cache = true;
        self
    }
}

/// Aggregate figures for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_layers: usize,
    pub successful_layers: usize,
    pub failed_layers: usize,
    #[serde(with = "duration_ms")]
    pub total_execution_time: Duration,
    pub total_changes: usize,
    /// Fraction of layers served from cache, in `[0.0, 1.0]`.
    pub cache_hit_rate: f64,
}

impl Summary {
    /// Folds a run's layer results into a summary.
    ///
    /// `total_layers` is the size of the corrected layer set. A cancelled run
    /// has fewer results than that; the hit rate is still taken over the
    /// whole set.
    pub fn from_results(results: &[LayerResult], total_layers: usize) -> Self {
        let total_layers = total_layers.max(results.len());
        let successful_layers = results.iter().filter(|r| r.success).count();
        let cache_hits = results.iter().filter(|r| r.from_cache).count();
        Self {
            total_layers,
            successful_layers,
            failed_layers: results.len() - successful_layers,
            total_execution_time: results.iter().map(|r| r.execution_time).sum(),
            total_changes: results.iter().map(|r| r.change_count).sum(),
            cache_hit_rate: if total_layers == 0 {
                0.0
            } else {
                cache_hits as f64 / total_layers as f64
            },
        }
    }
}

/// Everything a caller gets back from one orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationResult {
    /// `true` when at least one layer was accepted or served from cache.
    pub success: bool,
    pub final_code: String,
    pub original_code: String,
    pub results: Vec<LayerResult>,
    pub summary: Summary,
    pub recommendations: Vec<String>,
    pub errors: Vec<String>,
    /// Dependency-correction warnings.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Set when the caller cancelled the run before every layer ran.
    #[serde(default)]
    pub cancelled: bool,
}

impl OrchestrationResult {
    /// A run that failed before any layer executed.
    ///
    /// `final_code` is always the untouched input.
    pub fn aborted(code: &str, error: String) -> Self {
        Self {
            success: false,
            final_code: code.to_string(),
            original_code: code.to_string(),
            results: Vec::new(),
            summary: Summary::from_results(&[], 0),
            recommendations: Vec::new(),
            errors: vec![error],
            warnings: Vec::new(),
            cancelled: false,
        }
    }

    /// Every improvement message, in layer order.
    pub fn improvements(&self) -> Vec<String> {
        self.results
            .iter()
            .flat_map(|r| r.improvements.iter().cloned())
            .collect()
    }
}
