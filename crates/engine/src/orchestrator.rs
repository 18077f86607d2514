//! The top-level driver for orchestration runs.
//!
//! One run walks the dependency-closed layer set in ascending order. For each
//! layer the orchestrator consults the layer cache, optionally skips layers
//! the local handler reports as no-ops, runs the transformer, and validates
//! the output. A failed or reverted layer is recorded and the next layer
//! receives the last accepted code; nothing inside the loop aborts the run.
//!
//! The orchestrator owns its caches and history. Construct a fresh one for an
//! isolated cache; share one behind an [`Arc`] to share them.

use std::sync::Arc;
use std::time::Instant;

use pipeline::history::DEFAULT_HISTORY_CAPACITY;
use pipeline::{
    cache_key, detector, recommend, registry, validator, AnalysisReport, ExecutionHistory,
    ExecutionOptions, HistoryRecord, HistoryReport, LaminateError, LayerDefinition, LayerId,
    LayerResult, LayerTransformer, OrchestrationResult, ResultCache, RunId, Summary,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::diff::count_changes;
use crate::handlers::handler_for;
use crate::local::LocalTransformer;

/// Sizing for the orchestrator-owned stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub run_cache_capacity: usize,
    pub layer_cache_capacity: usize,
    pub history_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            run_cache_capacity: 100,
            layer_cache_capacity: 50,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl OrchestratorConfig {
    /// Rejects zero capacities.
    pub fn validate(&self) -> Result<(), LaminateError> {
        for (name, value) in [
            ("run_cache_capacity", self.run_cache_capacity),
            ("layer_cache_capacity", self.layer_cache_capacity),
            ("history_capacity", self.history_capacity),
        ] {
            if value == 0 {
                return Err(LaminateError::Configuration {
                    message: format!("{name} must be greater than zero"),
                });
            }
        }
        Ok(())
    }
}

/// Drives orchestration runs against one [`LayerTransformer`].
pub struct Orchestrator {
    transformer: Arc<dyn LayerTransformer>,
    run_cache: ResultCache<OrchestrationResult>,
    layer_cache: ResultCache<LayerResult>,
    history: ExecutionHistory,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("transformer", &self.transformer.name())
            .field("run_cache", &self.run_cache)
            .field("layer_cache", &self.layer_cache)
            .field("history", &self.history)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(
        transformer: Arc<dyn LayerTransformer>,
        config: OrchestratorConfig,
    ) -> Result<Self, LaminateError> {
        config.validate()?;
        Ok(Self {
            transformer,
            run_cache: ResultCache::new(config.run_cache_capacity),
            layer_cache: ResultCache::new(config.layer_cache_capacity),
            history: ExecutionHistory::new(config.history_capacity),
        })
    }

    /// An orchestrator using only the in-process handlers and default sizing.
    pub fn local() -> Self {
        Self {
            transformer: Arc::new(LocalTransformer),
            run_cache: ResultCache::new(OrchestratorConfig::default().run_cache_capacity),
            layer_cache: ResultCache::new(OrchestratorConfig::default().layer_cache_capacity),
            history: ExecutionHistory::default(),
        }
    }

    /// Runs `requested` layers (plus their dependencies) over `code`.
    pub async fn orchestrate(
        &self,
        code: &str,
        requested: &[u8],
        options: &ExecutionOptions,
    ) -> OrchestrationResult {
        self.orchestrate_with_cancel(code, requested, options, &CancellationToken::new())
            .await
    }

    /// [`Self::orchestrate`], stopping before the next layer once `cancel`
    /// fires. A layer already running is allowed to finish.
    pub async fn orchestrate_with_cancel(
        &self,
        code: &str,
        requested: &[u8],
        options: &ExecutionOptions,
        cancel: &CancellationToken,
    ) -> OrchestrationResult {
        let run_id = RunId::new_random();
        let span = info_span!("orchestrate", run_id = %run_id, requested = ?requested);
        self.run(run_id, code, requested, options, cancel)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        run_id: RunId,
        code: &str,
        requested: &[u8],
        options: &ExecutionOptions,
        cancel: &CancellationToken,
    ) -> OrchestrationResult {
        if code.trim().is_empty() {
            warn!("rejecting run with empty input");
            let result = OrchestrationResult::aborted(code, LaminateError::EmptyInput.to_string());
            self.record(run_id, Vec::new(), &result);
            return result;
        }

        let correction = registry::close(requested);
        for warning in &correction.warnings {
            info!(warning = %warning, "corrected layer dependencies");
        }
        let layers = correction.corrected;

        let run_key = cache_key(code, &layers);
        if options.use_cache && !layers.is_empty() {
            if let Some(cached) = self.run_cache.get(&run_key) {
                info!(layers = layers.len(), "run served from cache");
                let result = replay_cached(cached, correction.warnings);
                self.record(run_id, layers, &result);
                return result;
            }
        }

        let started = Instant::now();
        let mut current = code.to_string();
        let mut results = Vec::with_capacity(layers.len());
        let mut cancelled = false;

        for &layer in &layers {
            if cancel.is_cancelled() {
                info!(layer = layer.as_u8(), "run cancelled before layer");
                cancelled = true;
                break;
            }
            let result = self.run_layer(layer, &current, options).await;
            trace_layer(options, &result);
            if result.success {
                current.clone_from(&result.code);
            }
            results.push(result);
        }

        let success = results.iter().any(|r| r.success && !r.skipped);
        let errors = results
            .iter()
            .filter_map(|r| {
                r.error
                    .as_ref()
                    .map(|e| format!("Layer {}: {e}", r.layer_id))
            })
            .collect();
        let result = OrchestrationResult {
            success,
            final_code: current,
            original_code: code.to_string(),
            summary: Summary::from_results(&results, layers.len()),
            recommendations: build_recommendations(&layers, &results, cancelled),
            results,
            errors,
            warnings: correction.warnings,
            cancelled,
        };

        info!(
            success = result.success,
            layers = result.summary.total_layers,
            changes = result.summary.total_changes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "orchestration finished"
        );

        // Skipped layers depend on `skip_unnecessary`, which the key does not
        // carry.
        let has_skips = result.results.iter().any(|r| r.skipped);
        if options.use_cache && !options.dry_run && result.success && !cancelled && !has_skips {
            self.run_cache.put(run_key, result.clone());
        }
        self.record(run_id, layers, &result);
        result
    }

    async fn run_layer(
        &self,
        layer: LayerId,
        code: &str,
        options: &ExecutionOptions,
    ) -> LayerResult {
        let layer_key = cache_key(code, &[layer]);
        if options.use_cache {
            if let Some(hit) = self.layer_cache.get(&layer_key) {
                return hit.into_cached();
            }
        }

        if options.skip_unnecessary && !handler_for(layer).is_applicable(code) {
            return LayerResult::skipped(layer, code.to_string());
        }

        let started = Instant::now();
        let outcome = self.execute_isolated(layer, code, options).await;
        let elapsed = started.elapsed();

        let output = match outcome {
            Ok(output) => output,
            Err(message) => {
                warn!(layer = layer.as_u8(), error = %message, "layer failed");
                return LayerResult::failed(layer, code.to_string(), elapsed, message);
            }
        };

        let verdict = validator::validate(code, &output.code);
        if verdict.should_revert {
            let reason = verdict
                .reason
                .unwrap_or_else(|| "validation failed".to_string());
            warn!(layer = layer.as_u8(), reason = %reason, "layer reverted");
            return LayerResult::reverted(layer, code.to_string(), elapsed, reason);
        }

        let changes = count_changes(code, &output.code);
        let result = LayerResult::accepted(layer, output.code, elapsed, changes, output.improvements);
        if options.use_cache && !options.dry_run {
            self.layer_cache.put(layer_key, result.clone());
        }
        result
    }

    /// Runs the transformer on its own task so a panicking strategy becomes a
    /// failed layer instead of tearing down the run.
    async fn execute_isolated(
        &self,
        layer: LayerId,
        code: &str,
        options: &ExecutionOptions,
    ) -> Result<pipeline::TransformOutput, String> {
        let transformer = Arc::clone(&self.transformer);
        let input = code.to_string();
        let options = *options;
        let task = tokio::spawn(async move { transformer.transform(layer, &input, &options).await });
        match task.await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(error)) => Err(error.to_string()),
            Err(join) if join.is_panic() => Err(format!("transformer panicked: {join}")),
            Err(join) => Err(format!("transformer task aborted: {join}")),
        }
    }

    fn record(&self, run_id: RunId, layers: Vec<LayerId>, result: &OrchestrationResult) {
        self.history
            .append(HistoryRecord::from_result(run_id, layers, result));
    }

    /// Detects issues in `code` and recommends a layer set.
    pub fn analyze(&self, code: &str, file_path: Option<&str>) -> AnalysisReport {
        let issues = detector::detect(code, file_path);
        let recommendation = recommend::recommend(&issues);
        debug!(
            issues = issues.len(),
            layers = ?recommendation.layers,
            "analysis complete"
        );
        AnalysisReport::new(issues, recommendation)
    }

    /// The static layer catalog.
    pub fn layer_info(&self) -> Vec<LayerDefinition> {
        registry::definitions()
    }

    /// Up to `limit` recent runs, newest first, plus aggregate stats.
    pub fn history(&self, limit: usize) -> HistoryReport {
        self.history.report(limit)
    }

    /// Drops every cached run and layer result.
    pub fn clear_caches(&self) {
        self.run_cache.clear();
        self.layer_cache.clear();
    }

    pub fn transformer_name(&self) -> &str {
        self.transformer.name()
    }
}

fn replay_cached(cached: OrchestrationResult, warnings: Vec<String>) -> OrchestrationResult {
    let results: Vec<LayerResult> = cached
        .results
        .into_iter()
        .map(LayerResult::into_cached)
        .collect();
    let total_layers = results.len();
    OrchestrationResult {
        summary: Summary::from_results(&results, total_layers),
        results,
        warnings,
        ..cached
    }
}

fn trace_layer(options: &ExecutionOptions, result: &LayerResult) {
    let layer = result.layer_id.as_u8();
    let elapsed_ms = result.execution_time.as_millis() as u64;
    if options.verbose {
        info!(
            layer,
            success = result.success,
            from_cache = result.from_cache,
            skipped = result.skipped,
            changes = result.change_count,
            elapsed_ms,
            "layer finished"
        );
    } else {
        debug!(
            layer,
            success = result.success,
            from_cache = result.from_cache,
            skipped = result.skipped,
            changes = result.change_count,
            elapsed_ms,
            "layer finished"
        );
    }
}

fn build_recommendations(
    layers: &[LayerId],
    results: &[LayerResult],
    cancelled: bool,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if layers.is_empty() {
        recommendations.push("No valid layers were requested; nothing was run.".to_string());
        return recommendations;
    }

    for result in results {
        let name = registry::name(result.layer_id);
        if let Some(reason) = &result.revert_reason {
            recommendations.push(format!(
                "Layer {} ({name}) was reverted: {reason}. Review this code manually.",
                result.layer_id
            ));
        } else if result.error.is_some() {
            recommendations.push(format!(
                "Layer {} ({name}) failed; retry once the transformation service is reachable.",
                result.layer_id
            ));
        }
    }

    if cancelled {
        let pending: Vec<String> = layers
            .iter()
            .skip(results.len())
            .map(ToString::to_string)
            .collect();
        recommendations.push(format!(
            "Run was cancelled; layers {} did not run.",
            pending.join(", ")
        ));
    }

    let all_clean = results.iter().all(|r| r.success);
    let total_changes: usize = results.iter().map(|r| r.change_count).sum();
    if all_clean && total_changes == 0 && !cancelled {
        recommendations.push("No changes were needed for the requested layers.".to_string());
    }

    recommendations
}
