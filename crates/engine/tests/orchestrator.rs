use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use engine::{LocalTransformer, Orchestrator, OrchestratorConfig};
use pipeline::{
    ExecutionOptions, LayerExecutionError, LayerId, LayerTransformer, TransformOutput,
};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Test transformers
// ---------------------------------------------------------------------------

/// Repeats the input three times on one layer and leaves the rest alone.
struct Exploding(LayerId);

#[async_trait]
impl LayerTransformer for Exploding {
    async fn transform(
        &self,
        layer: LayerId,
        code: &str,
        _options: &ExecutionOptions,
    ) -> Result<TransformOutput, LayerExecutionError> {
        if layer == self.0 {
            Ok(TransformOutput::unchanged(&code.repeat(3)))
        } else {
            Ok(TransformOutput::unchanged(code))
        }
    }

    fn name(&self) -> &str {
        "exploding"
    }
}

/// Fails one layer and delegates every other layer to the local handlers.
struct FailsOn(LayerId);

#[async_trait]
impl LayerTransformer for FailsOn {
    async fn transform(
        &self,
        layer: LayerId,
        code: &str,
        options: &ExecutionOptions,
    ) -> Result<TransformOutput, LayerExecutionError> {
        if layer == self.0 {
            return Err(LayerExecutionError::local(layer, "handler exploded"));
        }
        LocalTransformer.transform(layer, code, options).await
    }

    fn name(&self) -> &str {
        "fails-on"
    }
}

struct Panicking;

#[async_trait]
impl LayerTransformer for Panicking {
    async fn transform(
        &self,
        _layer: LayerId,
        _code: &str,
        _options: &ExecutionOptions,
    ) -> Result<TransformOutput, LayerExecutionError> {
        panic!("strategy bug");
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

/// Counts calls and otherwise behaves like the local handlers.
#[derive(Default)]
struct Counting(AtomicUsize);

#[async_trait]
impl LayerTransformer for Counting {
    async fn transform(
        &self,
        layer: LayerId,
        code: &str,
        options: &ExecutionOptions,
    ) -> Result<TransformOutput, LayerExecutionError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        LocalTransformer.transform(layer, code, options).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Cancels `token` while running one layer, then finishes that layer locally.
struct CancelsDuring {
    layer: LayerId,
    token: CancellationToken,
}

#[async_trait]
impl LayerTransformer for CancelsDuring {
    async fn transform(
        &self,
        layer: LayerId,
        code: &str,
        options: &ExecutionOptions,
    ) -> Result<TransformOutput, LayerExecutionError> {
        if layer == self.layer {
            self.token.cancel();
        }
        LocalTransformer.transform(layer, code, options).await
    }

    fn name(&self) -> &str {
        "cancels-during"
    }
}

fn orchestrator_with(transformer: impl LayerTransformer + 'static) -> Orchestrator {
    Orchestrator::new(Arc::new(transformer), OrchestratorConfig::default()).unwrap()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn entity_cleanup_decodes_html_entities() {
    let orchestrator = Orchestrator::local();
    let code = "<div>&quot;hi&quot;</div>";

    let report = orchestrator.analyze(code, None);
    assert!(report
        .detected_issues
        .iter()
        .any(|i| i.description == "HTML entities"));

    let result = orchestrator
        .orchestrate(code, &[2], &ExecutionOptions::default())
        .await;

    assert!(result.success);
    assert_eq!(result.final_code, "<div>\"hi\"</div>");
    assert_eq!(result.original_code, code);
    let entity = result
        .results
        .iter()
        .find(|r| r.layer_id == LayerId::EntityCleanup)
        .unwrap();
    assert_eq!(entity.change_count, 1);
    assert!(entity
        .improvements
        .iter()
        .any(|i| i.contains("HTML entit")));
}

#[tokio::test]
async fn hydration_request_pulls_in_missing_prerequisites() {
    let orchestrator = Orchestrator::local();
    let code = "const theme = localStorage.getItem('x');\n";

    let result = orchestrator
        .orchestrate(code, &[1, 4], &ExecutionOptions::default())
        .await;

    let layers: Vec<u8> = result.results.iter().map(|r| r.layer_id.as_u8()).collect();
    assert_eq!(layers, vec![1, 2, 3, 4]);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].starts_with("Layer 4"));
    assert_eq!(
        result.final_code,
        "const theme = globalThis.localStorage?.getItem('x');\n"
    );
}

#[tokio::test]
async fn exploding_output_is_reverted_and_the_run_continues() {
    let orchestrator = orchestrator_with(Exploding(LayerId::EntityCleanup));
    let code = "const x = {a:1};";

    let result = orchestrator
        .orchestrate(code, &[1, 2, 3], &ExecutionOptions::default())
        .await;

    let reverted = &result.results[1];
    assert_eq!(reverted.layer_id, LayerId::EntityCleanup);
    assert!(!reverted.success);
    assert!(reverted.revert_reason.as_deref().unwrap().contains("bracket"));
    assert_eq!(reverted.code, code);
    assert_eq!(result.results.len(), 3);
    assert_eq!(result.final_code, code);
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.contains("reverted")));
}

#[tokio::test]
async fn second_identical_run_is_served_from_cache() {
    let transformer = Arc::new(Counting::default());
    let orchestrator = Orchestrator::new(transformer.clone(), OrchestratorConfig::default()).unwrap();
    let code = "<p>&amp;</p>";
    let options = ExecutionOptions::default();

    let first = orchestrator.orchestrate(code, &[1, 2], &options).await;
    let calls_after_first = transformer.0.load(Ordering::SeqCst);
    let second = orchestrator.orchestrate(code, &[1, 2], &options).await;

    assert_eq!(calls_after_first, 2);
    assert_eq!(transformer.0.load(Ordering::SeqCst), 2);
    assert!(first.results.iter().all(|r| !r.from_cache));
    assert!(second.results.iter().all(|r| r.from_cache));
    assert_eq!(second.final_code, first.final_code);
    assert_eq!(second.summary.cache_hit_rate, 1.0);
}

#[tokio::test]
async fn cache_can_be_bypassed_and_cleared() {
    let transformer = Arc::new(Counting::default());
    let orchestrator = Orchestrator::new(transformer.clone(), OrchestratorConfig::default()).unwrap();
    let code = "<p>&amp;</p>";

    orchestrator
        .orchestrate(code, &[1, 2], &ExecutionOptions::default())
        .await;
    let uncached = ExecutionOptions {
        use_cache: false,
        ..ExecutionOptions::default()
    };
    orchestrator.orchestrate(code, &[1, 2], &uncached).await;
    assert_eq!(transformer.0.load(Ordering::SeqCst), 4);

    orchestrator.clear_caches();
    let after_clear = orchestrator
        .orchestrate(code, &[1, 2], &ExecutionOptions::default())
        .await;
    assert!(after_clear.results.iter().all(|r| !r.from_cache));
}

#[tokio::test]
async fn dry_runs_do_not_populate_the_cache() {
    let orchestrator = Orchestrator::local();
    let options = ExecutionOptions {
        dry_run: true,
        ..ExecutionOptions::default()
    };

    orchestrator.orchestrate("<b>&quot;</b>", &[2], &options).await;
    let second = orchestrator.orchestrate("<b>&quot;</b>", &[2], &options).await;

    assert!(second.results.iter().all(|r| !r.from_cache));
    assert_eq!(orchestrator.history(10).history.len(), 2);
}

#[tokio::test]
async fn empty_layer_set_is_a_no_op() {
    let orchestrator = Orchestrator::local();
    let code = "const a = 1;";

    for requested in [&[][..], &[0, 7, 42][..]] {
        let result = orchestrator
            .orchestrate(code, requested, &ExecutionOptions::default())
            .await;
        assert!(!result.success);
        assert!(result.results.is_empty());
        assert_eq!(result.final_code, code);
        assert_eq!(result.summary.cache_hit_rate, 0.0);
    }
}

#[tokio::test]
async fn blank_code_aborts_before_any_layer() {
    let orchestrator = Orchestrator::local();

    let result = orchestrator
        .orchestrate("   \n", &[1, 2], &ExecutionOptions::default())
        .await;

    assert!(!result.success);
    assert!(result.results.is_empty());
    assert_eq!(result.errors, vec!["no code provided".to_string()]);
    assert_eq!(result.final_code, "   \n");
    assert_eq!(orchestrator.history(10).stats.total_executions, 1);
}

#[tokio::test]
async fn failing_layer_does_not_stop_later_layers() {
    let orchestrator = orchestrator_with(FailsOn(LayerId::EntityCleanup));
    let code = "<img src=\"a.png\">\n<p>&quot;</p>";

    let result = orchestrator
        .orchestrate(code, &[3], &ExecutionOptions::default())
        .await;

    assert_eq!(result.results.len(), 3);
    let failed = &result.results[1];
    assert!(!failed.success);
    assert!(failed.error.as_deref().unwrap().contains("handler exploded"));
    assert!(result.results[2].success);
    assert!(result.final_code.contains("alt=\"\""));
    assert!(result.final_code.contains("&quot;"));
    assert!(result.success);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("Layer 2:"));
}

#[tokio::test]
async fn panicking_transformer_becomes_a_failed_layer() {
    let orchestrator = orchestrator_with(Panicking);

    let result = orchestrator
        .orchestrate("const a = 1;", &[1], &ExecutionOptions::default())
        .await;

    assert_eq!(result.results.len(), 1);
    assert!(!result.success);
    assert!(result.results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("panicked"));
    assert_eq!(result.final_code, "const a = 1;");
}

#[tokio::test]
async fn cancelled_run_stops_before_the_next_layer() {
    let orchestrator = Orchestrator::local();
    let token = CancellationToken::new();
    token.cancel();

    let result = orchestrator
        .orchestrate_with_cancel("<p>&quot;</p>", &[2], &ExecutionOptions::default(), &token)
        .await;

    assert!(result.cancelled);
    assert!(result.results.is_empty());
    assert_eq!(result.final_code, "<p>&quot;</p>");
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.contains("cancelled")));
}

#[tokio::test]
async fn cancelling_mid_run_lets_the_running_layer_finish() {
    let token = CancellationToken::new();
    let orchestrator = orchestrator_with(CancelsDuring {
        layer: LayerId::EntityCleanup,
        token: token.clone(),
    });

    let result = orchestrator
        .orchestrate_with_cancel("<p>&quot;</p>", &[4], &ExecutionOptions::default(), &token)
        .await;

    let ran: Vec<u8> = result.results.iter().map(|r| r.layer_id.as_u8()).collect();
    assert_eq!(ran, vec![1, 2]);
    assert!(result.results[1].success);
    assert_eq!(result.final_code, "<p>\"</p>");
    assert!(result.cancelled);
    assert!(result.success);
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.contains("layers 3, 4 did not run")));
}

#[tokio::test]
async fn cancelled_run_summary_counts_every_corrected_layer() {
    let token = CancellationToken::new();
    let orchestrator = orchestrator_with(CancelsDuring {
        layer: LayerId::EntityCleanup,
        token: token.clone(),
    });
    let code = "<p>&quot;</p>";

    // Seeds the layer cache for layer 1 without touching the token.
    orchestrator
        .orchestrate(code, &[1], &ExecutionOptions::default())
        .await;
    let result = orchestrator
        .orchestrate_with_cancel(code, &[3], &ExecutionOptions::default(), &token)
        .await;

    assert!(result.cancelled);
    assert_eq!(result.results.len(), 2);
    assert!(result.results[0].from_cache);
    assert_eq!(result.summary.total_layers, 3);
    assert_eq!(result.summary.successful_layers, 2);
    assert!((result.summary.cache_hit_rate - 1.0 / 3.0).abs() < f64::EPSILON);

    // Cancelled runs are never replayed from the run cache.
    let rerun = orchestrator
        .orchestrate(code, &[3], &ExecutionOptions::default())
        .await;
    assert!(!rerun.cancelled);
    assert_eq!(rerun.results.len(), 3);
}

#[tokio::test]
async fn runs_with_skipped_layers_are_not_replayed_for_full_requests() {
    let orchestrator = Orchestrator::local();
    let code = "<p>&quot;</p>";
    let skipping = ExecutionOptions {
        skip_unnecessary: true,
        ..ExecutionOptions::default()
    };

    let first = orchestrator.orchestrate(code, &[3], &skipping).await;
    assert!(first.results.iter().any(|r| r.skipped));

    let full = orchestrator
        .orchestrate(code, &[3], &ExecutionOptions::default())
        .await;
    assert!(full.results.iter().all(|r| !r.skipped));
    assert_eq!(full.final_code, first.final_code);
}

#[tokio::test]
async fn layers_without_work_are_skipped_when_requested() {
    let orchestrator = Orchestrator::local();
    let options = ExecutionOptions {
        skip_unnecessary: true,
        ..ExecutionOptions::default()
    };

    let result = orchestrator
        .orchestrate("<p>&quot;</p>", &[3], &options)
        .await;

    let skipped: Vec<bool> = result.results.iter().map(|r| r.skipped).collect();
    assert_eq!(skipped, vec![true, false, true]);
    assert!(result.success);
    assert_eq!(result.final_code, "<p>\"</p>");
}

#[tokio::test]
async fn history_is_bounded_and_newest_first() {
    let config = OrchestratorConfig {
        history_capacity: 3,
        ..OrchestratorConfig::default()
    };
    let orchestrator = Orchestrator::new(Arc::new(LocalTransformer), config).unwrap();

    for i in 0..5 {
        let code = format!("const v{i} = &quot;;");
        orchestrator
            .orchestrate(&code, &[2], &ExecutionOptions::default())
            .await;
    }

    let report = orchestrator.history(10);
    assert_eq!(report.history.len(), 3);
    assert_eq!(report.stats.total_executions, 3);
    assert!(report.history[0].timestamp >= report.history[2].timestamp);
    assert_eq!(orchestrator.history(1).history.len(), 1);
}

#[test]
fn zero_capacity_configuration_is_rejected() {
    let config = OrchestratorConfig {
        run_cache_capacity: 0,
        ..OrchestratorConfig::default()
    };
    let err = Orchestrator::new(Arc::new(LocalTransformer), config).unwrap_err();
    assert!(err.to_string().contains("run_cache_capacity"));
}

#[test]
fn layer_catalog_lists_every_layer() {
    let catalog = Orchestrator::local().layer_info();
    assert_eq!(catalog.len(), 6);
    assert_eq!(catalog[3].id, LayerId::Hydration);
    assert_eq!(catalog[3].dependencies.len(), 3);
}
