//! Laminate CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: load `laminate.toml` (or `--config`), apply
//!    `LAMINATE_*` environment overrides, and validate.
//! 2. **Wire observability**: install `tracing-subscriber` with an env filter,
//!    plain or JSON output, and an OpenTelemetry OTLP layer when an endpoint
//!    is configured.
//! 3. **Construct the transformer**: the remote client wrapped in a local
//!    fallback when `remote.base_url` is set, otherwise local handlers only.
//! 4. **Dispatch**: serve HTTP, or run one analysis or execution against a
//!    file and print the JSON result.

mod config;
mod telemetry;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use engine::{LocalTransformer, Orchestrator};
use pipeline::{ExecutionOptions, FallbackTransformer, LayerTransformer};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use transform_api::RemoteTransformer;

use crate::config::LaminateConfig;

#[derive(Debug, Parser)]
#[command(name = "laminate", version, about = "Layered code transformation engine")]
struct Cli {
    /// Configuration file; defaults to ./laminate.toml when present.
    #[arg(long, global = true, env = "LAMINATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Listen address; overrides `server.bind`.
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Detect issues in a file and recommend layers.
    Analyze { file: PathBuf },
    /// Run layers over a file.
    Execute {
        file: PathBuf,
        /// Comma-separated layer ids, e.g. `1,2,4`.
        #[arg(long, value_delimiter = ',', required = true)]
        layers: Vec<u8>,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        no_cache: bool,
        #[arg(long)]
        skip_unnecessary: bool,
        #[arg(long)]
        verbose: bool,
        /// Write the final code back to the file when the run succeeds.
        #[arg(long, conflicts_with = "dry_run")]
        write: bool,
    },
    /// List the available layers.
    Layers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = LaminateConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let _telemetry = telemetry::init(&config.telemetry)?;

    let orchestrator = Arc::new(build_orchestrator(&config)?);

    match cli.command {
        Command::Serve { bind } => serve(orchestrator, bind.unwrap_or(config.server.bind)).await,
        Command::Analyze { file } => analyze(&orchestrator, &file),
        Command::Execute {
            file,
            layers,
            dry_run,
            no_cache,
            skip_unnecessary,
            verbose,
            write,
        } => {
            let options = ExecutionOptions {
                verbose,
                dry_run,
                use_cache: !no_cache,
                skip_unnecessary,
            };
            execute(&orchestrator, &file, &layers, &options, write).await
        }
        Command::Layers => {
            print_layers(&orchestrator);
            Ok(())
        }
    }
}

fn build_orchestrator(config: &LaminateConfig) -> anyhow::Result<Orchestrator> {
    let transformer: Arc<dyn LayerTransformer> = match config.remote.client_config() {
        Some(remote) => {
            info!(base_url = %remote.base_url, timeout = ?remote.timeout, "using remote transformer with local fallback");
            Arc::new(FallbackTransformer::new(
                RemoteTransformer::new(remote),
                LocalTransformer,
            ))
        }
        None => Arc::new(LocalTransformer),
    };
    Orchestrator::new(transformer, config.engine).context("invalid engine configuration")
}

async fn serve(orchestrator: Arc<Orchestrator>, bind: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    listener::serve(listener, orchestrator, shutdown_signal())
        .await
        .context("HTTP server error")?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c; shutting down");
    }
}

fn read_source(file: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))
}

fn analyze(orchestrator: &Orchestrator, file: &Path) -> anyhow::Result<()> {
    let code = read_source(file)?;
    let report = orchestrator.analyze(&code, file.to_str());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn execute(
    orchestrator: &Orchestrator,
    file: &Path,
    layers: &[u8],
    options: &ExecutionOptions,
    write: bool,
) -> anyhow::Result<()> {
    let code = read_source(file)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping after the current layer");
            on_interrupt.cancel();
        }
    });

    let result = orchestrator
        .orchestrate_with_cancel(&code, layers, options, &cancel)
        .await;

    if write && result.success && result.final_code != code {
        std::fs::write(file, &result.final_code)
            .with_context(|| format!("failed to write {}", file.display()))?;
        info!(file = %file.display(), "wrote transformed code");
    }
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn print_layers(orchestrator: &Orchestrator) {
    for layer in orchestrator.layer_info() {
        let deps: Vec<String> = layer.dependencies.iter().map(ToString::to_string).collect();
        let deps = if deps.is_empty() {
            "-".to_string()
        } else {
            deps.join(",")
        };
        println!(
            "{:>2}  {:<22} deps: {:<10} ~{}ms  {}",
            layer.id,
            layer.name,
            deps,
            layer.estimated_cost.as_millis(),
            layer.description
        );
    }
}
