//! ViewLink bridge binary.
//!
//! Wires configuration → capture backend → capture loop → hand-off context,
//! with a diagnostic sink polling the consumer side until a protocol server
//! takes its place.
//!
//! ```text
//! DesktopDuplicator (IDXGIOutputDuplication; stub off-Windows)
//!   │  dedicated "display" thread
//!   ▼
//! run_capture_loop ──► PipelineContext ──► diagnostic sink (tokio task)
//!                          ▲                   │
//!                          └── release ────────┘
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Notify;
use tracing::info;
use tracing_subscriber::EnvFilter;

use viewlink_bridge::{driver::BridgePipeline, sink};
use viewlink_capture_windows::DesktopDuplicator;
use viewlink_core::{BridgeConfig, PipelineContext, SinkWaker};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("ViewLink bridge v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("load configuration")?;
    info!(
        "display[{}] acquire timeout {}ms",
        config.display_index, config.acquire_timeout_ms
    );

    let ctx = PipelineContext::new();
    let notify = Arc::new(Notify::new());
    let waker: Arc<dyn SinkWaker> = Arc::new(sink::NotifyWaker::new(Arc::clone(&notify)));

    let source = DesktopDuplicator::open(config.display_index)?;
    let pipeline = BridgePipeline::spawn(source, Arc::clone(&ctx), waker, config.acquire_timeout())?;

    tokio::spawn(sink::run_diagnostic_sink(Arc::clone(&ctx), notify));

    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
    info!("shutting down");

    pipeline.stop();
    tokio::task::spawn_blocking(move || pipeline.join())
        .await
        .context("join capture thread")??;
    Ok(())
}

/// First CLI argument, if any, names a JSON config file; otherwise defaults.
fn load_config() -> Result<BridgeConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path).with_context(|| format!("read {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parse {path}"))
        }
        None => Ok(BridgeConfig::default()),
    }
}
