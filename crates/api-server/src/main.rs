//! API server binary entry point

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use doc_extract_api_server::{start_server, ApiState};
use doc_extract_ocr::{select_device, EngineConfig, OcrEngine};
use doc_extract_orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_extract_api_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Device binding happens once, before the engine is constructed
    let device = select_device();
    tracing::info!("Configured inference device: {device}");

    // Engine construction is expensive (model loading) and fatal on failure;
    // the service never starts serving with a half-initialized engine
    let config = EngineConfig::from_env();
    tracing::info!(
        "Loading recognition models from {} (language: {})",
        config.model_dir.display(),
        config.language
    );
    let engine =
        OcrEngine::new(config, device).context("failed to initialize recognition engine")?;
    tracing::info!("Recognition engine ready");

    let orchestrator = Arc::new(Orchestrator::new(Box::new(engine)));
    let state = ApiState::new(orchestrator, device);

    let addr = std::env::var("DOC_EXTRACT_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    tracing::info!("Starting document text extraction server");
    start_server(&addr, state).await?;

    Ok(())
}
