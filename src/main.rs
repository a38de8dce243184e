use std::sync::Arc;

use ai_llm_service::telemetry;
use anyhow::Context;
use api::ApiConfig;
use contextor::ChatEngine;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the process environment may carry everything.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(telemetry::env_filter_with_level("info", Level::INFO))
        .with(telemetry::layer())
        .init();

    let engine = ChatEngine::from_env().context("failed to configure chat engine")?;
    let config = ApiConfig::from_env().context("failed to read API settings")?;

    api::start(Arc::new(engine), config).await?;
    Ok(())
}
