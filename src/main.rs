//! medparswell - HTTP front end for llama-cli
//!
//! Loads configuration from the environment, then serves summarization and
//! inference requests by shelling out to the configured binary.

use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use medparswell::api::{start_server, AppState};
use medparswell::config::env_names::APP_LOG_LEVEL;
use medparswell::config::AppSettings;
use medparswell::inference::{inspect_model, LlamaRunner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var(APP_LOG_LEVEL)
                .from_env_lossy(),
        )
        .init();

    info!("Starting medparswell v{}", env!("CARGO_PKG_VERSION"));

    let settings = AppSettings::from_env().context("Failed to load configuration")?;
    settings.log_summary();
    inspect_model(&settings.runner);

    let dry_run = settings.runner.dry_run;
    let runner = Arc::new(LlamaRunner::new(settings.runner));
    let state = Arc::new(AppState::new(runner, settings.endpoints, dry_run));

    start_server(&settings.server, state).await
}
