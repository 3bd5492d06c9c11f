//! swkit engine entry point.
//!
//! Boots the offline engine on the stdio host transport. Logging goes to
//! stderr to avoid interfering with the JSON event protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use swkit_client::fetch::{FetchClient, FetchConfig};
use swkit_core::cache::CacheDb;
use swkit_core::config::AppConfig;
use swkit_worker::engine::Engine;
use swkit_worker::transport;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        "starting offline engine, generation {}",
        config.generation_id()
    );

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = Arc::new(FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        ..Default::default()
    })?);

    let (engine, signals) = Engine::new(db, fetcher, config)?;
    transport::run(engine, signals).await?;

    Ok(())
}
