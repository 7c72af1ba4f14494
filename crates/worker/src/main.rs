//! shellcache worker entry point.
//!
//! Boots a one-shot sync cycle: install the core set, activate the new
//! resource table, then optionally download the full offline set.
//! Logging goes to stderr so stdout stays clean for scripting.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use shellcache_worker::runner;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = shellcache_core::config::AppConfig::load()?;

    runner::run(&config).await
}
