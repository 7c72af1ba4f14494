//! One-shot sync cycle driver.
//!
//! Wires the concrete collaborators together and runs install followed
//! by activate, the same order the lifecycle host would drive them in.

use std::sync::Arc;

use anyhow::{Context, Result};

use shellcache_client::{FetchClient, FetchConfig, Origin};
use shellcache_core::config::AppConfig;
use shellcache_core::{CacheDb, DeployManifest};

use crate::lifecycle::DetachedLifecycle;
use crate::manager::CacheManager;

/// Run one full sync cycle against the configured deployment.
pub async fn run(config: &AppConfig) -> Result<()> {
    let origin = Origin::parse(config.require_origin()?).context("invalid origin")?;

    let manifest = DeployManifest::load(&config.manifest_path)
        .await
        .with_context(|| format!("failed to load deploy manifest from {}", config.manifest_path.display()))?;

    tracing::info!(
        origin = %origin.as_url(),
        resources = manifest.resources.len(),
        core = manifest.core.len(),
        "starting sync cycle"
    );

    let store = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache database at {}", config.db_path.display()))?;

    let transport = FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        max_redirects: config.max_redirects,
    })?;

    let manager = CacheManager::new(
        Arc::new(store),
        Arc::new(transport),
        Arc::new(DetachedLifecycle),
        origin,
        manifest,
    );

    manager.install().await.context("install failed")?;
    manager.activate().await.context("activate failed")?;

    if config.full_offline {
        let fetched = manager.download_offline().await.context("offline download failed")?;
        tracing::info!(fetched, "offline set complete");
    }

    Ok(())
}
