//! Versioned cache manager.
//!
//! Owns the three storage buckets and reconciles them against the
//! deployed resource table: install stages the application shell,
//! activate diffs the previous deployment against the current one so
//! unchanged assets are not re-downloaded, and resolve serves read
//! requests cache-first with an online-first root document.

use std::collections::HashSet;
use std::sync::Arc;

use shellcache_client::{FetchMode, Method, Origin, Transport, Url};
use shellcache_core::storage::{CONTENT_BUCKET, MANIFEST_BUCKET, MANIFEST_KEY, STAGING_BUCKET};
use shellcache_core::{BucketStore, CachedAsset, DeployManifest, Error, ResourceKey, ResourceTable};

use crate::lifecycle::LifecycleController;
use crate::request;

/// Control message that supersedes a waiting instance immediately.
pub const MSG_SKIP_WAITING: &str = "skipWaiting";

/// Control message that triggers a full offline download.
pub const MSG_DOWNLOAD_OFFLINE: &str = "downloadOffline";

/// Outcome of routing a request through the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Serve this asset.
    Asset(CachedAsset),
    /// Not ours; the caller's native transport should handle it.
    Passthrough,
}

/// Mediates between the fetch transport and bucket storage so clients
/// are served bytes matching the current resource table.
pub struct CacheManager {
    store: Arc<dyn BucketStore>,
    transport: Arc<dyn Transport>,
    lifecycle: Arc<dyn LifecycleController>,
    origin: Origin,
    resources: ResourceTable,
    core: Vec<ResourceKey>,
}

impl CacheManager {
    pub fn new(
        store: Arc<dyn BucketStore>, transport: Arc<dyn Transport>, lifecycle: Arc<dyn LifecycleController>,
        origin: Origin, manifest: DeployManifest,
    ) -> Self {
        Self { store, transport, lifecycle, origin, resources: manifest.resources, core: manifest.core }
    }

    /// Stage the application shell.
    ///
    /// Every core resource is fetched with forced revalidation and
    /// written into the staging bucket. A single failed fetch fails the
    /// whole install: staging is dropped so the next attempt starts from
    /// scratch.
    pub async fn install(&self) -> Result<(), Error> {
        self.lifecycle.skip_waiting().await?;

        if let Err(err) = self.stage_core_set().await {
            self.store.drop_bucket(STAGING_BUCKET).await?;
            return Err(err);
        }
        Ok(())
    }

    async fn stage_core_set(&self) -> Result<(), Error> {
        for key in &self.core {
            let url = self.origin.url_for(key)?;
            let response = self.transport.fetch(&url, FetchMode::Reload).await?;
            self.store.put(STAGING_BUCKET, key.as_str(), response.into_asset()).await?;
        }
        tracing::info!(staged = self.core.len(), "core set staged");
        Ok(())
    }

    /// Reconcile the content bucket with the current resource table.
    ///
    /// Failure semantics are all-or-nothing: any error inside
    /// reconciliation wipes all three buckets so no partial state
    /// survives, then propagates.
    pub async fn activate(&self) -> Result<(), Error> {
        match self.reconcile().await {
            Ok(()) => {
                self.lifecycle.claim_clients().await?;
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "activation failed, wiping cache state");
                for bucket in [CONTENT_BUCKET, STAGING_BUCKET, MANIFEST_BUCKET] {
                    if let Err(wipe_err) = self.store.drop_bucket(bucket).await {
                        tracing::error!(bucket, error = %wipe_err, "failed to drop bucket during wipe");
                    }
                }
                Err(err)
            }
        }
    }

    async fn reconcile(&self) -> Result<(), Error> {
        let previous = self.load_previous_table().await?;

        let Some(previous) = previous else {
            // No prior manifest: existing content cannot be attributed to
            // any table, so start from an empty bucket.
            self.store.drop_bucket(CONTENT_BUCKET).await?;
            self.promote_staged().await?;
            self.persist_table().await?;
            tracing::info!(resources = self.resources.len(), "first activation complete");
            return Ok(());
        };

        // Drop content entries that left the table or changed hash since
        // the previous deployment; unchanged entries stay and are never
        // re-downloaded.
        for raw in self.store.keys(CONTENT_BUCKET).await? {
            let key = ResourceKey::parse(&raw)?;
            let stale = match self.resources.hash_for(&key) {
                None => true,
                Some(hash) => previous.hash_for(&key) != Some(hash),
            };
            if stale {
                tracing::debug!(key = raw, "dropping stale asset");
                self.store.delete(CONTENT_BUCKET, &raw).await?;
            }
        }

        self.promote_staged().await?;
        self.persist_table().await?;
        tracing::info!(resources = self.resources.len(), "activation complete");
        Ok(())
    }

    async fn load_previous_table(&self) -> Result<Option<ResourceTable>, Error> {
        match self.store.get(MANIFEST_BUCKET, MANIFEST_KEY).await? {
            Some(entry) => Ok(Some(ResourceTable::from_json(&entry.body)?)),
            None => Ok(None),
        }
    }

    /// Copy every staged entry into content, staged bytes winning over
    /// anything retained, then drop the staging bucket.
    async fn promote_staged(&self) -> Result<(), Error> {
        for key in self.store.keys(STAGING_BUCKET).await? {
            if let Some(asset) = self.store.get(STAGING_BUCKET, &key).await? {
                self.store.put(CONTENT_BUCKET, &key, asset).await?;
            }
        }
        self.store.drop_bucket(STAGING_BUCKET).await?;
        Ok(())
    }

    async fn persist_table(&self) -> Result<(), Error> {
        let body = self.resources.to_json()?;
        self.store
            .put(MANIFEST_BUCKET, MANIFEST_KEY, CachedAsset::new(body, Some("application/json".to_string())))
            .await
    }

    /// Route a read request through the cache.
    ///
    /// Non-GET methods, foreign origins, and keys outside the resource
    /// table all pass through to the caller's native transport. The root
    /// document resolves online-first; every other table key resolves
    /// cache-first.
    pub async fn resolve(&self, url: &Url, method: &Method) -> Result<Resolution, Error> {
        if *method != Method::GET {
            return Ok(Resolution::Passthrough);
        }

        let Some(key) = request::resource_key(&self.origin, url) else {
            return Ok(Resolution::Passthrough);
        };

        if !self.resources.contains(&key) {
            return Ok(Resolution::Passthrough);
        }

        if key.is_root() {
            return self.resolve_online_first(&key).await.map(Resolution::Asset);
        }
        self.resolve_cache_first(&key).await.map(Resolution::Asset)
    }

    /// Cached bytes win; a miss goes to the network and populates the
    /// cache. A failed live fetch propagates: cache-first skips the
    /// network on a hit, it does not mask network failure on a miss.
    async fn resolve_cache_first(&self, key: &ResourceKey) -> Result<CachedAsset, Error> {
        if let Some(asset) = self.store.get(CONTENT_BUCKET, key.as_str()).await? {
            tracing::debug!(key = key.as_str(), "cache hit");
            return Ok(asset);
        }

        let url = self.origin.url_for(key)?;
        let asset = self.transport.fetch(&url, FetchMode::Default).await?.into_asset();
        self.store.put(CONTENT_BUCKET, key.as_str(), asset.clone()).await?;
        Ok(asset)
    }

    /// The live response wins so the root document tracks the latest
    /// deployment; the cached copy keeps it reachable offline.
    async fn resolve_online_first(&self, key: &ResourceKey) -> Result<CachedAsset, Error> {
        let url = self.origin.url_for(key)?;
        match self.transport.fetch(&url, FetchMode::Default).await {
            Ok(response) => {
                let asset = response.into_asset();
                self.store.put(CONTENT_BUCKET, key.as_str(), asset.clone()).await?;
                Ok(asset)
            }
            Err(fetch_err) => match self.store.get(CONTENT_BUCKET, key.as_str()).await? {
                Some(asset) => {
                    tracing::debug!(key = key.as_str(), "serving cached root, network unreachable");
                    Ok(asset)
                }
                None => Err(fetch_err),
            },
        }
    }

    /// Fetch and store every table resource not yet in the content
    /// bucket. Returns the number of assets downloaded; a second run
    /// with an unchanged table downloads nothing.
    pub async fn download_offline(&self) -> Result<usize, Error> {
        let present: HashSet<String> = self.store.keys(CONTENT_BUCKET).await?.into_iter().collect();

        let mut fetched = 0;
        for key in self.resources.keys() {
            if present.contains(key.as_str()) {
                continue;
            }
            let url = self.origin.url_for(key)?;
            let asset = self.transport.fetch(&url, FetchMode::Default).await?.into_asset();
            self.store.put(CONTENT_BUCKET, key.as_str(), asset).await?;
            fetched += 1;
        }

        tracing::info!(fetched, "offline download complete");
        Ok(fetched)
    }

    /// Handle a control message; anything unrecognized is ignored.
    pub async fn handle_control_message(&self, message: &str) -> Result<(), Error> {
        match message {
            MSG_SKIP_WAITING => self.lifecycle.skip_waiting().await,
            MSG_DOWNLOAD_OFFLINE => self.download_offline().await.map(|_| ()),
            other => {
                tracing::debug!(message = other, "ignoring unknown control message");
                Ok(())
            }
        }
    }
}
