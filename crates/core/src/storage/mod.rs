//! Bucket storage for cached assets.
//!
//! Three named buckets back the cache manager: durable content, transient
//! install staging, and a single-entry manifest bucket holding the
//! previously activated resource table. Storage is an injected capability:
//! production runs on SQLite via tokio-rusqlite, tests run on the
//! in-memory store, both behind the same [`BucketStore`] contract.

pub mod connection;
pub mod entries;
pub mod memory;
pub mod migrations;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use connection::CacheDb;
pub use memory::MemoryStore;

use crate::Error;

/// Bucket of assets served to clients; survives upgrades.
pub const CONTENT_BUCKET: &str = "content";

/// Bucket staging freshly fetched assets during install; discarded after
/// activation merges it into content.
pub const STAGING_BUCKET: &str = "staging";

/// Bucket holding the previously activated resource table.
pub const MANIFEST_BUCKET: &str = "manifest";

/// Key of the single entry in the manifest bucket.
pub const MANIFEST_KEY: &str = "manifest";

/// A stored asset payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAsset {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub fetched_at: String,
}

impl CachedAsset {
    /// New asset stamped with the current time.
    pub fn new(body: Vec<u8>, content_type: Option<String>) -> Self {
        Self { body, content_type, fetched_at: chrono::Utc::now().to_rfc3339() }
    }
}

/// Named-bucket storage contract.
///
/// Buckets spring into existence on first write; dropping an absent bucket
/// is not an error. Within each operation calls run sequentially, so no
/// interleaved partial state is observable through this trait.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Look up an asset, `None` on a miss.
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<CachedAsset>, Error>;

    /// Insert or overwrite an asset.
    async fn put(&self, bucket: &str, key: &str, asset: CachedAsset) -> Result<(), Error>;

    /// Delete one entry; returns whether an entry existed.
    async fn delete(&self, bucket: &str, key: &str) -> Result<bool, Error>;

    /// All keys currently in the bucket, sorted.
    async fn keys(&self, bucket: &str) -> Result<Vec<String>, Error>;

    /// Delete the bucket and everything in it.
    async fn drop_bucket(&self, bucket: &str) -> Result<(), Error>;
}
