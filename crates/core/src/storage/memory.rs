//! In-memory bucket store.
//!
//! Backs tests and embedded use with the same contract as the SQLite
//! store. Uses a HashMap of buckets behind a tokio RwLock.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BucketStore, CachedAsset};
use crate::Error;

/// Non-persistent [`BucketStore`] implementation.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    buckets: Arc<RwLock<HashMap<String, HashMap<String, CachedAsset>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BucketStore for MemoryStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<CachedAsset>, Error> {
        let buckets = self.buckets.read().await;
        Ok(buckets.get(bucket).and_then(|entries| entries.get(key)).cloned())
    }

    async fn put(&self, bucket: &str, key: &str, asset: CachedAsset) -> Result<(), Error> {
        let mut buckets = self.buckets.write().await;
        buckets.entry(bucket.to_string()).or_default().insert(key.to_string(), asset);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<bool, Error> {
        let mut buckets = self.buckets.write().await;
        Ok(buckets.get_mut(bucket).is_some_and(|entries| entries.remove(key).is_some()))
    }

    async fn keys(&self, bucket: &str) -> Result<Vec<String>, Error> {
        let buckets = self.buckets.read().await;
        let mut keys: Vec<String> = buckets
            .get(bucket)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }

    async fn drop_bucket(&self, bucket: &str) -> Result<(), Error> {
        let mut buckets = self.buckets.write().await;
        buckets.remove(bucket);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CONTENT_BUCKET, STAGING_BUCKET};

    fn make_asset(body: &[u8]) -> CachedAsset {
        CachedAsset::new(body.to_vec(), None)
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new();
        store.put(CONTENT_BUCKET, "a", make_asset(b"1")).await.unwrap();

        assert_eq!(store.get(CONTENT_BUCKET, "a").await.unwrap().unwrap().body, b"1");
        assert!(store.delete(CONTENT_BUCKET, "a").await.unwrap());
        assert!(!store.delete(CONTENT_BUCKET, "a").await.unwrap());
        assert!(store.get(CONTENT_BUCKET, "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_sorted_and_scoped() {
        let store = MemoryStore::new();
        store.put(CONTENT_BUCKET, "b", make_asset(b"2")).await.unwrap();
        store.put(CONTENT_BUCKET, "a", make_asset(b"1")).await.unwrap();
        store.put(STAGING_BUCKET, "c", make_asset(b"3")).await.unwrap();

        assert_eq!(store.keys(CONTENT_BUCKET).await.unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.keys(STAGING_BUCKET).await.unwrap(), vec!["c".to_string()]);
    }

    #[tokio::test]
    async fn test_drop_bucket_absent_ok() {
        let store = MemoryStore::new();
        store.drop_bucket(CONTENT_BUCKET).await.unwrap();

        store.put(CONTENT_BUCKET, "a", make_asset(b"1")).await.unwrap();
        store.drop_bucket(CONTENT_BUCKET).await.unwrap();
        assert!(store.keys(CONTENT_BUCKET).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let alias = store.clone();
        store.put(CONTENT_BUCKET, "a", make_asset(b"1")).await.unwrap();

        assert!(alias.get(CONTENT_BUCKET, "a").await.unwrap().is_some());
    }
}
