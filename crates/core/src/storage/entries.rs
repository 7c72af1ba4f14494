//! Bucket entry operations on the SQLite store.
//!
//! Implements the [`BucketStore`] contract over the `assets` table, with
//! upsert semantics on `(bucket, key)`.

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::{BucketStore, CachedAsset};
use crate::Error;

impl CacheDb {
    /// Look up an asset in a bucket.
    ///
    /// Returns None if the key isn't present.
    pub async fn get_asset(&self, bucket: &str, key: &str) -> Result<Option<CachedAsset>, Error> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedAsset>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT body, content_type, fetched_at FROM assets WHERE bucket = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![bucket, key], |row| {
                    Ok(CachedAsset { body: row.get(0)?, content_type: row.get(1)?, fetched_at: row.get(2)? })
                });

                match result {
                    Ok(asset) => Ok(Some(asset)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite an asset.
    pub async fn put_asset(&self, bucket: &str, key: &str, asset: CachedAsset) -> Result<(), Error> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO assets (bucket, key, content_type, fetched_at, body)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(bucket, key) DO UPDATE SET
                        content_type = excluded.content_type,
                        fetched_at = excluded.fetched_at,
                        body = excluded.body",
                    params![bucket, key, &asset.content_type, &asset.fetched_at, &asset.body],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry; returns whether an entry existed.
    pub async fn delete_asset(&self, bucket: &str, key: &str) -> Result<bool, Error> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM assets WHERE bucket = ?1 AND key = ?2", params![bucket, key])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// All keys in a bucket, sorted.
    pub async fn bucket_keys(&self, bucket: &str) -> Result<Vec<String>, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT key FROM assets WHERE bucket = ?1 ORDER BY key")?;
                let keys = stmt
                    .query_map(params![bucket], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a bucket and everything in it.
    pub async fn delete_bucket(&self, bucket: &str) -> Result<(), Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM assets WHERE bucket = ?1", params![bucket])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl BucketStore for CacheDb {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<CachedAsset>, Error> {
        self.get_asset(bucket, key).await
    }

    async fn put(&self, bucket: &str, key: &str, asset: CachedAsset) -> Result<(), Error> {
        self.put_asset(bucket, key, asset).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<bool, Error> {
        self.delete_asset(bucket, key).await
    }

    async fn keys(&self, bucket: &str) -> Result<Vec<String>, Error> {
        self.bucket_keys(bucket).await
    }

    async fn drop_bucket(&self, bucket: &str) -> Result<(), Error> {
        self.delete_bucket(bucket).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CONTENT_BUCKET, STAGING_BUCKET};

    fn make_asset(body: &[u8]) -> CachedAsset {
        CachedAsset::new(body.to_vec(), Some("application/octet-stream".to_string()))
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_asset(CONTENT_BUCKET, "main.dart.js", make_asset(b"bytes"))
            .await
            .unwrap();

        let asset = db.get_asset(CONTENT_BUCKET, "main.dart.js").await.unwrap().unwrap();
        assert_eq!(asset.body, b"bytes");
        assert_eq!(asset.content_type.as_deref(), Some("application/octet-stream"));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.get_asset(CONTENT_BUCKET, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_asset(CONTENT_BUCKET, "a", make_asset(b"old")).await.unwrap();
        db.put_asset(CONTENT_BUCKET, "a", make_asset(b"new")).await.unwrap();

        let asset = db.get_asset(CONTENT_BUCKET, "a").await.unwrap().unwrap();
        assert_eq!(asset.body, b"new");
    }

    #[tokio::test]
    async fn test_buckets_are_disjoint() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_asset(CONTENT_BUCKET, "a", make_asset(b"content")).await.unwrap();
        db.put_asset(STAGING_BUCKET, "a", make_asset(b"staged")).await.unwrap();

        let content = db.get_asset(CONTENT_BUCKET, "a").await.unwrap().unwrap();
        let staged = db.get_asset(STAGING_BUCKET, "a").await.unwrap().unwrap();
        assert_eq!(content.body, b"content");
        assert_eq!(staged.body, b"staged");
    }

    #[tokio::test]
    async fn test_delete() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_asset(CONTENT_BUCKET, "a", make_asset(b"x")).await.unwrap();

        assert!(db.delete_asset(CONTENT_BUCKET, "a").await.unwrap());
        assert!(!db.delete_asset(CONTENT_BUCKET, "a").await.unwrap());
        assert!(db.get_asset(CONTENT_BUCKET, "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_sorted() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_asset(CONTENT_BUCKET, "b", make_asset(b"2")).await.unwrap();
        db.put_asset(CONTENT_BUCKET, "a", make_asset(b"1")).await.unwrap();
        db.put_asset(STAGING_BUCKET, "z", make_asset(b"3")).await.unwrap();

        let keys = db.bucket_keys(CONTENT_BUCKET).await.unwrap();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_drop_bucket() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_asset(CONTENT_BUCKET, "a", make_asset(b"1")).await.unwrap();
        db.put_asset(STAGING_BUCKET, "b", make_asset(b"2")).await.unwrap();

        db.delete_bucket(CONTENT_BUCKET).await.unwrap();

        assert!(db.bucket_keys(CONTENT_BUCKET).await.unwrap().is_empty());
        assert_eq!(db.bucket_keys(STAGING_BUCKET).await.unwrap().len(), 1);

        // Dropping an absent bucket is not an error.
        db.delete_bucket(CONTENT_BUCKET).await.unwrap();
    }
}
