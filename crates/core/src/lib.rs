//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - The deployment resource model (resource table, core set)
//! - Bucket storage with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod resources;
pub mod storage;

pub use error::Error;
pub use resources::{ContentHash, DeployManifest, ResourceKey, ResourceTable};
pub use storage::{BucketStore, CacheDb, CachedAsset, MemoryStore};
