//! Deployment resource model.
//!
//! A deployment publishes a resource table mapping logical asset keys to
//! content-hash version tokens, plus the ordered core set of keys the
//! application shell needs before it can load offline. The table is
//! replaced wholesale on every deployment; keys and hashes are validated
//! once at load time, never per lookup.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Canonical key for the application root document.
pub const ROOT_KEY: &str = "/";

/// Validated logical asset key.
///
/// Either the canonical root `/` or a relative path such as
/// `assets/FontManifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Parse and validate a raw key.
    ///
    /// Rejects empty keys, absolute or scheme-qualified paths, and keys
    /// containing whitespace, control characters, `?`, or `#` (those can
    /// never round-trip through a request URL unchanged).
    pub fn parse(raw: &str) -> Result<Self, Error> {
        if raw == ROOT_KEY {
            return Ok(Self::root());
        }
        if raw.is_empty() {
            return Err(Error::InvalidKey("empty key".to_string()));
        }
        if raw.starts_with('/') {
            return Err(Error::InvalidKey(format!("absolute path: {raw}")));
        }
        if raw.contains("://") {
            return Err(Error::InvalidKey(format!("scheme-qualified key: {raw}")));
        }
        if raw.chars().any(|c| c.is_whitespace() || c.is_control() || c == '?' || c == '#') {
            return Err(Error::InvalidKey(format!("illegal character in key: {raw}")));
        }
        Ok(Self(raw.to_string()))
    }

    /// The canonical root key.
    pub fn root() -> Self {
        Self(ROOT_KEY.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_KEY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ResourceKey {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self, Error> {
        Self::parse(&raw)
    }
}

impl From<ResourceKey> for String {
    fn from(key: ResourceKey) -> Self {
        key.0
    }
}

/// Opaque content-hash version token for a deployed asset.
///
/// The build pipeline decides the algorithm; this side only compares
/// tokens for equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Maximum accepted token length.
    const MAX_LEN: usize = 128;

    pub fn parse(raw: &str) -> Result<Self, Error> {
        if raw.is_empty() {
            return Err(Error::InvalidHash("empty hash".to_string()));
        }
        if raw.len() > Self::MAX_LEN {
            return Err(Error::InvalidHash(format!("hash longer than {} bytes", Self::MAX_LEN)));
        }
        if !raw.chars().all(|c| c.is_ascii_graphic()) {
            return Err(Error::InvalidHash(format!("non-printable hash: {raw}")));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self, Error> {
        Self::parse(&raw)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

/// Immutable mapping from logical key to content hash for one deployment.
///
/// Persisted into the manifest bucket as a flat JSON object so the next
/// upgrade can diff against it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceTable {
    entries: BTreeMap<ResourceKey, ContentHash>,
}

impl ResourceTable {
    pub fn new(entries: BTreeMap<ResourceKey, ContentHash>) -> Self {
        Self { entries }
    }

    /// Parse a table from its flat JSON object form.
    pub fn from_json(bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(|e| Error::Manifest(e.to_string()))
    }

    /// Serialize to the flat JSON object persisted in the manifest bucket.
    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(|e| Error::Manifest(e.to_string()))
    }

    pub fn hash_for(&self, key: &ResourceKey) -> Option<&ContentHash> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The deployment artifact consumed at startup: the resource table plus
/// the ordered core set downloaded during install.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployManifest {
    pub resources: ResourceTable,

    #[serde(default)]
    pub core: Vec<ResourceKey>,
}

impl DeployManifest {
    /// Parse a manifest and check that every core key is in the table.
    pub fn from_json(bytes: &[u8]) -> Result<Self, Error> {
        let manifest: Self = serde_json::from_slice(bytes).map_err(|e| Error::Manifest(e.to_string()))?;
        for key in &manifest.core {
            if !manifest.resources.contains(key) {
                return Err(Error::Manifest(format!("core key not in resource table: {key}")));
            }
        }
        Ok(manifest)
    }

    /// Load and validate a manifest file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let bytes = tokio::fs::read(path.as_ref())
            .await
            .map_err(|e| Error::Manifest(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_json(&bytes)
    }
}
