//! Request routing: normalizing request URLs into logical resource keys.

use shellcache_client::{Origin, Url};
use shellcache_core::ResourceKey;

/// Marker splitting a cache-busting version suffix off a request key.
const VERSION_MARKER: &str = "?v=";

/// Normalize a request URL into the logical key it addresses.
///
/// A `?v=` cache-busting suffix is stripped; the origin itself, a
/// fragment-only navigation, and the empty key all collapse to the
/// canonical root key. Returns None for URLs outside the deployment
/// origin and for keys that can never appear in a resource table.
pub fn resource_key(origin: &Origin, url: &Url) -> Option<ResourceKey> {
    let raw = origin.strip(url)?;

    let key = match raw.find(VERSION_MARKER) {
        Some(idx) => &raw[..idx],
        None => raw.as_str(),
    };

    if key.is_empty() || key.starts_with('#') {
        return Some(ResourceKey::root());
    }

    ResourceKey::parse(key).ok()
}
