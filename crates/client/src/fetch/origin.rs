//! Deployment origin handling.
//!
//! The origin anchors every logical resource key: keys are joined onto it
//! when fetching, and request URLs are stripped back to raw in-origin
//! keys when routing.

use reqwest::Url;

use shellcache_core::{Error, ResourceKey};

/// Error type for origin validation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OriginError {
    #[error("empty origin")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("origin must be a bare root, no path, query, or fragment: {0}")]
    NotARoot(String),

    #[error("invalid origin: {0}")]
    Invalid(String),
}

impl From<OriginError> for Error {
    fn from(err: OriginError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

/// Validated deployment origin, e.g. `https://app.example.com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    base: Url,
}

impl Origin {
    /// Parse and validate an origin string.
    ///
    /// Steps: trim whitespace, default the scheme to `https`, require
    /// http(s) with a host, reject anything beyond the bare root.
    pub fn parse(input: &str) -> Result<Self, OriginError> {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Err(OriginError::Empty);
        }

        let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

        let parsed = Url::parse(&url_str).map_err(|e| OriginError::Invalid(e.to_string()))?;

        match parsed.scheme() {
            "http" | "https" => {}
            scheme => return Err(OriginError::UnsupportedScheme(scheme.to_string())),
        }

        if parsed.host_str().is_none() {
            return Err(OriginError::Invalid(format!("no host: {trimmed}")));
        }

        if parsed.path() != "/" || parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(OriginError::NotARoot(trimmed.to_string()));
        }

        Ok(Self { base: parsed })
    }

    pub fn as_url(&self) -> &Url {
        &self.base
    }

    /// Request URL for a logical resource key.
    pub fn url_for(&self, key: &ResourceKey) -> Result<Url, OriginError> {
        if key.is_root() {
            return Ok(self.base.clone());
        }
        self.base.join(key.as_str()).map_err(|e| OriginError::Invalid(e.to_string()))
    }

    /// Strip a request URL down to its raw in-origin key.
    ///
    /// Returns None when the URL belongs to a different origin. The raw
    /// key still carries any query or fragment suffix; routing normalizes
    /// those further.
    pub fn strip(&self, url: &Url) -> Option<String> {
        if url.scheme() != self.base.scheme()
            || url.host_str() != self.base.host_str()
            || url.port_or_known_default() != self.base.port_or_known_default()
        {
            return None;
        }

        let mut raw = url.path().trim_start_matches('/').to_string();
        if let Some(query) = url.query() {
            raw.push('?');
            raw.push_str(query);
        }
        if let Some(fragment) = url.fragment() {
            raw.push('#');
            raw.push_str(fragment);
        }
        Some(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let origin = Origin::parse("https://app.example.com").unwrap();
        assert_eq!(origin.as_url().as_str(), "https://app.example.com/");
    }

    #[test]
    fn test_parse_default_scheme() {
        let origin = Origin::parse("app.example.com").unwrap();
        assert_eq!(origin.as_url().scheme(), "https");
    }

    #[test]
    fn test_parse_http_allowed() {
        let origin = Origin::parse("http://localhost:8080").unwrap();
        assert_eq!(origin.as_url().port(), Some(8080));
    }

    #[test]
    fn test_parse_rejects_path() {
        assert!(matches!(Origin::parse("https://app.example.com/sub"), Err(OriginError::NotARoot(_))));
    }

    #[test]
    fn test_parse_rejects_scheme() {
        assert!(matches!(Origin::parse("file:///var/www"), Err(OriginError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(Origin::parse("  "), Err(OriginError::Empty)));
    }

    #[test]
    fn test_url_for_key() {
        let origin = Origin::parse("https://app.example.com").unwrap();
        let key = ResourceKey::parse("assets/FontManifest.json").unwrap();
        assert_eq!(origin.url_for(&key).unwrap().as_str(), "https://app.example.com/assets/FontManifest.json");
    }

    #[test]
    fn test_url_for_root() {
        let origin = Origin::parse("https://app.example.com").unwrap();
        assert_eq!(origin.url_for(&ResourceKey::root()).unwrap().as_str(), "https://app.example.com/");
    }

    #[test]
    fn test_strip_in_origin() {
        let origin = Origin::parse("https://app.example.com").unwrap();
        let url = Url::parse("https://app.example.com/main.dart.js?v=abc").unwrap();
        assert_eq!(origin.strip(&url).as_deref(), Some("main.dart.js?v=abc"));
    }

    #[test]
    fn test_strip_root_and_fragment() {
        let origin = Origin::parse("https://app.example.com").unwrap();
        assert_eq!(origin.strip(&Url::parse("https://app.example.com/").unwrap()).as_deref(), Some(""));
        assert_eq!(origin.strip(&Url::parse("https://app.example.com/#deep").unwrap()).as_deref(), Some("#deep"));
    }

    #[test]
    fn test_strip_foreign_origin() {
        let origin = Origin::parse("https://app.example.com").unwrap();
        assert!(origin.strip(&Url::parse("https://cdn.example.com/x.js").unwrap()).is_none());
        assert!(origin.strip(&Url::parse("http://app.example.com/x.js").unwrap()).is_none());
    }

    #[test]
    fn test_strip_explicit_default_port() {
        let origin = Origin::parse("https://app.example.com").unwrap();
        let url = Url::parse("https://app.example.com:443/x.js").unwrap();
        assert_eq!(origin.strip(&url).as_deref(), Some("x.js"));
    }
}
