//! Upstream instance addresses.
//!
//! # Responsibilities
//! - Split the comma-separated instance list from configuration
//! - Normalize one address into a full request URL (scheme + path)
//!
//! # Design Decisions
//! - Order is preserved and defines the round-robin sequence
//! - Duplicates are kept; deduplication is the operator's call
//! - Resolution is deterministic and happens once, at invoker construction

use std::fmt;
use url::Url;

use crate::proxy::error::{ProxyError, ProxyResult};

/// Scheme applied to addresses configured without one.
pub const DEFAULT_SCHEME: &str = "http";

/// Schemes the outbound client can speak.
const SUPPORTED_SCHEMES: [&str; 2] = ["http", "https"];

/// One upstream address the proxy may dispatch to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instance {
    address: String,
}

impl Instance {
    /// Create an instance from a raw configuration entry (whitespace is trimmed).
    pub fn new(address: impl AsRef<str>) -> Self {
        Self {
            address: address.as_ref().trim().to_string(),
        }
    }

    /// The address as configured, e.g. `a.test:9000`.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Resolve into the URL outbound calls are sent to.
    ///
    /// Adds `http://` when the address has no scheme, and `default_path`
    /// when the address carries no path of its own. An explicit `https://`
    /// is kept.
    pub fn resolve(&self, default_path: &str) -> ProxyResult<Url> {
        if self.address.is_empty() {
            return Err(self.invalid("empty address"));
        }

        let with_scheme = if self.address.contains("://") {
            self.address.clone()
        } else {
            format!("{}://{}", DEFAULT_SCHEME, self.address)
        };

        let mut url = Url::parse(&with_scheme).map_err(|e| self.invalid(e.to_string()))?;

        if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
            return Err(self.invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(self.invalid("missing host"));
        }

        // `Url` reports "/" for both "host" and "host/", so look at the raw text.
        let after_scheme = with_scheme
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or_default();
        if !after_scheme.contains('/') {
            url.set_path(default_path);
        }

        Ok(url)
    }

    fn invalid(&self, reason: impl Into<String>) -> ProxyError {
        ProxyError::InvalidInstance {
            address: self.address.clone(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

/// Split a comma-separated instance list.
///
/// A blank list yields no instances. Otherwise every comma-separated token
/// becomes one instance, in order, including empty tokens (which later fail
/// resolution).
pub fn parse_instances(list: &str) -> Vec<Instance> {
    if list.trim().is_empty() {
        return Vec::new();
    }
    list.split(',').map(Instance::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "/ean/rate_breakdown";

    #[test]
    fn test_parse_preserves_order_and_trims() {
        let instances = parse_instances("a.test:9000, b.test:9000 ,c.test");
        let addrs: Vec<&str> = instances.iter().map(Instance::address).collect();
        assert_eq!(addrs, vec!["a.test:9000", "b.test:9000", "c.test"]);
    }

    #[test]
    fn test_parse_keeps_duplicates_and_empty_tokens() {
        assert_eq!(parse_instances("a,a").len(), 2);
        assert_eq!(parse_instances("a,,b").len(), 3);
        assert!(parse_instances("").is_empty());
        assert!(parse_instances("   ").is_empty());
    }

    #[test]
    fn test_resolve_applies_defaults() {
        let url = Instance::new("a.test:9000").resolve(PATH).unwrap();
        assert_eq!(url.as_str(), "http://a.test:9000/ean/rate_breakdown");

        let url = Instance::new("http://b.test").resolve(PATH).unwrap();
        assert_eq!(url.as_str(), "http://b.test/ean/rate_breakdown");
    }

    #[test]
    fn test_resolve_keeps_https() {
        let url = Instance::new("https://b.test").resolve(PATH).unwrap();
        assert_eq!(url.as_str(), "https://b.test/ean/rate_breakdown");

        let url = Instance::new("https://b.test:8443/rates").resolve(PATH).unwrap();
        assert_eq!(url.as_str(), "https://b.test:8443/rates");
    }

    #[test]
    fn test_resolve_keeps_explicit_path() {
        let url = Instance::new("a.test:9000/custom/rates").resolve(PATH).unwrap();
        assert_eq!(url.path(), "/custom/rates");

        let url = Instance::new("http://a.test:9000/").resolve(PATH).unwrap();
        assert_eq!(url.path(), "/");
    }

    #[test]
    fn test_resolve_rejects_malformed() {
        assert!(matches!(
            Instance::new("").resolve(PATH),
            Err(ProxyError::InvalidInstance { .. })
        ));
        assert!(Instance::new("a.test:notaport").resolve(PATH).is_err());
        assert!(Instance::new("ftp://a.test").resolve(PATH).is_err());
    }
}
