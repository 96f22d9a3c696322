//! JWKS fetching and caching
//!
//! Fetches the identity provider's public signing keys and caches them per
//! endpoint with a time-based expiry:
//!
//! - **TTL-based caching**: default 5 minutes per endpoint
//! - **Wholesale replacement**: entries are replaced on refetch, never merged
//! - **Injectable fetch**: the [`KeyFetcher`] seam lets tests supply keys
//!   without a network
//!
//! The cache is the only mutable shared state in the crate. Concurrent
//! reads clone entries out of an `RwLock`-guarded map; concurrent refreshes
//! for one endpoint may race, in which case the last writer wins and every
//! racing caller still receives a valid key set.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{VerifyError, VerifyResult};

/// Path of the JWKS document below the identity provider base URL
pub const DISCOVERY_PATH: &str = "/oidc/jwks";

/// Default lifetime of a cached key set
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// A single JSON Web Key.
///
/// Only the members the verification pipeline reads are typed; everything
/// else the provider publishes is preserved in `additional`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key id, unique within its set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Signing algorithm the key is intended for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Key type, e.g. `RSA`, `EC`, `oct`
    #[serde(default)]
    pub kty: String,
    /// Intended key use, e.g. `sig`
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// RSA modulus, base64url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA public exponent, base64url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    /// EC curve name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// EC x coordinate, base64url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// EC y coordinate, base64url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// Symmetric key value, base64url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
    /// Unrecognized JWK members, preserved as-is
    #[serde(flatten)]
    pub additional: HashMap<String, serde_json::Value>,
}

/// Ordered key set as published by the provider. Order matters: the key
/// selector's fallback rules pick the first match.
pub type KeySet = Vec<Jwk>;

/// JWKS document shape; an absent `keys` member means an empty set.
#[derive(Debug, Deserialize)]
struct JwksDocument {
    #[serde(default)]
    keys: KeySet,
}

/// Fetches a key set from a JWKS URL.
///
/// The production implementation is [`HttpKeyFetcher`]; tests substitute a
/// fake to exercise cache behavior without a network.
#[async_trait]
pub trait KeyFetcher: Send + Sync + fmt::Debug {
    /// Fetch and parse the key set published at `jwks_url`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::KeyFetch`] on transport failure, a non-2xx
    /// response, or an unparseable body.
    async fn fetch_keys(&self, jwks_url: &str) -> VerifyResult<KeySet>;
}

/// HTTP key fetcher backed by `reqwest`.
///
/// Requests time out after 10 seconds so a stalled provider surfaces as a
/// [`VerifyError::KeyFetch`] instead of hanging the calling request.
#[derive(Debug, Clone)]
pub struct HttpKeyFetcher {
    client: reqwest::Client,
}

impl HttpKeyFetcher {
    /// Create a fetcher with the default request timeout.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    /// Reject endpoints that would expose tokens to interception. HTTPS is
    /// required everywhere except exact `localhost`/`127.0.0.1` hosts; the
    /// host is parsed rather than prefix-matched so `localhost.evil.com`
    /// does not slip through.
    fn check_endpoint(jwks_url: &str) -> VerifyResult<()> {
        let parsed = Url::parse(jwks_url).map_err(|e| VerifyError::KeyFetch {
            url: jwks_url.to_string(),
            status: None,
            message: format!("invalid JWKS URL: {e}"),
        })?;

        match parsed.scheme() {
            "https" => Ok(()),
            "http" => match parsed.host_str() {
                Some("localhost") | Some("127.0.0.1") => Ok(()),
                _ => Err(VerifyError::KeyFetch {
                    url: jwks_url.to_string(),
                    status: None,
                    message: "JWKS URL must use HTTPS (HTTP is allowed for localhost only)"
                        .to_string(),
                }),
            },
            scheme => Err(VerifyError::KeyFetch {
                url: jwks_url.to_string(),
                status: None,
                message: format!("unsupported URL scheme '{scheme}'"),
            }),
        }
    }
}

impl Default for HttpKeyFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
    async fn fetch_keys(&self, jwks_url: &str) -> VerifyResult<KeySet> {
        Self::check_endpoint(jwks_url)?;

        let response =
            self.client
                .get(jwks_url)
                .send()
                .await
                .map_err(|e| VerifyError::KeyFetch {
                    url: jwks_url.to_string(),
                    status: None,
                    message: e.to_string(),
                })?;

        let status = response.status();
        if !status.is_success() {
            warn!(jwks_url = %jwks_url, status = %status, "JWKS endpoint returned error status");
            return Err(VerifyError::KeyFetch {
                url: jwks_url.to_string(),
                status: Some(status.as_u16()),
                message: format!("JWKS endpoint returned status {status}"),
            });
        }

        let document: JwksDocument =
            response.json().await.map_err(|e| VerifyError::KeyFetch {
                url: jwks_url.to_string(),
                status: Some(status.as_u16()),
                message: format!("invalid JWKS body: {e}"),
            })?;

        Ok(document.keys)
    }
}

/// Normalize an identity provider base URL into its JWKS URL. Trailing
/// slashes are stripped so distinct spellings share one cache entry.
pub fn jwks_url(identity_provider_url: &str) -> String {
    format!(
        "{}{DISCOVERY_PATH}",
        identity_provider_url.trim_end_matches('/')
    )
}

/// Cached key set with its expiry instant
#[derive(Debug, Clone)]
struct CacheEntry {
    keys: KeySet,
    expires_at: SystemTime,
}

impl CacheEntry {
    fn is_fresh(&self, now: SystemTime) -> bool {
        now < self.expires_at
    }
}

/// Per-endpoint TTL cache over JWKS fetches.
///
/// The cache is an explicitly owned value, not a hidden global: construct
/// one, hand it to the engine, and share it across calls by cloning (clones
/// share state).
///
/// # Example
///
/// ```rust,no_run
/// # use tokengate::JwksCache;
/// # tokio_test::block_on(async {
/// let cache = JwksCache::new();
/// let keys = cache.get_keys("https://idp.example.com").await?;
/// # Ok::<(), tokengate::VerifyError>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct JwksCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    fetcher: Arc<dyn KeyFetcher>,
    ttl: Duration,
}

impl JwksCache {
    /// Create a cache with the default HTTP fetcher and TTL.
    pub fn new() -> Self {
        Self::with_fetcher(Arc::new(HttpKeyFetcher::new()), DEFAULT_CACHE_TTL)
    }

    /// Create a cache with the default HTTP fetcher and a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_fetcher(Arc::new(HttpKeyFetcher::new()), ttl)
    }

    /// Create a cache over a custom fetcher, e.g. a fake in tests.
    pub fn with_fetcher(fetcher: Arc<dyn KeyFetcher>, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            fetcher,
            ttl,
        }
    }

    /// Get the key set for an identity provider, fetching on cache miss.
    ///
    /// A live entry is returned without network access; a missing or
    /// expired entry triggers a fetch whose result replaces the entry
    /// wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::KeyFetch`] when the endpoint cannot be
    /// reached, answers non-2xx, or returns an unparseable body.
    pub async fn get_keys(&self, identity_provider_url: &str) -> VerifyResult<KeySet> {
        let url = jwks_url(identity_provider_url);

        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&url)
                && entry.is_fresh(SystemTime::now())
            {
                debug!(jwks_url = %url, key_count = entry.keys.len(), "serving keys from cache");
                return Ok(entry.keys.clone());
            }
        }

        self.fetch_and_store(url).await
    }

    /// Fetch the key set regardless of cache freshness, replacing the
    /// entry. Intended for key-rotation handling; routine lookups should
    /// use [`JwksCache::get_keys`].
    ///
    /// # Errors
    ///
    /// Same failure modes as [`JwksCache::get_keys`].
    pub async fn refresh(&self, identity_provider_url: &str) -> VerifyResult<KeySet> {
        self.fetch_and_store(jwks_url(identity_provider_url)).await
    }

    /// Drop every cached entry.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
        debug!("JWKS cache cleared");
    }

    async fn fetch_and_store(&self, url: String) -> VerifyResult<KeySet> {
        info!(jwks_url = %url, "fetching JWKS");
        let keys = self.fetcher.fetch_keys(&url).await?;
        info!(jwks_url = %url, key_count = keys.len(), "fetched JWKS");

        let entry = CacheEntry {
            keys: keys.clone(),
            expires_at: SystemTime::now() + self.ttl,
        };
        let mut entries = self.entries.write().await;
        entries.insert(url, entry);

        Ok(keys)
    }
}

impl Default for JwksCache {
    fn default() -> Self {
        Self::new()
    }
}
