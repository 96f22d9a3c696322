//! Verification engine
//!
//! Orchestrates the pipeline every adapter calls: resolve a token from the
//! request, fetch keys, select one, verify the signature, validate claims,
//! and produce a single [`AuthContext`]. Each call terminates in exactly
//! one of three outcomes: an authenticated context, a guest context, or an
//! error.
//!
//! The engine owns an explicit [`JwksCache`] instance rather than reaching
//! for global state; share one engine (or one cache) across requests to
//! keep the fetch-once-per-TTL behavior.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::claims::{Claims, validate_claims};
use crate::config::VerifyOptions;
use crate::error::{VerifyError, VerifyResult};
use crate::guest;
use crate::jwks::JwksCache;
use crate::select::select_key;
use crate::signature::verify_signature;
use crate::token::decode_header;

/// Cookie the bearer token is read from unless the caller overrides it
pub const DEFAULT_TOKEN_COOKIE: &str = "logto_authtoken";

/// Adapter boundary: anything that can surface cookies and headers.
///
/// Framework adapters implement this over their request type; cookie
/// parsing stays on the adapter side. [`RequestParts`] is a ready-made
/// implementation for adapters without framework types.
pub trait TokenSource {
    /// Value of the cookie with this name, if present.
    fn cookie(&self, name: &str) -> Option<&str>;
    /// Value of the header with this name (case-insensitive), if present.
    fn header(&self, name: &str) -> Option<&str>;
}

/// Map-backed [`TokenSource`] for adapters without framework types.
#[derive(Debug, Clone, Default)]
pub struct RequestParts {
    cookies: HashMap<String, String>,
    headers: HashMap<String, String>,
}

impl RequestParts {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Add a header. Names are matched case-insensitively.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }
}

impl TokenSource for RequestParts {
    fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Result of a verification call.
///
/// Exactly one shape holds per value: authenticated (`is_authenticated`
/// with `user_id` and `claims` set), guest (`is_guest` with a `guest_id`),
/// or plain unauthenticated. Values are created fresh per call and never
/// mutated; persistence (e.g. a cookie) is the caller's decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Verified subject of the token, when authenticated
    pub user_id: Option<String>,
    /// Whether the token passed full verification
    pub is_authenticated: bool,
    /// Verified claims, when authenticated
    pub claims: Option<Claims>,
    /// Whether this context carries a guest pseudo-identity
    pub is_guest: bool,
    /// Guest identifier, when `is_guest`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_id: Option<String>,
}

impl AuthContext {
    fn authenticated(user_id: String, claims: Claims) -> Self {
        Self {
            user_id: Some(user_id),
            is_authenticated: true,
            claims: Some(claims),
            is_guest: false,
            guest_id: None,
        }
    }

    /// Guest context carrying a pseudo-identity.
    pub fn guest(guest_id: String) -> Self {
        Self {
            user_id: None,
            is_authenticated: false,
            claims: None,
            is_guest: true,
            guest_id: Some(guest_id),
        }
    }

    /// Unauthenticated context without a guest identity, for adapters that
    /// need the neutral shape.
    pub fn unauthenticated() -> Self {
        Self {
            user_id: None,
            is_authenticated: false,
            claims: None,
            is_guest: false,
            guest_id: None,
        }
    }
}

/// The verification engine.
///
/// # Example
///
/// ```rust,no_run
/// # use tokengate::{RequestParts, Verifier, VerifyOptions};
/// # tokio_test::block_on(async {
/// let verifier = Verifier::new();
/// let options = VerifyOptions::new("https://idp.example.com", "my-api");
/// let request = RequestParts::new().with_header("authorization", "Bearer eyJ...");
///
/// let auth = verifier.verify(&request, &options).await?;
/// if auth.is_authenticated {
///     println!("hello {}", auth.user_id.unwrap());
/// }
/// # Ok::<(), tokengate::VerifyError>(())
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    jwks: JwksCache,
}

impl Verifier {
    /// Create an engine with its own JWKS cache.
    pub fn new() -> Self {
        Self {
            jwks: JwksCache::new(),
        }
    }

    /// Create an engine over an existing cache, e.g. one shared between
    /// engines or one built with a fake fetcher in tests.
    pub fn with_cache(jwks: JwksCache) -> Self {
        Self { jwks }
    }

    /// The engine's key cache.
    pub fn cache(&self) -> &JwksCache {
        &self.jwks
    }

    /// Verify the token carried by a request.
    ///
    /// The token is read from the configured cookie first, then from the
    /// `Authorization: Bearer` header. With `allow_guest` set, a missing
    /// token and a failed verification both yield a guest context whose id
    /// comes from the request's guest cookie (or is freshly generated).
    ///
    /// # Errors
    ///
    /// Without `allow_guest`: [`VerifyError::NoTokenFound`] when the
    /// request carries no token, otherwise [`VerifyError::Verification`]
    /// wrapping the stage failure.
    pub async fn verify(
        &self,
        source: &dyn TokenSource,
        options: &VerifyOptions,
    ) -> VerifyResult<AuthContext> {
        let token = extract_token(source, options);

        let Some(token) = token else {
            if options.allow_guest {
                let guest_id = guest::resolve_guest_id(source);
                debug!(guest_id = %guest_id, "no token present, continuing as guest");
                return Ok(AuthContext::guest(guest_id));
            }
            return Err(VerifyError::NoTokenFound);
        };

        match self.verify_token_inner(&token, options).await {
            Ok(auth) => Ok(auth),
            Err(err) if options.allow_guest => {
                let guest_id = guest::resolve_guest_id(source);
                warn!(error = %err, guest_id = %guest_id, "verification failed, continuing as guest");
                Ok(AuthContext::guest(guest_id))
            }
            Err(err) => Err(err.wrapped()),
        }
    }

    /// Verify a bare token string.
    ///
    /// With `allow_guest` set, a failure yields a guest context with a
    /// freshly generated id (there is no request to read a guest cookie
    /// from).
    ///
    /// # Errors
    ///
    /// Without `allow_guest`: [`VerifyError::Verification`] wrapping the
    /// stage failure.
    pub async fn verify_token(
        &self,
        token: &str,
        options: &VerifyOptions,
    ) -> VerifyResult<AuthContext> {
        match self.verify_token_inner(token, options).await {
            Ok(auth) => Ok(auth),
            Err(err) if options.allow_guest => {
                let guest_id = guest::new_guest_id();
                warn!(error = %err, guest_id = %guest_id, "verification failed, continuing as guest");
                Ok(AuthContext::guest(guest_id))
            }
            Err(err) => Err(err.wrapped()),
        }
    }

    async fn verify_token_inner(
        &self,
        token: &str,
        options: &VerifyOptions,
    ) -> VerifyResult<AuthContext> {
        let header = decode_header(token)?;
        let keys = self.jwks.get_keys(&options.identity_provider_url).await?;
        let key = select_key(&keys, &header)?;
        let claims = verify_signature(token, key, header.alg.as_deref())?;
        validate_claims(&claims, options)?;

        // The authenticated shape requires a subject
        let user_id = claims
            .sub
            .clone()
            .ok_or_else(|| VerifyError::MalformedToken("missing sub claim".to_string()))?;

        debug!(user_id = %user_id, "token verified");
        Ok(AuthContext::authenticated(user_id, claims))
    }
}

/// Resolve the candidate token: configured cookie first, bearer header
/// second. Empty values count as absent.
fn extract_token(source: &dyn TokenSource, options: &VerifyOptions) -> Option<String> {
    let cookie_name = options.cookie_name.as_deref().unwrap_or(DEFAULT_TOKEN_COOKIE);
    if let Some(token) = source.cookie(cookie_name).filter(|t| !t.is_empty()) {
        return Some(token.to_string());
    }

    source
        .header("authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
