//! Per-call verification configuration

use serde::{Deserialize, Serialize};

/// Configuration for a single verification call.
///
/// `identity_provider_url` and `audience` are required; everything else is
/// optional. Options are immutable once handed to the engine; construct a
/// fresh value per call site rather than mutating a shared one.
///
/// # Example
///
/// ```rust
/// use tokengate::VerifyOptions;
///
/// let options = VerifyOptions::new("https://idp.example.com", "my-api")
///     .required_scope("read:profile")
///     .allow_guest(true);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOptions {
    /// Base URL of the identity provider; the JWKS endpoint and expected
    /// issuer are both derived from it
    pub identity_provider_url: String,
    /// Expected `aud` claim
    pub audience: String,
    /// Cookie to read the token from, overriding the default name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_name: Option<String>,
    /// Scope the token's `scope` claim must contain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_scope: Option<String>,
    /// Substitute a guest identity instead of failing when no valid token
    /// is present
    #[serde(default)]
    pub allow_guest: bool,
}

impl VerifyOptions {
    /// Create options with the required fields set.
    pub fn new(identity_provider_url: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            identity_provider_url: identity_provider_url.into(),
            audience: audience.into(),
            cookie_name: None,
            required_scope: None,
            allow_guest: false,
        }
    }

    /// Read the token from this cookie instead of the default one.
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = Some(name.into());
        self
    }

    /// Require the token's `scope` claim to contain this scope.
    pub fn required_scope(mut self, scope: impl Into<String>) -> Self {
        self.required_scope = Some(scope.into());
        self
    }

    /// Fall back to a guest identity when no valid token is present.
    pub fn allow_guest(mut self, allow: bool) -> Self {
        self.allow_guest = allow;
        self
    }
}
