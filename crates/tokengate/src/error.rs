//! Error types for token verification

use thiserror::Error;

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerifyError>;

/// Error kinds produced by the verification pipeline.
///
/// Every stage reports its own kind; the engine boundary wraps stage
/// failures in [`VerifyError::Verification`] so adapters only need to
/// handle one failure shape (plus [`VerifyError::NoTokenFound`], which is
/// raised before any verification begins).
#[derive(Error, Debug, Clone)]
pub enum VerifyError {
    /// Token is not a decodable compact JWT
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// JWKS endpoint request failed or returned a non-2xx response
    #[error("failed to fetch keys from {url}: {message}")]
    KeyFetch {
        /// JWKS URL the fetch targeted
        url: String,
        /// HTTP status, when a response was received
        status: Option<u16>,
        /// Transport or parse failure detail
        message: String,
    },

    /// The fetched key set contains no keys
    #[error("key set is empty")]
    EmptyKeySet,

    /// Token header named a `kid` that is absent from the key set
    #[error("no key found for kid '{0}'")]
    KeyNotFound(String),

    /// Cryptographic signature check failed
    #[error("signature verification failed: {0}")]
    SignatureVerification(String),

    /// `iss` claim does not match the expected issuer
    #[error("invalid issuer: expected '{expected}', got '{actual}'")]
    InvalidIssuer {
        /// Issuer derived from the configured identity provider URL
        expected: String,
        /// Issuer carried by the token (empty when absent)
        actual: String,
    },

    /// `aud` claim does not match the expected audience
    #[error("invalid audience: expected '{expected}', got '{actual}'")]
    InvalidAudience {
        /// Audience the caller configured
        expected: String,
        /// Audience carried by the token (empty when absent)
        actual: String,
    },

    /// `exp` claim lies in the past
    #[error("token expired at {exp} (now {now})")]
    TokenExpired {
        /// Expiry timestamp, seconds since epoch
        exp: u64,
        /// Clock reading used for the comparison
        now: u64,
    },

    /// `nbf` claim lies in the future
    #[error("token not valid before {nbf} (now {now})")]
    TokenNotYetValid {
        /// Not-before timestamp, seconds since epoch
        nbf: u64,
        /// Clock reading used for the comparison
        now: u64,
    },

    /// `scope` claim does not contain a required scope
    #[error("required scope '{0}' is missing")]
    MissingScope(String),

    /// Neither the token cookie nor the Authorization header carried a token
    #[error("no token found in cookie or Authorization header")]
    NoTokenFound,

    /// Wrapper emitted at the engine boundary, carrying the originating cause
    #[error("token verification failed: {source}")]
    Verification {
        /// The stage failure that caused the rejection
        #[source]
        source: Box<VerifyError>,
    },
}

impl VerifyError {
    /// Stable machine-readable code, suitable for 401 response bodies.
    pub fn category(&self) -> &'static str {
        match self {
            VerifyError::MalformedToken(_) => "malformed_token",
            VerifyError::KeyFetch { .. } => "key_fetch",
            VerifyError::EmptyKeySet => "empty_key_set",
            VerifyError::KeyNotFound(_) => "key_not_found",
            VerifyError::SignatureVerification(_) => "signature_verification",
            VerifyError::InvalidIssuer { .. } => "invalid_issuer",
            VerifyError::InvalidAudience { .. } => "invalid_audience",
            VerifyError::TokenExpired { .. } => "token_expired",
            VerifyError::TokenNotYetValid { .. } => "token_not_yet_valid",
            VerifyError::MissingScope(_) => "missing_scope",
            VerifyError::NoTokenFound => "no_token_found",
            VerifyError::Verification { .. } => "verification_failed",
        }
    }

    /// Wrap this error for the engine boundary. Already-wrapped errors are
    /// returned unchanged so causes never nest twice.
    pub fn wrapped(self) -> Self {
        match self {
            VerifyError::Verification { .. } => self,
            other => VerifyError::Verification {
                source: Box::new(other),
            },
        }
    }

    /// The underlying stage failure, unwrapping [`VerifyError::Verification`].
    pub fn cause(&self) -> &VerifyError {
        match self {
            VerifyError::Verification { source } => source,
            other => other,
        }
    }
}
