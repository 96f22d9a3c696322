//! # tokengate - Bearer Token Verification Engine
//!
//! Verifies JWTs issued by an OIDC-style identity provider and turns each
//! HTTP request into a single trust decision: authenticated, guest, or
//! rejected.
//!
//! ## Design Principles
//!
//! - **One result shape**: every call produces an [`AuthContext`] or one
//!   wrapped error, so adapters handle exactly one failure path
//! - **Explicit state**: the JWKS cache is an owned, injectable value, not
//!   a hidden global
//! - **Verify before trust**: claims are never read as authoritative until
//!   the signature holds
//!
//! ## Architecture
//!
//! - [`jwks`] - key fetching and the per-endpoint TTL cache
//! - [`token`] - compact JWT header decoding (unverified)
//! - [`select`] - deterministic key selection
//! - [`signature`] - cryptographic signature verification
//! - [`claims`] - claims schema and ordered validation
//! - [`engine`] - orchestration and the adapter boundary
//! - [`guest`] - guest pseudo-identity fallback
//! - [`config`] - per-call options
//! - [`error`] - the error taxonomy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tokengate::{RequestParts, Verifier, VerifyOptions};
//!
//! # tokio_test::block_on(async {
//! let verifier = Verifier::new();
//! let options = VerifyOptions::new("https://idp.example.com", "my-api")
//!     .required_scope("read:profile")
//!     .allow_guest(true);
//!
//! // Adapters map their request type onto a TokenSource; RequestParts is
//! // the framework-free implementation.
//! let request = RequestParts::new().with_header("authorization", "Bearer eyJ...");
//!
//! let auth = verifier.verify(&request, &options).await?;
//! match (auth.is_authenticated, auth.is_guest) {
//!     (true, _) => println!("user {}", auth.user_id.unwrap()),
//!     (_, true) => println!("guest {}", auth.guest_id.unwrap()),
//!     _ => println!("anonymous"),
//! }
//! # Ok::<(), tokengate::VerifyError>(())
//! # });
//! ```
//!
//! ## Token Sources
//!
//! The engine reads the token cookie (default `logto_authtoken`) first and
//! the `Authorization: Bearer` header second. With `allow_guest` enabled,
//! requests without a valid token resolve to a guest identity read from
//! the `guest_logto_authtoken` cookie or freshly generated; persisting that
//! id on the response is the adapter's responsibility.

pub mod claims;
pub mod config;
pub mod engine;
pub mod error;
pub mod guest;
pub mod jwks;
pub mod select;
pub mod signature;
pub mod token;

#[doc(inline)]
pub use claims::{Claims, expected_issuer, validate_claims, validate_claims_at};
#[doc(inline)]
pub use config::VerifyOptions;
#[doc(inline)]
pub use engine::{AuthContext, DEFAULT_TOKEN_COOKIE, RequestParts, TokenSource, Verifier};
#[doc(inline)]
pub use error::{VerifyError, VerifyResult};
#[doc(inline)]
pub use guest::{GUEST_COOKIE_MAX_AGE, GUEST_COOKIE_NAME, new_guest_id, resolve_guest_id};
#[doc(inline)]
pub use jwks::{
    DEFAULT_CACHE_TTL, DISCOVERY_PATH, HttpKeyFetcher, Jwk, JwksCache, KeyFetcher, KeySet,
    jwks_url,
};
#[doc(inline)]
pub use select::select_key;
#[doc(inline)]
pub use signature::{DEFAULT_ALGORITHM, verify_signature};
#[doc(inline)]
pub use token::{TokenHeader, decode_header};
