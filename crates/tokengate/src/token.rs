//! Compact JWT decoding without verification
//!
//! Splits a compact token into its dot-separated segments and decodes the
//! header so the key selector can see `kid` and `alg`. Nothing here is
//! trusted; claims become authoritative only after signature verification.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::{VerifyError, VerifyResult};

/// Decoded-but-unverified JWT header fields used for key selection.
///
/// Both fields are optional: some issuers omit `kid` on single-key sets,
/// and the selector has fallback rules when `alg` is absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct TokenHeader {
    /// Key id naming the JWKS entry that signed this token
    #[serde(default)]
    pub kid: Option<String>,
    /// Signing algorithm, e.g. `RS256`
    #[serde(default)]
    pub alg: Option<String>,
}

/// Decode the header segment of a compact JWT.
///
/// # Errors
///
/// Returns [`VerifyError::MalformedToken`] when the token has no
/// dot-separated first segment, the segment is not valid base64url, or the
/// decoded bytes are not a JSON object.
pub fn decode_header(token: &str) -> VerifyResult<TokenHeader> {
    let segment = token
        .split('.')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| VerifyError::MalformedToken("missing header segment".to_string()))?;

    let bytes = decode_segment(segment)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| VerifyError::MalformedToken(format!("invalid header JSON: {e}")))
}

/// Base64url-decode one token segment, tolerating `=` padding that some
/// issuers append.
fn decode_segment(segment: &str) -> VerifyResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| VerifyError::MalformedToken(format!("invalid base64url segment: {e}")))
}
