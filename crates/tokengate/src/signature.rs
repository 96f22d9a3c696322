//! Cryptographic signature verification
//!
//! Imports the selected JWK into a decoding key for the indicated
//! algorithm family and verifies the token's signature over its
//! header+payload. Claims come back only on success; every timestamp,
//! issuer, audience, and scope check is deferred to the claims validator
//! so failures report in a fixed order.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, TokenData, Validation, decode};
use tracing::debug;

use crate::claims::Claims;
use crate::error::{VerifyError, VerifyResult};
use crate::jwks::Jwk;

/// Algorithm assumed when neither the token header nor the key names one
pub const DEFAULT_ALGORITHM: &str = "RS256";

/// Algorithms this crate verifies. The `none` pseudo-algorithm and
/// anything outside this list is rejected before any cryptography runs.
const ALLOWED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::ES256,
    Algorithm::ES384,
    Algorithm::HS256,
    Algorithm::HS384,
    Algorithm::HS512,
];

/// Verify `token`'s signature against `key` and return its claims.
///
/// `alg_hint` is the algorithm named by the token header; when absent the
/// [`DEFAULT_ALGORITHM`] family is assumed.
///
/// # Errors
///
/// Returns [`VerifyError::SignatureVerification`] on signature mismatch,
/// an unsupported or unparseable algorithm, or key material that does not
/// fit the algorithm family.
pub fn verify_signature(token: &str, key: &Jwk, alg_hint: Option<&str>) -> VerifyResult<Claims> {
    let alg_name = alg_hint.unwrap_or(DEFAULT_ALGORITHM);
    let alg: Algorithm = alg_name.parse().map_err(|_| {
        VerifyError::SignatureVerification(format!("unsupported algorithm '{alg_name}'"))
    })?;
    if !ALLOWED_ALGORITHMS.contains(&alg) {
        return Err(VerifyError::SignatureVerification(format!(
            "algorithm '{alg_name}' is not allowed"
        )));
    }

    let decoding_key = decoding_key(key, alg)?;

    let mut validation = Validation::new(alg);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims::<&str>(&[]);

    let data: TokenData<Claims> = decode(token, &decoding_key, &validation)
        .map_err(|e| VerifyError::SignatureVerification(e.to_string()))?;

    debug!(alg = %alg_name, "signature verified");
    Ok(data.claims)
}

/// Import a JWK as a decoding key for the given algorithm family.
fn decoding_key(key: &Jwk, alg: Algorithm) -> VerifyResult<DecodingKey> {
    match alg {
        Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => {
            let (n, e) = match (key.n.as_deref(), key.e.as_deref()) {
                (Some(n), Some(e)) => (n, e),
                _ => {
                    return Err(VerifyError::SignatureVerification(
                        "RSA key is missing modulus or exponent".to_string(),
                    ));
                }
            };
            DecodingKey::from_rsa_components(n, e)
                .map_err(|e| VerifyError::SignatureVerification(format!("invalid RSA key: {e}")))
        }
        Algorithm::ES256 | Algorithm::ES384 => {
            let (x, y) = match (key.x.as_deref(), key.y.as_deref()) {
                (Some(x), Some(y)) => (x, y),
                _ => {
                    return Err(VerifyError::SignatureVerification(
                        "EC key is missing a curve coordinate".to_string(),
                    ));
                }
            };
            DecodingKey::from_ec_components(x, y)
                .map_err(|e| VerifyError::SignatureVerification(format!("invalid EC key: {e}")))
        }
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            let k = key.k.as_deref().ok_or_else(|| {
                VerifyError::SignatureVerification("oct key is missing its value".to_string())
            })?;
            let secret = URL_SAFE_NO_PAD.decode(k.trim_end_matches('=')).map_err(|e| {
                VerifyError::SignatureVerification(format!("invalid oct key encoding: {e}"))
            })?;
            Ok(DecodingKey::from_secret(&secret))
        }
        other => Err(VerifyError::SignatureVerification(format!(
            "algorithm '{other:?}' is not allowed"
        ))),
    }
}
