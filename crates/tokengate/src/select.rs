//! Deterministic key selection
//!
//! Picks the verification key for a token out of a fetched key set. The
//! tie-break order is total, so a fixed set and header always yield the
//! same key:
//!
//! 1. header `kid` present: exact `kid` match, no fallback
//! 2. header `alg` present: first key with an equal `alg`
//! 3. first RSA key usable for signatures (`use` is `sig` or absent)
//! 4. the first key in the set
//!
//! A stated `kid` that resolves to nothing is an error rather than a
//! fallback; substituting a different key would let an attacker-influenced
//! header pick the default.

use tracing::debug;

use crate::error::{VerifyError, VerifyResult};
use crate::jwks::Jwk;
use crate::token::TokenHeader;

/// Select the verification key for `header` out of `keys`.
///
/// # Errors
///
/// - [`VerifyError::EmptyKeySet`] when `keys` is empty, before any matching
/// - [`VerifyError::KeyNotFound`] when `header.kid` is set and no key
///   carries that id
pub fn select_key<'a>(keys: &'a [Jwk], header: &TokenHeader) -> VerifyResult<&'a Jwk> {
    if keys.is_empty() {
        return Err(VerifyError::EmptyKeySet);
    }

    if let Some(kid) = header.kid.as_deref() {
        return keys
            .iter()
            .find(|key| key.kid.as_deref() == Some(kid))
            .ok_or_else(|| VerifyError::KeyNotFound(kid.to_string()));
    }

    if let Some(alg) = header.alg.as_deref()
        && let Some(key) = keys.iter().find(|key| key.alg.as_deref() == Some(alg))
    {
        return Ok(key);
    }

    if let Some(key) = keys
        .iter()
        .find(|key| key.kty == "RSA" && matches!(key.key_use.as_deref(), None | Some("sig")))
    {
        return Ok(key);
    }

    debug!("no kid, alg, or RSA signature key matched; using first key");
    keys.first().ok_or(VerifyError::EmptyKeySet)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(kid: Option<&str>, alg: Option<&str>, kty: &str, key_use: Option<&str>) -> Jwk {
        Jwk {
            kid: kid.map(str::to_string),
            alg: alg.map(str::to_string),
            kty: kty.to_string(),
            key_use: key_use.map(str::to_string),
            ..Jwk::default()
        }
    }

    fn header(kid: Option<&str>, alg: Option<&str>) -> TokenHeader {
        TokenHeader {
            kid: kid.map(str::to_string),
            alg: alg.map(str::to_string),
        }
    }

    #[test]
    fn test_empty_set_fails_before_matching() {
        let err = select_key(&[], &header(Some("k1"), None)).unwrap_err();
        assert!(matches!(err, VerifyError::EmptyKeySet));
    }

    #[test]
    fn test_kid_exact_match() {
        let keys = vec![
            key(Some("k1"), Some("RS256"), "RSA", Some("sig")),
            key(Some("k2"), Some("RS256"), "RSA", Some("sig")),
        ];
        let selected = select_key(&keys, &header(Some("k2"), None)).unwrap();
        assert_eq!(selected.kid.as_deref(), Some("k2"));
    }

    #[test]
    fn test_stated_kid_never_falls_back() {
        let keys = vec![key(Some("k1"), Some("RS256"), "RSA", Some("sig"))];
        let err = select_key(&keys, &header(Some("absent"), Some("RS256"))).unwrap_err();
        match err {
            VerifyError::KeyNotFound(kid) => assert_eq!(kid, "absent"),
            other => panic!("expected KeyNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_alg_match_when_kid_absent() {
        let keys = vec![
            key(Some("k1"), Some("RS256"), "RSA", Some("sig")),
            key(Some("k2"), Some("ES256"), "EC", Some("sig")),
        ];
        let selected = select_key(&keys, &header(None, Some("ES256"))).unwrap();
        assert_eq!(selected.kid.as_deref(), Some("k2"));
    }

    #[test]
    fn test_alg_miss_falls_through_to_rsa_rule() {
        let keys = vec![
            key(Some("k1"), Some("ES256"), "EC", Some("sig")),
            key(Some("k2"), None, "RSA", None),
        ];
        let selected = select_key(&keys, &header(None, Some("RS512"))).unwrap();
        assert_eq!(selected.kid.as_deref(), Some("k2"));
    }

    #[test]
    fn test_rsa_sig_preference_without_header_hints() {
        let keys = vec![
            key(Some("enc"), None, "RSA", Some("enc")),
            key(Some("ec"), None, "EC", Some("sig")),
            key(Some("rsa-sig"), None, "RSA", Some("sig")),
        ];
        let selected = select_key(&keys, &header(None, None)).unwrap();
        assert_eq!(selected.kid.as_deref(), Some("rsa-sig"));
    }

    #[test]
    fn test_rsa_with_absent_use_is_acceptable() {
        let keys = vec![
            key(Some("ec"), None, "EC", Some("sig")),
            key(Some("rsa"), None, "RSA", None),
        ];
        let selected = select_key(&keys, &header(None, None)).unwrap();
        assert_eq!(selected.kid.as_deref(), Some("rsa"));
    }

    #[test]
    fn test_first_key_as_last_resort() {
        let keys = vec![
            key(Some("ec1"), None, "EC", Some("sig")),
            key(Some("ec2"), None, "EC", Some("sig")),
        ];
        let selected = select_key(&keys, &header(None, None)).unwrap();
        assert_eq!(selected.kid.as_deref(), Some("ec1"));
    }

    #[test]
    fn test_selection_is_deterministic() {
        let keys = vec![
            key(Some("k1"), Some("RS256"), "RSA", Some("sig")),
            key(Some("k2"), Some("RS256"), "RSA", Some("sig")),
        ];
        let h = header(None, Some("RS256"));
        let first = select_key(&keys, &h).unwrap();
        for _ in 0..10 {
            assert_eq!(select_key(&keys, &h).unwrap(), first);
        }
    }
}
