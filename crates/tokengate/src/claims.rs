//! JWT claims schema and validation
//!
//! Claims are validated only after signature verification, in a fixed
//! order so a token failing several checks always reports the same error:
//! issuer, audience, expiration, not-before, scope.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::VerifyOptions;
use crate::error::{VerifyError, VerifyResult};

/// Decoded token payload.
///
/// The registered claims this crate reads are typed; custom claims the
/// issuer adds are preserved in `additional` so callers can still reach
/// them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the authenticated user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Audience
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Expiration time, seconds since epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    /// Not-before time, seconds since epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
    /// Space-delimited granted scopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Claims outside the set above, preserved as-is
    #[serde(flatten)]
    pub additional: HashMap<String, serde_json::Value>,
}

/// Derive the expected `iss` value from the identity provider base URL.
/// Join semantics, not concatenation: exactly one slash lands between the
/// base URL and the `oidc` path segment.
pub fn expected_issuer(identity_provider_url: &str) -> String {
    format!("{}/oidc", identity_provider_url.trim_end_matches('/'))
}

/// Validate claims against the call options using the system clock.
///
/// # Errors
///
/// The first violated check wins: [`VerifyError::InvalidIssuer`],
/// [`VerifyError::InvalidAudience`], [`VerifyError::TokenExpired`],
/// [`VerifyError::TokenNotYetValid`], then [`VerifyError::MissingScope`].
pub fn validate_claims(claims: &Claims, options: &VerifyOptions) -> VerifyResult<()> {
    validate_claims_at(claims, options, unix_now())
}

/// Validate claims against an explicit clock reading, for deterministic
/// tests.
///
/// # Errors
///
/// Same as [`validate_claims`].
pub fn validate_claims_at(claims: &Claims, options: &VerifyOptions, now: u64) -> VerifyResult<()> {
    let expected = expected_issuer(&options.identity_provider_url);
    if claims.iss.as_deref() != Some(expected.as_str()) {
        return Err(VerifyError::InvalidIssuer {
            expected,
            actual: claims.iss.clone().unwrap_or_default(),
        });
    }

    if claims.aud.as_deref() != Some(options.audience.as_str()) {
        return Err(VerifyError::InvalidAudience {
            expected: options.audience.clone(),
            actual: claims.aud.clone().unwrap_or_default(),
        });
    }

    if let Some(exp) = claims.exp
        && exp < now
    {
        return Err(VerifyError::TokenExpired { exp, now });
    }

    if let Some(nbf) = claims.nbf
        && nbf > now
    {
        return Err(VerifyError::TokenNotYetValid { nbf, now });
    }

    if let Some(required) = options.required_scope.as_deref() {
        // Substring containment, not token-wise matching; see DESIGN.md
        let granted = claims.scope.as_deref().unwrap_or_default();
        if !granted.contains(required) {
            return Err(VerifyError::MissingScope(required.to_string()));
        }
    }

    Ok(())
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn options() -> VerifyOptions {
        VerifyOptions::new("https://idp.example.com", "my-api")
    }

    fn valid_claims() -> Claims {
        Claims {
            sub: Some("user-1".to_string()),
            iss: Some("https://idp.example.com/oidc".to_string()),
            aud: Some("my-api".to_string()),
            exp: Some(NOW + 3600),
            nbf: Some(NOW - 60),
            scope: Some("openid read:profile".to_string()),
            ..Claims::default()
        }
    }

    #[test]
    fn test_expected_issuer_joins_with_one_slash() {
        assert_eq!(
            expected_issuer("https://idp.example.com"),
            "https://idp.example.com/oidc"
        );
        assert_eq!(
            expected_issuer("https://idp.example.com/"),
            "https://idp.example.com/oidc"
        );
    }

    #[test]
    fn test_valid_claims_pass() {
        validate_claims_at(&valid_claims(), &options(), NOW).unwrap();
    }

    #[test]
    fn test_absent_exp_and_nbf_pass() {
        let claims = Claims {
            exp: None,
            nbf: None,
            ..valid_claims()
        };
        validate_claims_at(&claims, &options(), NOW).unwrap();
    }

    #[test]
    fn test_issuer_mismatch() {
        let claims = Claims {
            iss: Some("https://other.example.com/oidc".to_string()),
            ..valid_claims()
        };
        let err = validate_claims_at(&claims, &options(), NOW).unwrap_err();
        match err {
            VerifyError::InvalidIssuer { expected, actual } => {
                assert_eq!(expected, "https://idp.example.com/oidc");
                assert_eq!(actual, "https://other.example.com/oidc");
            }
            other => panic!("expected InvalidIssuer, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_issuer_reports_mismatch() {
        let claims = Claims {
            iss: None,
            ..valid_claims()
        };
        let err = validate_claims_at(&claims, &options(), NOW).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidIssuer { .. }));
    }

    #[test]
    fn test_audience_mismatch() {
        let claims = Claims {
            aud: Some("other-api".to_string()),
            ..valid_claims()
        };
        let err = validate_claims_at(&claims, &options(), NOW).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidAudience { .. }));
    }

    #[test]
    fn test_expired_token() {
        let claims = Claims {
            exp: Some(NOW - 1),
            ..valid_claims()
        };
        let err = validate_claims_at(&claims, &options(), NOW).unwrap_err();
        assert!(matches!(err, VerifyError::TokenExpired { exp, .. } if exp == NOW - 1));
    }

    #[test]
    fn test_exp_equal_to_now_passes() {
        let claims = Claims {
            exp: Some(NOW),
            ..valid_claims()
        };
        validate_claims_at(&claims, &options(), NOW).unwrap();
    }

    #[test]
    fn test_not_yet_valid_token() {
        let claims = Claims {
            nbf: Some(NOW + 30),
            ..valid_claims()
        };
        let err = validate_claims_at(&claims, &options(), NOW).unwrap_err();
        assert!(matches!(err, VerifyError::TokenNotYetValid { nbf, .. } if nbf == NOW + 30));
    }

    #[test]
    fn test_scope_containment() {
        let opts = options().required_scope("read:profile");
        validate_claims_at(&valid_claims(), &opts, NOW).unwrap();
    }

    #[test]
    fn test_missing_scope() {
        let opts = options().required_scope("admin:access");
        let err = validate_claims_at(&valid_claims(), &opts, NOW).unwrap_err();
        match err {
            VerifyError::MissingScope(scope) => assert_eq!(scope, "admin:access"),
            other => panic!("expected MissingScope, got {other:?}"),
        }
    }

    #[test]
    fn test_scope_match_is_substring_containment() {
        let claims = Claims {
            scope: Some("read:all".to_string()),
            ..valid_claims()
        };
        let opts = options().required_scope("read");
        validate_claims_at(&claims, &opts, NOW).unwrap();
    }

    #[test]
    fn test_required_scope_with_no_scope_claim() {
        let claims = Claims {
            scope: None,
            ..valid_claims()
        };
        let opts = options().required_scope("read:profile");
        let err = validate_claims_at(&claims, &opts, NOW).unwrap_err();
        assert!(matches!(err, VerifyError::MissingScope(_)));
    }

    #[test]
    fn test_issuer_checked_before_expiry() {
        // Ordering: a token that is both foreign and expired reports the issuer
        let claims = Claims {
            iss: Some("https://other.example.com/oidc".to_string()),
            exp: Some(NOW - 100),
            ..valid_claims()
        };
        let err = validate_claims_at(&claims, &options(), NOW).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidIssuer { .. }));
    }

    #[test]
    fn test_custom_claims_preserved() {
        let claims: Claims = serde_json::from_str(
            r#"{"sub":"u1","iss":"i","aud":"a","org_id":"org-7","plan":"pro"}"#,
        )
        .unwrap();
        assert_eq!(
            claims.additional.get("org_id"),
            Some(&serde_json::json!("org-7"))
        );
        assert_eq!(claims.additional.get("plan"), Some(&serde_json::json!("pro")));
    }
}
