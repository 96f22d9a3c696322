//! Guest identity fallback
//!
//! Produces a pseudo-identity for requests that carry no valid token, so
//! callers handle anonymous traffic through the same `AuthContext` shape
//! as authenticated traffic. The engine only resolves or generates the id;
//! persisting it across requests (a response cookie) is the adapter's job.

use std::time::Duration;

use uuid::Uuid;

use crate::engine::TokenSource;

/// Cookie the guest identifier is read from
pub const GUEST_COOKIE_NAME: &str = "guest_logto_authtoken";

/// Lifetime adapters should give the guest cookie when persisting it
pub const GUEST_COOKIE_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Resolve the guest identifier for a request: the existing guest cookie
/// when present, otherwise a freshly generated id.
pub fn resolve_guest_id(source: &dyn TokenSource) -> String {
    match source.cookie(GUEST_COOKIE_NAME) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => new_guest_id(),
    }
}

/// Generate a new random guest identifier.
pub fn new_guest_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RequestParts;

    #[test]
    fn test_existing_guest_cookie_wins() {
        let source = RequestParts::new().with_cookie(GUEST_COOKIE_NAME, "guest-abc");
        assert_eq!(resolve_guest_id(&source), "guest-abc");
    }

    #[test]
    fn test_absent_cookie_generates_uuid() {
        let source = RequestParts::new();
        let id = resolve_guest_id(&source);
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_empty_cookie_generates_uuid() {
        let source = RequestParts::new().with_cookie(GUEST_COOKIE_NAME, "");
        let id = resolve_guest_id(&source);
        assert!(!id.is_empty());
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(new_guest_id(), new_guest_id());
    }

    #[test]
    fn test_cookie_max_age_is_seven_days() {
        assert_eq!(GUEST_COOKIE_MAX_AGE, Duration::from_secs(604_800));
    }
}
