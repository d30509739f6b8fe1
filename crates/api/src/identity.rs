//! Caller identity extraction.
//!
//! Credential issuance and verification live outside this core; by the
//! time a request reaches these handlers the gateway has resolved the
//! caller into plain headers.

use axum::http::HeaderMap;
use common::{OperatorId, UserId};

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// The authenticated customer, from `x-user-id`.
pub fn user_id(headers: &HeaderMap) -> Option<UserId> {
    header_i64(headers, "x-user-id").map(UserId::new)
}

/// The authenticated back-office operator, from `x-operator-id`.
pub fn operator_id(headers: &HeaderMap) -> Option<OperatorId> {
    header_i64(headers, "x-operator-id").map(OperatorId::new)
}

/// True when the gateway marked the caller as an administrator.
pub fn is_admin(headers: &HeaderMap) -> bool {
    headers
        .get("x-role")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|role| role.eq_ignore_ascii_case("admin"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_parses() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", "42".parse().unwrap());
        assert_eq!(user_id(&headers), Some(UserId::new(42)));
    }

    #[test]
    fn test_missing_or_garbled_headers() {
        let headers = HeaderMap::new();
        assert_eq!(user_id(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", "forty-two".parse().unwrap());
        assert_eq!(user_id(&headers), None);
    }

    #[test]
    fn test_admin_role() {
        let mut headers = HeaderMap::new();
        headers.insert("x-role", "Admin".parse().unwrap());
        assert!(is_admin(&headers));

        let mut headers = HeaderMap::new();
        headers.insert("x-role", "seller".parse().unwrap());
        assert!(!is_admin(&headers));
    }
}
