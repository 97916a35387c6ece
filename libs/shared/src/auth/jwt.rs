//! Unverified reads of JWT claims.
//!
//! The CLI never validates signatures; the API does that. The payload is only
//! inspected for the account email and the expiry.

use super::error::{AuthError, AuthResult};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TokenClaims {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
}

pub fn decode_claims(token: &str) -> AuthResult<TokenClaims> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(AuthError::storage("token is not a JWT")),
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::storage(format!("decode token payload: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::storage(format!("parse token claims: {e}")))
}

/// The `email` claim, if the token carries one.
pub fn email_from_token(token: &str) -> Option<String> {
    decode_claims(token).ok().and_then(|claims| claims.email)
}

#[cfg(test)]
pub(crate) fn fake_token(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_claims() {
        let token = fake_token(serde_json::json!({"email": "jane@example.com", "exp": 1700000000}));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.email.as_deref(), Some("jane@example.com"));
        assert_eq!(claims.exp, Some(1_700_000_000));
        assert_eq!(email_from_token(&token).as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn test_opaque_token_has_no_claims() {
        assert!(decode_claims("opaque-token").is_err());
        assert_eq!(email_from_token("a.b"), None);
    }
}
