//! HS256 JSON Web Tokens for the chat service.
//!
//! The chat service accepts two kinds of token, both signed with the app
//! secret: a server token (`{"server": true}`) authorizing the backend's own
//! calls, and per-user session tokens (`{"user_id": ...}`) that the views use
//! to connect.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;

use crate::error::{Error, Result};

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

pub fn sign(secret: &str, claims: &Value) -> Result<String> {
    let header = URL_SAFE_NO_PAD.encode(HEADER.as_bytes());
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let signing_input = format!("{header}.{payload}");

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Config(format!("invalid signing secret: {e}")))?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

pub fn server_token(secret: &str) -> Result<String> {
    sign(secret, &json!({ "server": true }))
}

pub fn user_token(secret: &str, user_id: &str, ttl_seconds: Option<i64>) -> Result<String> {
    let mut claims = json!({ "user_id": user_id });
    if let Some(ttl) = ttl_seconds {
        claims["exp"] = json!(Utc::now().timestamp().saturating_add(ttl.max(1)));
    }
    sign(secret, &claims)
}

/// Check the signature and return the claims.
pub fn verify(secret: &str, token: &str) -> Option<Value> {
    let mut parts = token.split('.');
    let (header, payload, signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let signature_bytes = URL_SAFE_NO_PAD.decode(signature).ok()?;
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(format!("{header}.{payload}").as_bytes());
    mac.verify_slice(&signature_bytes).ok()?;

    let claims = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&claims).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_token_carries_user_id_and_verifies() {
        let token = user_token("secret", "ana", None).expect("sign");
        assert_eq!(token.split('.').count(), 3);

        let claims = verify("secret", &token).expect("valid signature");
        assert_eq!(claims, json!({ "user_id": "ana" }));
    }

    #[test]
    fn user_token_with_ttl_sets_future_expiry() {
        let token = user_token("secret", "ana", Some(3600)).expect("sign");
        let claims = verify("secret", &token).expect("valid signature");
        let exp = claims["exp"].as_i64().expect("exp claim");
        assert!(exp > Utc::now().timestamp());
    }

    #[test]
    fn huge_ttl_saturates_expiry() {
        let token = user_token("secret", "ana", Some(i64::MAX)).expect("token");
        let claims = verify("secret", &token).expect("verifies");
        assert_eq!(claims["exp"], json!(i64::MAX));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let token = server_token("secret").expect("sign");
        assert!(verify("other", &token).is_none());
        assert_eq!(
            verify("secret", &token).expect("valid"),
            json!({ "server": true })
        );
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let token = user_token("secret", "ana", None).expect("sign");
        let mut parts = token.split('.').map(str::to_string).collect::<Vec<_>>();
        parts[1] = URL_SAFE_NO_PAD.encode(br#"{"user_id":"sales-admin"}"#);
        assert!(verify("secret", &parts.join(".")).is_none());
    }
}
