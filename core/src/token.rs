//! Compact JWT signing with HMAC-SHA512.
//!
//! # Design
//! Tokens are `base64url(header).base64url(claims).base64url(signature)` with
//! the fixed header `{"typ":"JWT","alg":"HS512"}`. The same codec signs the
//! login handshake (keyed by the account secret) and invoice or secureform
//! payloads (keyed by the API key). Encoding is deterministic for identical
//! claims and secret, and the codec keeps no state.
//!
//! Decoding rejects structurally malformed tokens, any algorithm other than
//! HS512, a bad signature, and tokens whose `exp`/`nbf` claims put them
//! outside their validity window.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::Sha512;

use crate::error::ApiError;

type HmacSha512 = Hmac<Sha512>;

const ALGORITHM: &str = "HS512";
const HEADER: &str = r#"{"typ":"JWT","alg":"HS512"}"#;

/// Sign `claims` with `secret`, producing a compact JWT.
pub fn encode<T: Serialize + ?Sized>(claims: &T, secret: &str) -> Result<String, ApiError> {
    let header = URL_SAFE_NO_PAD.encode(HEADER);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let signing_input = format!("{header}.{payload}");

    let mut mac = new_mac(secret)?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

/// Verify `token` against `secret` and deserialize its claims.
pub fn decode<T: DeserializeOwned>(token: &str, secret: &str) -> Result<T, ApiError> {
    if secret.is_empty() {
        return Err(ApiError::token("Secret is required to decode a token"));
    }

    let segments: Vec<&str> = token.split('.').collect();
    let [header, payload, signature] = segments.as_slice() else {
        return Err(ApiError::token("Not enough or too many segments"));
    };

    let header: Value = decode_segment(header)?;
    if header.get("alg").and_then(Value::as_str) != Some(ALGORITHM) {
        return Err(ApiError::token("Algorithm not supported"));
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| ApiError::token("Signature verification failed"))?;
    let mut mac = new_mac(secret)?;
    mac.update(token[..token.len() - segments[2].len() - 1].as_bytes());
    // verify_slice compares in constant time
    mac.verify_slice(&signature)
        .map_err(|_| ApiError::token("Signature verification failed"))?;

    let claims: Value = decode_segment(payload)?;
    check_time_claims(&claims, unix_now())?;

    serde_json::from_value(claims).map_err(|e| ApiError::token(format!("Invalid claims: {e}")))
}

fn new_mac(secret: &str) -> Result<HmacSha512, ApiError> {
    HmacSha512::new_from_slice(secret.as_bytes()).map_err(|e| ApiError::token(e.to_string()))
}

fn decode_segment(segment: &str) -> Result<Value, ApiError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| ApiError::token(format!("Invalid token segment: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::token(format!("Invalid token segment: {e}")))
}

fn check_time_claims(claims: &Value, now: u64) -> Result<(), ApiError> {
    let now = now as f64;
    if let Some(nbf) = claims.get("nbf").and_then(Value::as_f64) {
        if now < nbf {
            return Err(ApiError::token("Token not yet active"));
        }
    }
    if let Some(exp) = claims.get("exp").and_then(Value::as_f64) {
        if now > exp {
            return Err(ApiError::token("Token expired"));
        }
    }
    Ok(())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn roundtrip_preserves_claims() {
        let claims = json!({
            "apiKey": {"key": "k", "password": "p"},
            "nested": [1, "two", null, {"three": 3.5}],
        });
        let token = encode(&claims, "s").unwrap();
        let decoded: Value = decode(&token, "s").unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn encoding_is_deterministic() {
        let claims = json!({"b": 1, "a": 2});
        assert_eq!(encode(&claims, "s").unwrap(), encode(&claims, "s").unwrap());
        assert_ne!(encode(&claims, "s").unwrap(), encode(&claims, "t").unwrap());
    }

    #[test]
    fn header_is_hs512() {
        let token = encode(&json!({}), "s").unwrap();
        let header = token.split('.').next().unwrap();
        let header: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header).unwrap()).unwrap();
        assert_eq!(header, json!({"typ": "JWT", "alg": "HS512"}));
    }

    #[test]
    fn wrong_secret_fails() {
        let token = encode(&json!({"a": 1}), "right").unwrap();
        let err = decode::<Value>(&token, "wrong").unwrap_err();
        assert!(matches!(err, ApiError::Token(ref m) if m == "Signature verification failed"));
    }

    #[test]
    fn tampered_claims_fail() {
        let token = encode(&json!({"amount": 1}), "s").unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(br#"{"amount":1000}"#);
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);
        assert!(matches!(decode::<Value>(&tampered, "s"), Err(ApiError::Token(_))));
    }

    #[test]
    fn malformed_tokens_fail() {
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert!(
                matches!(decode::<Value>(token, "s"), Err(ApiError::Token(_))),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn other_algorithms_are_rejected() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"typ":"JWT","alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode("{}");
        let token = format!("{header}.{payload}.sig");
        let err = decode::<Value>(&token, "s").unwrap_err();
        assert!(matches!(err, ApiError::Token(ref m) if m == "Algorithm not supported"));
    }

    #[test]
    fn empty_secret_cannot_decode() {
        let token = encode(&json!({}), "s").unwrap();
        assert!(matches!(decode::<Value>(&token, ""), Err(ApiError::Token(_))));
    }

    #[test]
    fn time_claims() {
        assert!(check_time_claims(&json!({"exp": 100}), 50).is_ok());
        let err = check_time_claims(&json!({"exp": 100}), 101).unwrap_err();
        assert!(matches!(err, ApiError::Token(ref m) if m == "Token expired"));
        let err = check_time_claims(&json!({"nbf": 100}), 99).unwrap_err();
        assert!(matches!(err, ApiError::Token(ref m) if m == "Token not yet active"));
    }

    #[test]
    fn expired_token_is_rejected_on_decode() {
        let token = encode(&json!({"exp": 1}), "s").unwrap();
        let err = decode::<Value>(&token, "s").unwrap_err();
        assert!(matches!(err, ApiError::Token(ref m) if m == "Token expired"));
    }
}
