//! Maps a transport response onto a success body or a typed `ApiError`.
//!
//! The mapping is a pure function of status and body:
//!
//! | status          | outcome                                         |
//! |-----------------|-------------------------------------------------|
//! | 200             | body, parsed as JSON (raw text if not JSON)     |
//! | 401             | `Auth("Unauthorized")`                          |
//! | 403             | `Auth("Access denied")`                         |
//! | 404             | `NotFound("Resource not found")`                |
//! | other 400..=499 | `Validation(body.error)`, else the raw body     |
//! | anything else   | `UnexpectedStatus`                              |

use serde_json::Value;

use crate::error::ApiError;
use crate::http::HttpResponse;

/// Classify a response. Success yields the body as a JSON value.
pub fn classify(response: &HttpResponse) -> Result<Value, ApiError> {
    match response.status {
        200 => Ok(parse_body(&response.body)),
        401 => Err(ApiError::Auth("Unauthorized".to_string())),
        403 => Err(ApiError::Auth("Access denied".to_string())),
        404 => Err(ApiError::NotFound("Resource not found".to_string())),
        400..=499 => Err(ApiError::Validation(client_error_message(&response.body))),
        status => Err(ApiError::UnexpectedStatus { status }),
    }
}

fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// `body.error` when it is present and truthy, otherwise the body itself.
fn client_error_message(body: &str) -> String {
    match parse_body(body) {
        Value::Object(map) => match map.get("error") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(v) if is_truthy(v) => v.to_string(),
            _ => Value::Object(map).to_string(),
        },
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resp(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(status, body)
    }

    #[test]
    fn ok_passes_body_through() {
        let body = classify(&resp(200, r#"{"token":"T","extra":[1,2]}"#)).unwrap();
        assert_eq!(body, json!({"token": "T", "extra": [1, 2]}));
    }

    #[test]
    fn ok_with_plain_text_body() {
        assert_eq!(classify(&resp(200, "pong")).unwrap(), json!("pong"));
        assert_eq!(classify(&resp(200, "")).unwrap(), Value::Null);
    }

    #[test]
    fn auth_statuses() {
        let err = classify(&resp(401, "{}")).unwrap_err();
        assert!(matches!(err, ApiError::Auth(ref m) if m == "Unauthorized"));
        let err = classify(&resp(403, "{}")).unwrap_err();
        assert!(matches!(err, ApiError::Auth(ref m) if m == "Access denied"));
    }

    #[test]
    fn not_found() {
        let err = classify(&resp(404, "whatever")).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Resource not found"));
    }

    #[test]
    fn client_error_prefers_error_field() {
        let err = classify(&resp(400, r#"{"error":"Invalid ssn"}"#)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "Invalid ssn"));
    }

    #[test]
    fn client_error_falls_back_to_raw_body() {
        let err = classify(&resp(422, "amount too large")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "amount too large"));

        let err = classify(&resp(409, r#"{"error":""}"#)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == r#"{"error":""}"#));
    }

    #[test]
    fn everything_else_is_unexpected() {
        for status in [201, 204, 302, 500, 503] {
            let err = classify(&resp(status, "{}")).unwrap_err();
            assert!(
                matches!(err, ApiError::UnexpectedStatus { status: s } if s == status),
                "status {status}"
            );
            assert_eq!(err.to_string(), "Unexpected status code received.");
        }
    }
}
