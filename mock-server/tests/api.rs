use axum::http::{self, Request, StatusCode};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use mock_server::{
    app, verify_claims, DEFAULT_API_KEY, DEFAULT_PASSWORD, DEFAULT_SECRET, REJECTED_SSN,
};
use serde_json::{json, Value};
use sha2::Sha512;
use tower::{Service, ServiceExt};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn bearer_request(method: &str, uri: &str, token: &str, body: Option<&Value>) -> Request<String> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    match body {
        Some(body) => builder
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .unwrap(),
        None => builder.body(String::new()).unwrap(),
    }
}

fn signed_jwt(claims: &Value, key: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"typ":"JWT","alg":"HS512"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    let mut mac = Hmac::<Sha512>::new_from_slice(key.as_bytes()).unwrap();
    mac.update(format!("{header}.{payload}").as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{header}.{payload}.{signature}")
}

fn login_body_signed(key: &str, password: &str, secret: &str) -> Value {
    json!({
        "key": key,
        "token": signed_jwt(&json!({"apiKey": {"key": key, "password": password}}), secret),
    })
}

fn login_body(key: &str) -> Value {
    login_body_signed(key, DEFAULT_PASSWORD, DEFAULT_SECRET)
}

async fn call(app: &mut axum::routing::RouterIntoService<String>, req: Request<String>) -> axum::response::Response {
    ServiceExt::ready(app).await.unwrap().call(req).await.unwrap()
}

async fn login(app: &mut axum::routing::RouterIntoService<String>) -> String {
    let resp = call(app, json_request("POST", "/v1/api/auth/login", &login_body(DEFAULT_API_KEY))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await["token"].as_str().unwrap().to_string()
}

// --- login ---

#[tokio::test]
async fn login_issues_token() {
    let resp = app()
        .oneshot(json_request("POST", "/v1/api/auth/login", &login_body(DEFAULT_API_KEY)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn login_with_unknown_key_is_401() {
    let resp = app()
        .oneshot(json_request("POST", "/v1/api/auth/login", &login_body("someone-else")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_signed_with_wrong_secret_is_401() {
    for secret in ["other-secret", DEFAULT_API_KEY] {
        let body = login_body_signed(DEFAULT_API_KEY, DEFAULT_PASSWORD, secret);
        let resp = app()
            .oneshot(json_request("POST", "/v1/api/auth/login", &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "secret {secret}");
    }
}

#[tokio::test]
async fn login_with_wrong_password_is_401() {
    let body = login_body_signed(DEFAULT_API_KEY, "not-the-password", DEFAULT_SECRET);
    let resp = app()
        .oneshot(json_request("POST", "/v1/api/auth/login", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_with_garbage_token_is_401() {
    let body = json!({"key": DEFAULT_API_KEY, "token": "garbage"});
    let resp = app()
        .oneshot(json_request("POST", "/v1/api/auth/login", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- protected routes ---

#[tokio::test]
async fn fraud_check_without_token_is_401() {
    let body = json!({"ip": "10.0.0.1", "authenticationToken": {}});
    let resp = app()
        .oneshot(json_request("POST", "/v1/api/authorized/fraud/check/10.0.0.1", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invoice_routes_require_bearer() {
    let resp = app()
        .oneshot(bearer_request("GET", "/v1/api/authorized/invoices/abcdefghij", "nope", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn credit_check_rejected_ssn_is_400_with_error() {
    let mut app = app().into_service();
    let token = login(&mut app).await;

    let body = json!({
        "ssn": REJECTED_SSN,
        "amount": 100,
        "authenticationToken": {"token": token},
        "countryCode": "FI",
        "consumerNumber": 1,
    });
    let resp = call(&mut app, json_request("POST", "/v1/api/authorized/creditcheck", &body)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await, json!({"error": "Invalid ssn"}));
}

#[tokio::test]
async fn tupas_echoes_redirect_and_session() {
    let mut app = app().into_service();
    let token = login(&mut app).await;

    let uri = "/v1/api/authorized/signicat/https%3A%2F%2Fshop.example.com%2Fback?sessionId=s-1";
    let resp = call(&mut app, bearer_request("GET", uri, &token, None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["redirectUrl"], "https://shop.example.com/back");
    assert_eq!(body["sessionId"], "s-1");
}

#[test]
fn verify_claims_checks_signature_and_shape() {
    let token = signed_jwt(&json!({"a": 1}), "key");
    assert_eq!(verify_claims(&token, "key"), Some(json!({"a": 1})));
    assert_eq!(verify_claims(&token, "other"), None);
    assert_eq!(verify_claims("a.b", "key"), None);
    assert_eq!(verify_claims(&format!("x.{token}"), "key"), None);

    let hs256 = URL_SAFE_NO_PAD.encode(r#"{"typ":"JWT","alg":"HS256"}"#);
    let (_, rest) = token.split_once('.').unwrap();
    assert_eq!(verify_claims(&format!("{hs256}.{rest}"), "key"), None);
}

// --- transport helpers ---

#[tokio::test]
async fn status_route_answers_with_requested_code() {
    let resp = app()
        .oneshot(Request::builder().uri("/mock/status/504").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn delay_route_replies_after_sleeping() {
    let started = std::time::Instant::now();
    let resp = app()
        .oneshot(Request::builder().uri("/mock/delay/50").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(started.elapsed() >= std::time::Duration::from_millis(50));
    assert_eq!(body_json(resp).await, json!({"delayedMs": 50}));
}

// --- full invoice lifecycle ---

#[tokio::test]
async fn invoice_lifecycle() {
    let mut app = app().into_service();
    let token = login(&mut app).await;

    // create
    let data = signed_jwt(
        &json!({"amount": 100, "invoicingClient": "client-1", "isFinanceType": false}),
        DEFAULT_API_KEY,
    );
    let resp = call(
        &mut app,
        bearer_request("POST", "/v1/api/authorized/invoices", &token, Some(&json!({"data": data}))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let created = body_json(resp).await;
    let id = created["invoiceId"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 10);
    assert_eq!(created["invoicingClient"], "client-1");

    // get
    let resp = call(
        &mut app,
        bearer_request("GET", &format!("/v1/api/authorized/invoices/{id}"), &token, None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, created);

    // update merges fields
    let data = signed_jwt(
        &json!({"amount": 250, "invoicingClient": {"name": "ACME"}}),
        DEFAULT_API_KEY,
    );
    let resp = call(
        &mut app,
        bearer_request(
            "PUT",
            &format!("/v1/api/authorized/invoices/{id}"),
            &token,
            Some(&json!({"data": data})),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await;
    assert_eq!(updated["amount"], 250);
    assert_eq!(updated["invoicingClient"], json!({"name": "ACME"}));
    assert_eq!(updated["isFinanceType"], false); // unchanged
    assert_eq!(updated["invoiceId"], id.as_str());

    // unknown invoice: 404
    let resp = call(
        &mut app,
        bearer_request("GET", "/v1/api/authorized/invoices/0000000000", &token, None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // bad payload: 400 with error field
    let resp = call(
        &mut app,
        bearer_request(
            "POST",
            "/v1/api/authorized/invoices",
            &token,
            Some(&json!({"data": "not-a-jwt"})),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "Invalid invoice data");

    // payload signed with the secret instead of the API key: 400
    let data = signed_jwt(&json!({"amount": 1}), DEFAULT_SECRET);
    let resp = call(
        &mut app,
        bearer_request("POST", "/v1/api/authorized/invoices", &token, Some(&json!({"data": data}))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
