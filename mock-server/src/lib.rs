//! In-memory stand-in for the PayApi service.
//!
//! Implements login, fraud check, credit check, tupas and invoice CRUD with
//! the same status codes and body shapes as the real service, so the client
//! can be exercised over real HTTP. Login tokens are verified with the
//! account secret and signed invoice payloads with the API key, both HS512.
//!
//! Two extra routes under `/mock/` exist only to exercise transports: one
//! answers with an arbitrary status, the other delays its reply.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use sha2::Sha512;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

type HmacSha512 = Hmac<Sha512>;

pub const DEFAULT_API_KEY: &str = "test-apikey";
pub const DEFAULT_SECRET: &str = "test-secret";
pub const DEFAULT_PASSWORD: &str = "password-test";

/// ssn the credit-check endpoint rejects with a 400.
pub const REJECTED_SSN: &str = "00000000";

/// Credentials of the single merchant account the mock knows.
#[derive(Debug, Clone)]
pub struct Account {
    pub api_key: String,
    pub secret: String,
    pub password: String,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            api_key: DEFAULT_API_KEY.to_string(),
            secret: DEFAULT_SECRET.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MockState {
    pub account: Account,
    tokens: RwLock<HashSet<String>>,
    invoices: RwLock<HashMap<String, Value>>,
}

pub type Db = Arc<MockState>;

type Reply = (StatusCode, Json<Value>);

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Deserialize)]
pub struct SignedData {
    pub data: String,
}

#[derive(Deserialize)]
pub struct TupasQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

pub fn app() -> Router {
    app_with_account(Account::default())
}

pub fn app_with_account(account: Account) -> Router {
    let db: Db = Arc::new(MockState {
        account,
        ..MockState::default()
    });
    Router::new()
        .route("/v1/api/auth/login", post(login))
        .route("/v1/api/authorized/fraud/check/{ip}", post(fraud_check))
        .route("/v1/api/authorized/creditcheck", post(credit_check))
        .route("/v1/api/authorized/signicat/{redirect}", get(tupas_url))
        .route("/v1/api/authorized/invoices", post(create_invoice))
        .route(
            "/v1/api/authorized/invoices/{id}",
            get(get_invoice).put(update_invoice),
        )
        .route("/mock/status/{code}", get(fixed_status))
        .route("/mock/delay/{ms}", get(delayed))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_account(listener: TcpListener, account: Account) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_account(account)).await
}

async fn login(State(db): State<Db>, Json(input): Json<LoginRequest>) -> Reply {
    let account = &db.account;
    let claims = verify_claims(&input.token, &account.secret);
    let signed = |field: &str| {
        claims
            .as_ref()
            .and_then(|c| c.pointer(&format!("/apiKey/{field}")))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    if input.key != account.api_key
        || signed("key").as_deref() != Some(account.api_key.as_str())
        || signed("password").as_deref() != Some(account.password.as_str())
    {
        tracing::debug!(key = %input.key, "login rejected");
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    let token = Uuid::new_v4().simple().to_string();
    db.tokens.write().await.insert(token.clone());
    (StatusCode::OK, Json(json!({ "token": token })))
}

async fn fraud_check(
    State(db): State<Db>,
    Path(ip): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    if !embedded_token_valid(&db, &body).await {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    (StatusCode::OK, Json(json!({ "ip": ip, "fraud": false })))
}

async fn credit_check(State(db): State<Db>, Json(body): Json<Value>) -> Reply {
    if !embedded_token_valid(&db, &body).await {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    if body["ssn"] == REJECTED_SSN {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "Invalid ssn" })));
    }
    let amount = body["amount"].as_f64().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "ssn": body["ssn"],
            "countryCode": body["countryCode"],
            "consumerNumber": body["consumerNumber"],
            "approved": amount <= 5000.0,
        })),
    )
}

async fn tupas_url(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(redirect): Path<String>,
    Query(query): Query<TupasQuery>,
) -> Reply {
    if !bearer_valid(&db, &headers).await {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "url": "https://tupas.mock/auth",
            "redirectUrl": redirect,
            "sessionId": query.session_id,
        })),
    )
}

async fn create_invoice(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<SignedData>,
) -> Reply {
    if !bearer_valid(&db, &headers).await {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    let Some(Value::Object(mut invoice)) = verify_claims(&input.data, &db.account.api_key) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid invoice data" })),
        );
    };
    let id = Uuid::new_v4().simple().to_string()[..10].to_string();
    invoice.insert("invoiceId".to_string(), Value::String(id.clone()));
    let invoice = Value::Object(invoice);
    db.invoices.write().await.insert(id, invoice.clone());
    (StatusCode::OK, Json(invoice))
}

async fn get_invoice(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    if !bearer_valid(&db, &headers).await {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    match db.invoices.read().await.get(&id) {
        Some(invoice) => (StatusCode::OK, Json(invoice.clone())),
        None => (StatusCode::NOT_FOUND, Json(json!({}))),
    }
}

async fn update_invoice(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<SignedData>,
) -> Reply {
    if !bearer_valid(&db, &headers).await {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    let Some(Value::Object(changes)) = verify_claims(&input.data, &db.account.api_key) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid invoice data" })),
        );
    };
    let mut invoices = db.invoices.write().await;
    let Some(Value::Object(invoice)) = invoices.get_mut(&id) else {
        return (StatusCode::NOT_FOUND, Json(json!({})));
    };
    merge(invoice, changes);
    invoice.insert("invoiceId".to_string(), Value::String(id));
    (StatusCode::OK, Json(Value::Object(invoice.clone())))
}

fn merge(target: &mut Map<String, Value>, changes: Map<String, Value>) {
    for (key, value) in changes {
        target.insert(key, value);
    }
}

async fn fixed_status(Path(code): Path<u16>) -> Reply {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(json!({ "status": code })))
}

async fn delayed(Path(ms): Path<u64>) -> Reply {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    (StatusCode::OK, Json(json!({ "delayedMs": ms })))
}

/// Claims of an HS512 compact JWT signed with `key`, or `None` when the
/// token is malformed, uses another algorithm or fails verification.
pub fn verify_claims(token: &str, key: &str) -> Option<Value> {
    let (signing_input, signature) = token.rsplit_once('.')?;
    let mut segments = signing_input.split('.');
    let (header, payload, None) = (segments.next()?, segments.next()?, segments.next()) else {
        return None;
    };

    let header: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header).ok()?).ok()?;
    if header["alg"] != "HS512" {
        return None;
    }
    let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
    let mut mac = HmacSha512::new_from_slice(key.as_bytes()).ok()?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&signature).ok()?;

    serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).ok()?).ok()
}

async fn bearer_valid(db: &Db, headers: &HeaderMap) -> bool {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match token {
        Some(token) => db.tokens.read().await.contains(token),
        None => false,
    }
}

async fn embedded_token_valid(db: &Db, body: &Value) -> bool {
    match body.pointer("/authenticationToken/token").and_then(Value::as_str) {
        Some(token) => db.tokens.read().await.contains(token),
        None => false,
    }
}
