//! Request and response payloads for the PayApi endpoints.
//!
//! # Design
//! Only the fields this client reads or writes are typed. Everything the
//! service owns (invoice bodies, check results, fraud-check extras) stays a
//! `serde_json::Value` so new server-side fields pass through untouched.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Body of a successful `POST /v1/api/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthResponse {
    pub token: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parameters for a fraud check. `ip` is required; every other field is
/// forwarded verbatim in the request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FraudCheckParams {
    #[serde(default)]
    pub ip: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FraudCheckParams {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

pub const DEFAULT_COUNTRY_CODE: &str = "FI";
pub const DEFAULT_CONSUMER_NUMBER: u64 = 1;

/// Arguments of a credit check. `new` applies the service defaults
/// (`FI`, consumer number 1).
#[derive(Debug, Clone, PartialEq)]
pub struct CreditCheckParams {
    pub ssn: String,
    pub amount: f64,
    pub country_code: String,
    pub consumer_number: u64,
}

impl CreditCheckParams {
    pub fn new(ssn: impl Into<String>, amount: f64) -> Self {
        Self {
            ssn: ssn.into(),
            amount,
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            consumer_number: DEFAULT_CONSUMER_NUMBER,
        }
    }

    pub fn country_code(mut self, code: impl Into<String>) -> Self {
        self.country_code = code.into();
        self
    }

    pub fn consumer_number(mut self, number: u64) -> Self {
        self.consumer_number = number;
        self
    }
}

/// Session token embedded in POST bodies as `{"authenticationToken":{"token":..}}`.
/// An absent token serializes as `{}`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct EmbeddedToken<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginRequest<'a> {
    pub key: &'a str,
    pub token: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FraudCheckRequest<'a> {
    #[serde(flatten)]
    pub params: &'a FraudCheckParams,
    pub authentication_token: EmbeddedToken<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreditCheckRequest<'a> {
    pub ssn: &'a str,
    #[serde(serialize_with = "serialize_amount")]
    pub amount: f64,
    pub authentication_token: EmbeddedToken<'a>,
    pub country_code: &'a str,
    pub consumer_number: u64,
}

/// Whole amounts go out as JSON integers (`1100`, not `1100.0`).
fn serialize_amount<S: Serializer>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if amount.fract() == 0.0 && amount.abs() <= MAX_EXACT {
        serializer.serialize_i64(*amount as i64)
    } else {
        serializer.serialize_f64(*amount)
    }
}

/// Body of invoice create/update: the signed invoice payload.
#[derive(Debug, Serialize)]
pub(crate) struct SignedData {
    pub data: String,
}

/// The party being invoiced: either an identifier the service already knows,
/// or a full client object to create alongside the invoice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum InvoicingClient {
    Id(String),
    Client(Map<String, Value>),
}

impl From<&str> for InvoicingClient {
    fn from(id: &str) -> Self {
        InvoicingClient::Id(id.to_string())
    }
}

impl From<String> for InvoicingClient {
    fn from(id: String) -> Self {
        InvoicingClient::Id(id)
    }
}

impl From<Map<String, Value>> for InvoicingClient {
    fn from(client: Map<String, Value>) -> Self {
        InvoicingClient::Client(client)
    }
}

impl TryFrom<Value> for InvoicingClient {
    type Error = ApiError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Err(ApiError::validation(
                "Validation: invoicingClient parameter is mandatory",
            )),
            Value::String(id) => Ok(InvoicingClient::Id(id)),
            Value::Object(client) => Ok(InvoicingClient::Client(client)),
            _ => Err(ApiError::validation(
                "Validation: invoicingClient must be a valid id or a client object",
            )),
        }
    }
}

/// Result of every invoice operation: the invoice as stored by the service
/// and the client it was issued to.
///
/// `invoicing_client` is whatever the service returned under
/// `invoicingClient`, usually an id string or a client object, and `Null`
/// when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoicePair {
    pub invoice: Value,
    pub invoicing_client: Value,
}

impl InvoicePair {
    pub(crate) fn from_body(invoice: Value) -> Self {
        let invoicing_client = invoice.get("invoicingClient").cloned().unwrap_or(Value::Null);
        Self {
            invoice,
            invoicing_client,
        }
    }
}

/// Checkout session handed to the hosted secureform page.
///
/// Serializing this struct yields exactly the projection that gets signed;
/// unknown input fields are dropped and absent optional sections omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureformData {
    #[serde(default)]
    pub order: Value,
    #[serde(default)]
    pub products: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callbacks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_urls: Option<Value>,
}

impl SecureformData {
    pub fn new(order: Value, products: Vec<Value>) -> Self {
        Self {
            order,
            products,
            ..Self::default()
        }
    }
}
