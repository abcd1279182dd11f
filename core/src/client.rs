//! Authenticated request pipeline for the PayApi service.
//!
//! # Design
//! Every operation is split the same way:
//!
//! 1. `build_*` validates the arguments, checks the session when the endpoint
//!    is protected, and produces an `HttpRequest`. It never touches the
//!    network, so a rejected call provably sends nothing.
//! 2. The async operation hands that request to the `Transport`. This is the
//!    only suspension point.
//! 3. `parse_*` classifies the `HttpResponse` and decodes the body.
//!
//! The fraud-check endpoint is deliberately not guarded: it is sent even
//! before `authenticate`, with an empty embedded token. GET endpoints and the
//! invoice endpoints carry `Authorization: Bearer`; the fraud and credit
//! POSTs embed `{"authenticationToken":{"token":..}}` in the body instead.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::response::classify;
use crate::session::Session;
use crate::token;
use crate::transport::Transport;
use crate::types::{
    AuthResponse, CreditCheckParams, CreditCheckRequest, EmbeddedToken, FraudCheckParams,
    FraudCheckRequest, InvoicePair, InvoicingClient, LoginRequest, SecureformData, SignedData,
};
use crate::validator;

const LOGIN_PATH: &str = "/v1/api/auth/login";
const FRAUD_CHECK_PATH: &str = "/v1/api/authorized/fraud/check";
const CREDIT_CHECK_PATH: &str = "/v1/api/authorized/creditcheck";
const TUPAS_PATH: &str = "/v1/api/authorized/signicat";
const INVOICES_PATH: &str = "/v1/api/authorized/invoices";
const SECUREFORM_PATH: &str = "/v1/secureform";

/// Client for one PayApi account.
///
/// Owns its configuration and its session; two clients never share a token.
/// All operations take `&self`, so one client can serve concurrent tasks.
#[derive(Debug)]
pub struct ApiClient<T> {
    config: ClientConfig,
    api_url: String,
    session: Session,
    transport: T,
}

impl<T> ApiClient<T> {
    /// Validate `config` and bind it to `transport`.
    pub fn new(config: ClientConfig, transport: T) -> Result<Self, ApiError> {
        validator::validate_config(&config)?;
        let api_url = config.api_url();
        let session = Session::new(config.authentication_token.clone());
        debug!(api_url = %api_url, "PayApi client configured");
        Ok(Self {
            config,
            api_url,
            session,
            transport,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The login JWT: `{apiKey:{key,password}}` signed with the account secret.
    pub fn generate_access_token(&self) -> Result<String, ApiError> {
        let claims = json!({
            "apiKey": {
                "key": self.config.api_key,
                "password": self.config.password,
            }
        });
        token::encode(&claims, &self.config.secret)
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_authenticate(&self) -> Result<HttpRequest, ApiError> {
        let token = self.generate_access_token()?;
        let body = serde_json::to_string(&LoginRequest {
            key: &self.config.api_key,
            token: &token,
        })?;
        Ok(HttpRequest::new(HttpMethod::Post, self.url(LOGIN_PATH)).json_body(body))
    }

    pub fn build_fraud_check(&self, params: &FraudCheckParams) -> Result<HttpRequest, ApiError> {
        validator::validate_fraud_check(&params.ip)?;

        let token = self.session.token();
        if token.is_none() {
            warn!("fraud check sent without an authenticated session");
        }
        let mut params = params.clone();
        params.extra.remove("authenticationToken");
        let body = serde_json::to_string(&FraudCheckRequest {
            params: &params,
            authentication_token: EmbeddedToken {
                token: token.as_deref(),
            },
        })?;

        let url = format!(
            "{}/{}",
            self.url(FRAUD_CHECK_PATH),
            urlencoding::encode(&params.ip)
        );
        Ok(HttpRequest::new(HttpMethod::Post, url).json_body(body))
    }

    pub fn build_credit_check(&self, params: &CreditCheckParams) -> Result<HttpRequest, ApiError> {
        validator::validate_credit_check(
            &params.ssn,
            params.amount,
            &params.country_code,
            params.consumer_number,
        )?;
        let token = self.session.require_token()?;

        let body = serde_json::to_string(&CreditCheckRequest {
            ssn: &params.ssn,
            amount: params.amount,
            authentication_token: EmbeddedToken {
                token: Some(&token),
            },
            country_code: &params.country_code,
            consumer_number: params.consumer_number,
        })?;
        Ok(HttpRequest::new(HttpMethod::Post, self.url(CREDIT_CHECK_PATH)).json_body(body))
    }

    pub fn build_tupas_url(
        &self,
        redirect_url: &str,
        session_id: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        validator::validate_tupas(redirect_url, session_id)?;
        let token = self.session.require_token()?;

        let url = format!(
            "{}/{}",
            self.url(TUPAS_PATH),
            urlencoding::encode(redirect_url)
        );
        let mut request = HttpRequest::new(HttpMethod::Get, url).bearer(&token);
        if let Some(session_id) = session_id {
            request = request.query_param("sessionId", session_id);
        }
        Ok(request)
    }

    pub fn build_get_invoice(&self, invoice_id: &str) -> Result<HttpRequest, ApiError> {
        validator::validate_invoice_id(invoice_id)?;
        let token = self.session.require_token()?;
        Ok(HttpRequest::new(HttpMethod::Get, self.invoice_url(invoice_id)).bearer(&token))
    }

    pub fn build_create_invoice(
        &self,
        invoice: &Value,
        invoicing_client: &InvoicingClient,
        is_finance: bool,
    ) -> Result<HttpRequest, ApiError> {
        validator::validate_invoice(invoice, invoicing_client)?;
        let token = self.session.require_token()?;

        let data = self.sign_invoice(invoice, invoicing_client, Some(is_finance))?;
        let body = serde_json::to_string(&SignedData { data })?;
        Ok(HttpRequest::new(HttpMethod::Post, self.url(INVOICES_PATH))
            .bearer(&token)
            .json_body(body))
    }

    pub fn build_update_invoice(
        &self,
        invoice_id: &str,
        invoice: &Value,
        invoicing_client: &InvoicingClient,
    ) -> Result<HttpRequest, ApiError> {
        validator::validate_invoice_id(invoice_id)?;
        validator::validate_invoice(invoice, invoicing_client)?;
        let token = self.session.require_token()?;

        let data = self.sign_invoice(invoice, invoicing_client, None)?;
        let body = serde_json::to_string(&SignedData { data })?;
        Ok(HttpRequest::new(HttpMethod::Put, self.invoice_url(invoice_id))
            .bearer(&token)
            .json_body(body))
    }

    // -----------------------------------------------------------------------
    // Response parsers
    // -----------------------------------------------------------------------

    /// Classify a login response and, on success, store the new token.
    pub fn parse_authenticate(&self, response: &HttpResponse) -> Result<AuthResponse, ApiError> {
        let body = classify(response)?;
        let auth: AuthResponse = decode_body(body)?;
        self.session.store(auth.token.clone());
        debug!("PayApi session token refreshed");
        Ok(auth)
    }

    pub fn parse_invoice(&self, response: &HttpResponse) -> Result<InvoicePair, ApiError> {
        Ok(InvoicePair::from_body(classify(response)?))
    }

    // -----------------------------------------------------------------------
    // Local operations
    // -----------------------------------------------------------------------

    /// Sign a secureform checkout session with the API key.
    pub fn create_secureform_data_token(&self, data: &SecureformData) -> Result<String, ApiError> {
        validator::validate_secureform(data)?;
        token::encode(data, &self.config.api_key)
    }

    /// URL of the hosted secureform page for a merchant's public id.
    pub fn get_secureform_url(&self, public_id: &str) -> Result<String, ApiError> {
        validator::validate_public_id(public_id)?;
        Ok(format!("{}/{public_id}", self.url(SECUREFORM_PATH)))
    }

    /// Verify and decode a callback payload the service signed with the API key.
    pub fn decode_merchant_callback<C: DeserializeOwned>(&self, token: &str) -> Result<C, ApiError> {
        validator::validate_jwt_shape(token)?;
        token::decode(token, &self.config.api_key)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    fn invoice_url(&self, invoice_id: &str) -> String {
        format!(
            "{}/{}",
            self.url(INVOICES_PATH),
            urlencoding::encode(invoice_id)
        )
    }

    /// Sign `{...invoice, isFinanceType?, invoicingClient}` without touching
    /// the caller's invoice.
    fn sign_invoice(
        &self,
        invoice: &Value,
        invoicing_client: &InvoicingClient,
        is_finance: Option<bool>,
    ) -> Result<String, ApiError> {
        let mut payload = invoice.as_object().cloned().unwrap_or_default();
        if let Some(is_finance) = is_finance {
            payload.insert("isFinanceType".to_string(), Value::Bool(is_finance));
        }
        payload.insert(
            "invoicingClient".to_string(),
            serde_json::to_value(invoicing_client)?,
        );
        token::encode(&payload, &self.config.api_key)
    }
}

impl<T: Transport> ApiClient<T> {
    /// Log in and store the returned bearer token in the session.
    pub async fn authenticate(&self) -> Result<AuthResponse, ApiError> {
        let request = self.build_authenticate()?;
        let response = self.execute(request).await?;
        self.parse_authenticate(&response)
    }

    pub async fn fraud_check(&self, params: &FraudCheckParams) -> Result<Value, ApiError> {
        let request = self.build_fraud_check(params)?;
        let response = self.execute(request).await?;
        classify(&response)
    }

    pub async fn credit_check(&self, params: &CreditCheckParams) -> Result<Value, ApiError> {
        let request = self.build_credit_check(params)?;
        let response = self.execute(request).await?;
        classify(&response)
    }

    pub async fn get_tupas_url(
        &self,
        redirect_url: &str,
        session_id: Option<&str>,
    ) -> Result<Value, ApiError> {
        let request = self.build_tupas_url(redirect_url, session_id)?;
        let response = self.execute(request).await?;
        classify(&response)
    }

    pub async fn get_invoice(&self, invoice_id: &str) -> Result<InvoicePair, ApiError> {
        let request = self.build_get_invoice(invoice_id)?;
        let response = self.execute(request).await?;
        self.parse_invoice(&response)
    }

    pub async fn create_invoice(
        &self,
        invoice: &Value,
        invoicing_client: &InvoicingClient,
        is_finance: bool,
    ) -> Result<InvoicePair, ApiError> {
        let request = self.build_create_invoice(invoice, invoicing_client, is_finance)?;
        let response = self.execute(request).await?;
        self.parse_invoice(&response)
    }

    pub async fn create_standard_invoice(
        &self,
        invoice: &Value,
        invoicing_client: &InvoicingClient,
    ) -> Result<InvoicePair, ApiError> {
        self.create_invoice(invoice, invoicing_client, false).await
    }

    pub async fn create_finance_invoice(
        &self,
        invoice: &Value,
        invoicing_client: &InvoicingClient,
    ) -> Result<InvoicePair, ApiError> {
        self.create_invoice(invoice, invoicing_client, true).await
    }

    pub async fn update_invoice(
        &self,
        invoice_id: &str,
        invoice: &Value,
        invoicing_client: &InvoicingClient,
    ) -> Result<InvoicePair, ApiError> {
        let request = self.build_update_invoice(invoice_id, invoice, invoicing_client)?;
        let response = self.execute(request).await?;
        self.parse_invoice(&response)
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = request.method.as_str(), url = %request.url, "sending PayApi request");
        let response = self.transport.send(request).await?;
        debug!(status = response.status, "PayApi response received");
        Ok(response)
    }
}

#[cfg(feature = "reqwest")]
impl ApiClient<crate::transport::ReqwestTransport> {
    /// Client over a default `reqwest` transport.
    pub fn from_config(config: ClientConfig) -> Result<Self, ApiError> {
        Self::new(config, crate::transport::ReqwestTransport::new())
    }
}

fn decode_body<R: DeserializeOwned>(body: Value) -> Result<R, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
