//! Async client for the PayApi fraud-check, credit-check and invoicing API.
//!
//! # Overview
//! `ApiClient` logs in with HMAC-SHA512 signed credentials, keeps the
//! returned bearer token in a per-client `Session`, signs invoice and
//! secureform payloads, and turns every HTTP response into either a typed
//! value or an `ApiError`.
//!
//! # Design
//! - The network sits behind the `Transport` trait. `ReqwestTransport` is the
//!   default; tests use stubs or the mock server in `payapi-mock-server`.
//! - Each operation is split into `build_*` (validation, session guard,
//!   request construction) and a parse step, so the I/O boundary is explicit
//!   and rejected calls never reach the transport.
//! - Response classification and the JWT codec are pure functions.
//! - No retries, no token persistence. Callers that need either wrap the
//!   client.
//!
//! ```no_run
//! use payapi_client::{ApiClient, ClientConfig, CreditCheckParams};
//!
//! # async fn run() -> Result<(), payapi_client::ApiError> {
//! let client = ApiClient::from_config(ClientConfig::new("key", "secret", "password"))?;
//! client.authenticate().await?;
//! let result = client
//!     .credit_check(&CreditCheckParams::new("010190-123A", 1100.0))
//!     .await?;
//! println!("{result}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod response;
pub mod session;
pub mod token;
pub mod transport;
pub mod types;
pub mod validator;

pub use client::ApiClient;
pub use config::{ClientConfig, Environment};
pub use error::{ApiError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use response::classify;
pub use session::{Session, SessionState};
pub use transport::Transport;
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use types::{
    AuthResponse, CreditCheckParams, FraudCheckParams, InvoicePair, InvoicingClient,
    SecureformData,
};
