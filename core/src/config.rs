//! Client configuration.
//!
//! # Design
//! `ClientConfig` enumerates the required credentials and the optional
//! overrides explicitly. It is validated once, when `ApiClient::new` takes
//! ownership of it, and never re-validated per call. The struct derives
//! `Deserialize` with the service's camelCase field names so callers can load
//! it from JSON, a file or the environment without this crate reading any of
//! those sources itself.
//!
//! Credentials default to empty strings during deserialization so a missing
//! field surfaces as the usual `Configuration: <field> is mandatory` error
//! rather than a serde message.

use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::ApiError;

pub const STAGING_URL: &str = "https://staging-input.payapi.io";
pub const PRODUCTION_URL: &str = "https://input.payapi.io";

/// Which PayApi deployment the client talks to when no `dev_url` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Staging,
    Production,
}

impl Environment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Staging => STAGING_URL,
            Environment::Production => PRODUCTION_URL,
        }
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub password: String,
    /// `null` reads as `false`.
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_prod: bool,
    /// Overrides the computed base URL, e.g. a local mock server.
    #[serde(default)]
    pub dev_url: Option<String>,
    /// Seeds the session with a token obtained elsewhere.
    #[serde(default)]
    pub authentication_token: Option<String>,
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

impl ClientConfig {
    pub fn new(
        api_key: impl Into<String>,
        secret: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            secret: secret.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    pub fn production(mut self, is_prod: bool) -> Self {
        self.is_prod = is_prod;
        self
    }

    pub fn with_dev_url(mut self, url: impl Into<String>) -> Self {
        self.dev_url = Some(url.into());
        self
    }

    pub fn with_authentication_token(mut self, token: impl Into<String>) -> Self {
        self.authentication_token = Some(token.into());
        self
    }

    /// Build a config from a loosely-typed JSON object.
    pub fn from_json(value: Value) -> Result<Self, ApiError> {
        if !value.is_object() {
            return Err(ApiError::Configuration(
                "Configuration: missing constructor params".to_string(),
            ));
        }
        if value.get("isProd").is_some_and(|v| !v.is_null() && !v.is_boolean()) {
            return Err(ApiError::Configuration(
                "Configuration: isProd must be a boolean".to_string(),
            ));
        }
        serde_json::from_value(value)
            .map_err(|e| ApiError::Configuration(format!("Configuration: {e}")))
    }

    pub fn environment(&self) -> Environment {
        if self.is_prod {
            Environment::Production
        } else {
            Environment::Staging
        }
    }

    /// Base URL for every endpoint. `dev_url` wins over the environment.
    pub fn api_url(&self) -> String {
        match self.dev_url.as_deref() {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => self.environment().base_url().to_string(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key)
            .field("secret", &"<redacted>")
            .field("password", &"<redacted>")
            .field("is_prod", &self.is_prod)
            .field("dev_url", &self.dev_url)
            .field(
                "authentication_token",
                &self.authentication_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
