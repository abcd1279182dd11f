//! Input validation for configuration and per-operation arguments.
//!
//! Every function is pure and stops at the first violated rule. The messages
//! are prefixed with `Configuration:` or `Validation:` and name the offending
//! field.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use url::{Host, Url};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::types::{InvoicingClient, SecureformData};

const MIN_SSN_LEN: usize = 8;
const MAX_SESSION_ID_LEN: usize = 128;
const INVOICE_ID_LEN: std::ops::RangeInclusive<usize> = 7..=14;

pub fn validate_config(config: &ClientConfig) -> Result<(), ApiError> {
    let required = [
        ("apiKey", &config.api_key),
        ("secret", &config.secret),
        ("password", &config.password),
    ];
    for (field, value) in required {
        if value.is_empty() {
            return Err(ApiError::Configuration(format!(
                "Configuration: {field} is mandatory"
            )));
        }
    }
    Ok(())
}

pub fn validate_fraud_check(ip: &str) -> Result<(), ApiError> {
    if ip.is_empty() {
        return Err(ApiError::validation("Validation: ip is mandatory"));
    }
    Ok(())
}

pub fn validate_credit_check(
    ssn: &str,
    amount: f64,
    country_code: &str,
    consumer_number: u64,
) -> Result<(), ApiError> {
    if ssn.chars().count() < MIN_SSN_LEN {
        return Err(ApiError::validation(
            "Validation: ssn must be a valid social security number",
        ));
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ApiError::validation(
            "Validation: amount must be a valid positive number",
        ));
    }
    if !is_iso3166_alpha2(country_code) {
        return Err(ApiError::validation(
            "Validation: countryCode must be a valid ISO alpha-2 code",
        ));
    }
    if consumer_number < 1 {
        return Err(ApiError::validation(
            "Validation: consumerNumber must be a valid autoincremental number",
        ));
    }
    Ok(())
}

pub fn validate_tupas(redirect_url: &str, session_id: Option<&str>) -> Result<(), ApiError> {
    if !is_url(redirect_url) {
        return Err(ApiError::validation(
            "Validation: redirectUrl must be a valid URL",
        ));
    }
    if session_id.is_some_and(|s| s.chars().count() > MAX_SESSION_ID_LEN) {
        return Err(ApiError::validation(
            "Validation: sessionId is too large (max 128 characters)",
        ));
    }
    Ok(())
}

pub fn validate_invoice_id(invoice_id: &str) -> Result<(), ApiError> {
    if !INVOICE_ID_LEN.contains(&invoice_id.chars().count()) {
        return Err(ApiError::validation("Validation: invoiceId is not valid"));
    }
    Ok(())
}

pub fn validate_invoice(invoice: &Value, invoicing_client: &InvoicingClient) -> Result<(), ApiError> {
    if !invoice.is_object() {
        return Err(ApiError::validation(
            "Validation: invoice object parameter is mandatory",
        ));
    }
    if let InvoicingClient::Id(id) = invoicing_client {
        if id.is_empty() {
            return Err(ApiError::validation(
                "Validation: invoicingClient parameter is mandatory",
            ));
        }
    }
    Ok(())
}

pub fn validate_secureform(data: &SecureformData) -> Result<(), ApiError> {
    if !data.order.is_object() {
        return Err(ApiError::validation("Validation: order must be a valid object"));
    }
    if data.products.is_empty() {
        return Err(ApiError::validation(
            "Validation: products must be an array with at least one product item",
        ));
    }
    Ok(())
}

pub fn validate_public_id(public_id: &str) -> Result<(), ApiError> {
    static PUBLIC_ID: OnceLock<Regex> = OnceLock::new();

    if public_id.is_empty() {
        return Err(ApiError::validation("Validation: publicId is mandatory"));
    }
    let re = PUBLIC_ID.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_-]{5,49}$").unwrap());
    if !re.is_match(public_id) {
        return Err(ApiError::validation("Validation: publicId is not valid"));
    }
    Ok(())
}

/// Three non-empty base64url segments separated by dots.
pub fn validate_jwt_shape(token: &str) -> Result<(), ApiError> {
    static JWT: OnceLock<Regex> = OnceLock::new();

    let re = JWT.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+$").unwrap()
    });
    if !re.is_match(token) {
        return Err(ApiError::validation("Validation: token must be a valid JWT"));
    }
    Ok(())
}

/// Case-insensitive ISO 3166-1 alpha-2 membership.
pub fn is_iso3166_alpha2(code: &str) -> bool {
    code.len() == 2 && ISO3166_ALPHA2.contains(&code.to_ascii_uppercase().as_str())
}

/// URL check modelled on the usual web-form rules: the scheme is optional but
/// must be http, https or ftp when present, and the host must be an IP
/// address or a domain with an alphabetic top-level label.
pub fn is_url(candidate: &str) -> bool {
    if candidate.is_empty() || candidate.len() >= 2083 || candidate.contains(char::is_whitespace) {
        return false;
    }
    let with_scheme = if candidate.contains("://") {
        candidate.to_string()
    } else {
        format!("http://{candidate}")
    };
    let Ok(parsed) = Url::parse(&with_scheme) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https" | "ftp") {
        return false;
    }
    match parsed.host() {
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
        Some(Host::Domain(domain)) => has_tld(domain),
        None => false,
    }
}

fn has_tld(domain: &str) -> bool {
    let domain = domain.trim_end_matches('.');
    let Some((rest, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !rest.is_empty()
        && domain.split('.').all(|label| !label.is_empty())
        && (tld.starts_with("xn--")
            || (tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())))
}

#[rustfmt::skip]
const ISO3166_ALPHA2: [&str; 249] = [
    "AD", "AE", "AF", "AG", "AI", "AL", "AM", "AO", "AQ", "AR", "AS", "AT", "AU", "AW", "AX", "AZ",
    "BA", "BB", "BD", "BE", "BF", "BG", "BH", "BI", "BJ", "BL", "BM", "BN", "BO", "BQ", "BR", "BS",
    "BT", "BV", "BW", "BY", "BZ", "CA", "CC", "CD", "CF", "CG", "CH", "CI", "CK", "CL", "CM", "CN",
    "CO", "CR", "CU", "CV", "CW", "CX", "CY", "CZ", "DE", "DJ", "DK", "DM", "DO", "DZ", "EC", "EE",
    "EG", "EH", "ER", "ES", "ET", "FI", "FJ", "FK", "FM", "FO", "FR", "GA", "GB", "GD", "GE", "GF",
    "GG", "GH", "GI", "GL", "GM", "GN", "GP", "GQ", "GR", "GS", "GT", "GU", "GW", "GY", "HK", "HM",
    "HN", "HR", "HT", "HU", "ID", "IE", "IL", "IM", "IN", "IO", "IQ", "IR", "IS", "IT", "JE", "JM",
    "JO", "JP", "KE", "KG", "KH", "KI", "KM", "KN", "KP", "KR", "KW", "KY", "KZ", "LA", "LB", "LC",
    "LI", "LK", "LR", "LS", "LT", "LU", "LV", "LY", "MA", "MC", "MD", "ME", "MF", "MG", "MH", "MK",
    "ML", "MM", "MN", "MO", "MP", "MQ", "MR", "MS", "MT", "MU", "MV", "MW", "MX", "MY", "MZ", "NA",
    "NC", "NE", "NF", "NG", "NI", "NL", "NO", "NP", "NR", "NU", "NZ", "OM", "PA", "PE", "PF", "PG",
    "PH", "PK", "PL", "PM", "PN", "PR", "PS", "PT", "PW", "PY", "QA", "RE", "RO", "RS", "RU", "RW",
    "SA", "SB", "SC", "SD", "SE", "SG", "SH", "SI", "SJ", "SK", "SL", "SM", "SN", "SO", "SR", "SS",
    "ST", "SV", "SX", "SY", "SZ", "TC", "TD", "TF", "TG", "TH", "TJ", "TK", "TL", "TM", "TN", "TO",
    "TR", "TT", "TV", "TW", "TZ", "UA", "UG", "UM", "US", "UY", "UZ", "VA", "VC", "VE", "VG", "VI",
    "VN", "VU", "WF", "WS", "YE", "YT", "ZA", "ZM", "ZW",
];
