//!
//! CAS collaborator
//! ----------------
//! Builds the browser-facing login URL and performs the server-to-server
//! ticket validation call against `<cas_addr>/validate`.
//!
//! The validation endpoint answers with JSON:
//! - success: `{"status":"success","userEmail":"..","userAttributes":{..}}`
//! - failure: `{"status":"error","code":"..","message":".."}`
//!
//! Any `status` other than `"error"` is treated as success.

use std::time::Duration;

use anyhow::Context;
use reqwest::Url;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const LOGIN_PATH: &str = "/login";
pub const VALIDATE_PATH: &str = "/validate";

#[derive(Debug, Error)]
pub enum CasError {
    #[error("CAS server unreachable: {0}")]
    Transport(String),
    #[error("malformed CAS response: {0}")]
    Malformed(String),
}

/// Decoded answer of the validation endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResponse {
    Authenticated { user_email: String, user_attributes: Value },
    Rejected { code: Option<String>, message: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawValidation {
    status: String,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    user_email: Option<String>,
    // `None` only when the key is absent; an explicit null is `Some(Value::Null)`
    #[serde(default, deserialize_with = "present_value")]
    user_attributes: Option<Value>,
}

fn present_value<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(d).map(Some)
}

impl ValidationResponse {
    pub fn decode(body: &[u8]) -> Result<Self, CasError> {
        let raw: RawValidation = serde_json::from_slice(body).map_err(|e| CasError::Malformed(e.to_string()))?;
        if raw.status == "error" {
            let message = raw.message.ok_or_else(|| CasError::Malformed("error response without `message`".into()))?;
            // casgo reports numeric codes as strings; accept either
            let code = match raw.code {
                Some(Value::String(s)) => Some(s),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };
            return Ok(ValidationResponse::Rejected { code, message });
        }
        let user_email = raw.user_email.ok_or_else(|| CasError::Malformed(format!("`{}` response without `userEmail`", raw.status)))?;
        let user_attributes = raw.user_attributes.ok_or_else(|| CasError::Malformed(format!("`{}` response without `userAttributes`", raw.status)))?;
        Ok(ValidationResponse::Authenticated { user_email, user_attributes })
    }
}

/// `<cas_addr>/login?service=<encoded service_url>`
pub fn login_url(cas_addr: &str, service_url: &str) -> String {
    format!("{}{}?service={}", cas_addr.trim_end_matches('/'), LOGIN_PATH, urlencoding::encode(service_url))
}

/// `<cas_addr>/validate?service=<encoded service_url>&ticket=<encoded ticket>`
pub fn validate_url(cas_addr: &str, service_url: &str, ticket: &str) -> String {
    format!(
        "{}{}?service={}&ticket={}",
        cas_addr.trim_end_matches('/'),
        VALIDATE_PATH,
        urlencoding::encode(service_url),
        urlencoding::encode(ticket)
    )
}

#[derive(Clone)]
pub struct CasClient {
    cas_addr: String,
    service_url: String,
    http: reqwest::Client,
}

impl CasClient {
    pub fn new(cas_addr: &str, service_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Url::parse(cas_addr).with_context(|| format!("invalid CAS address: {}", cas_addr))?;
        Url::parse(service_url).with_context(|| format!("invalid service URL: {}", service_url))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("While building CAS HTTP client")?;
        Ok(Self { cas_addr: cas_addr.to_string(), service_url: service_url.to_string(), http })
    }

    pub fn login_url(&self) -> String {
        login_url(&self.cas_addr, &self.service_url)
    }

    /// Exchange a ticket for the identity it was issued to.
    pub async fn validate(&self, ticket: &str) -> Result<ValidationResponse, CasError> {
        let url = validate_url(&self.cas_addr, &self.service_url, ticket);
        debug!(target: "cas", "validate lookup url={}", url);
        let resp = self.http.get(&url).send().await.map_err(|e| {
            warn!(target: "cas", "validate request failed: {}", e);
            CasError::Transport(e.to_string())
        })?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| {
            warn!(target: "cas", "validate body read failed: {}", e);
            CasError::Transport(e.to_string())
        })?;
        debug!(target: "cas", "validate response status={} body={}", status, String::from_utf8_lossy(&body));
        let decoded = ValidationResponse::decode(&body).map_err(|e| match e {
            CasError::Malformed(m) if !status.is_success() => CasError::Malformed(format!("HTTP {}: {}", status, m)),
            other => other,
        });
        match &decoded {
            Ok(ValidationResponse::Authenticated { user_email, .. }) => {
                info!(target: "cas", user_email = %user_email, "ticket validated");
            }
            Ok(ValidationResponse::Rejected { code, message }) => {
                info!(target: "cas", code = ?code, "ticket rejected: {}", message);
            }
            Err(e) => warn!(target: "cas", "{}", e),
        }
        decoded
    }
}
