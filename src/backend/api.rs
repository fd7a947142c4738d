//! Blocking client for the agent backend's config, session and report routes.

use serde::Serialize;
use serde_json::Value;

use crate::http_client;
use crate::report::{FailureReport, ReportReceipt};

/// Header carrying the backend secret key.
pub const SECRET_KEY_HEADER: &str = "X-Secret-Key";

const MAX_LISTING_RESPONSE_BYTES: usize = 1024 * 1024;
const MAX_REPORT_RESPONSE_BYTES: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend rejected the secret key")]
    Unauthorized,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Server error: {0}")]
    ServerError(String),
    #[error("HTTP error: {0}")]
    Transport(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Report rejected: {0}")]
    Rejected(String),
}

/// Backend base URL plus the optional secret key sent with every request.
#[derive(Clone, Debug)]
pub struct BackendClient {
    base_url: String,
    secret_key: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, secret_key: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            secret_key: secret_key.filter(|key| !key.trim().is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of extensions the backend has configured.
    pub fn extension_count(&self) -> Result<u32, BackendError> {
        let body = self.get_json("/config/extensions")?;
        parse_extension_count(&body)
    }

    /// Name of the first configured provider, if any.
    pub fn configured_provider(&self) -> Result<Option<String>, BackendError> {
        let body = self.get_json("/config/providers")?;
        parse_configured_provider(&body)
    }

    /// Provider recorded in a session's metadata.
    pub fn session_provider(&self, session_id: &str) -> Result<Option<String>, BackendError> {
        let session_id = session_id.trim();
        if session_id.is_empty() || !session_id.chars().all(is_session_id_char) {
            return Err(BackendError::NotFound(format!("session {session_id:?}")));
        }
        let body = self.get_json(&format!("/sessions/{session_id}"))?;
        Ok(parse_session_provider(&body))
    }

    /// POST a report to `/report-failure`.
    pub fn submit_report(&self, report: &FailureReport) -> Result<ReportReceipt, BackendError> {
        let body = self.post_json("/report-failure", report, MAX_REPORT_RESPONSE_BYTES)?;
        parse_report_response(&body)
    }

    fn get_json(&self, path: &str) -> Result<Value, BackendError> {
        let request = self.authorize(http_client::agent().get(&self.url(path)));
        let response = request.call().map_err(|err| map_ureq_error(err, path))?;
        read_json(response, MAX_LISTING_RESPONSE_BYTES)
    }

    fn post_json(
        &self,
        path: &str,
        payload: &impl Serialize,
        max_bytes: usize,
    ) -> Result<Value, BackendError> {
        let request = self.authorize(http_client::agent().post(&self.url(path)));
        let response = request
            .send_json(payload)
            .map_err(|err| map_ureq_error(err, path))?;
        read_json(response, max_bytes)
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        let request = request.set("Accept", "application/json");
        match self.secret_key.as_deref() {
            Some(key) => request.set(SECRET_KEY_HEADER, key.trim()),
            None => request,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn is_session_id_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_')
}

fn map_ureq_error(err: ureq::Error, path: &str) -> BackendError {
    match err {
        ureq::Error::Status(code, response) => {
            let body = http_client::read_response_text(response, MAX_REPORT_RESPONSE_BYTES)
                .unwrap_or_else(|err| err.to_string());
            map_status_error(code, path, body)
        }
        ureq::Error::Transport(err) => BackendError::Transport(err.to_string()),
    }
}

fn map_status_error(code: u16, path: &str, body: String) -> BackendError {
    match code {
        401 | 403 => BackendError::Unauthorized,
        404 => BackendError::NotFound(path.to_string()),
        500..=599 => BackendError::ServerError(format!("HTTP {code}: {body}")),
        _ => BackendError::Transport(format!("HTTP {code}: {body}")),
    }
}

fn read_json(response: ureq::Response, max_bytes: usize) -> Result<Value, BackendError> {
    let text = http_client::read_response_text(response, max_bytes)
        .map_err(|err| BackendError::InvalidResponse(err.to_string()))?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|err| BackendError::InvalidResponse(err.to_string()))
}

fn parse_extension_count(body: &Value) -> Result<u32, BackendError> {
    let list = body
        .get("extensions")
        .or(Some(body))
        .and_then(Value::as_array)
        .ok_or_else(|| BackendError::InvalidResponse("missing extensions list".to_string()))?;
    Ok(u32::try_from(list.len()).unwrap_or(u32::MAX))
}

fn parse_configured_provider(body: &Value) -> Result<Option<String>, BackendError> {
    let providers = body
        .get("providers")
        .or(Some(body))
        .and_then(Value::as_array)
        .ok_or_else(|| BackendError::InvalidResponse("missing providers list".to_string()))?;
    Ok(providers
        .iter()
        .filter(|provider| {
            provider
                .get("is_configured")
                .and_then(Value::as_bool)
                .unwrap_or(false)
        })
        .find_map(provider_display_name))
}

fn provider_display_name(provider: &Value) -> Option<String> {
    provider
        .pointer("/metadata/display_name")
        .or_else(|| provider.get("name"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn parse_session_provider(body: &Value) -> Option<String> {
    ["/metadata/provider_name", "/metadata/provider", "/provider_name"]
        .iter()
        .find_map(|pointer| body.pointer(pointer).and_then(Value::as_str))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn parse_report_response(body: &Value) -> Result<ReportReceipt, BackendError> {
    if body.is_null() {
        return Ok(ReportReceipt::default());
    }
    let receipt: ReportReceipt = serde_json::from_value(body.clone())
        .map_err(|err| BackendError::InvalidResponse(err.to_string()))?;
    let success = body.get("success").and_then(Value::as_bool).unwrap_or(true);
    if success {
        return Ok(receipt);
    }
    Err(BackendError::Rejected(receipt.message.unwrap_or_else(|| {
        "Failed to submit report automatically".to_string()
    })))
}
