//! HTTP client for a remote `udyam serve`
//!
//! Speaks the same wire contract the server exposes and maps responses back
//! onto [`SubmitError`], so callers handle a remote server exactly like a
//! local pipeline.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{json, Value};

use crate::core::identity::SubmissionId;
use crate::core::pipeline::{SubmitError, Submitter};
use crate::core::sink::Submission;
use crate::schema::{FieldErrors, FormData, Schema};

/// Header carrying the admin credential
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

const TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking client for the submission API
pub struct RemoteClient {
    base_url: String,
    agent: ureq::Agent,
}

impl RemoteClient {
    pub fn new(base_url: &str) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(TIMEOUT))
            .build()
            .into();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch the schema the server validates against
    pub fn schema(&self) -> Result<Schema, SubmitError> {
        let (status, body) = self.get("/schema", None)?;
        let body = expect_success(status, body)?;
        serde_json::from_value(body)
            .map_err(|e| SubmitError::TransportFailed(format!("server sent an unreadable schema: {}", e)))
    }

    /// List stored submissions, most recent first
    pub fn list(&self, admin_key: Option<&str>) -> Result<Vec<Submission>, SubmitError> {
        let (status, body) = self.get("/submissions", admin_key)?;
        let body = expect_success(status, body)?;
        serde_json::from_value(body).map_err(|e| {
            SubmitError::TransportFailed(format!("server sent unreadable submissions: {}", e))
        })
    }

    fn get(&self, path: &str, admin_key: Option<&str>) -> Result<(u16, Option<Value>), SubmitError> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");

        let mut request = self.agent.get(&url);
        if let Some(key) = admin_key {
            request = request.header(ADMIN_KEY_HEADER, key);
        }

        let mut response = request.call().map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_json::<Value>().ok();
        Ok((status, body))
    }
}

impl Submitter for RemoteClient {
    fn submit(&self, step: u32, data: &FormData) -> Result<SubmissionId, SubmitError> {
        let url = self.url("/submit");
        tracing::debug!(%url, step, "POST");

        let mut response = self
            .agent
            .post(&url)
            .send_json(json!({ "step": step, "data": data }))
            .map_err(transport)?;

        let status = response.status().as_u16();
        let body = response.body_mut().read_json::<Value>().ok();
        interpret_submit(status, body)
    }
}

fn transport(e: ureq::Error) -> SubmitError {
    SubmitError::TransportFailed(e.to_string())
}

/// Map a `/submit` response onto the submission outcome
pub fn interpret_submit(status: u16, body: Option<Value>) -> Result<SubmissionId, SubmitError> {
    let body = expect_success(status, body)?;
    body.get("id")
        .and_then(Value::as_str)
        .and_then(|id| SubmissionId::parse(id).ok())
        .ok_or_else(|| SubmitError::TransportFailed("server response carried no submission id".to_string()))
}

/// Pass a 200 body through, or map the error envelope
fn expect_success(status: u16, body: Option<Value>) -> Result<Value, SubmitError> {
    let message = body
        .as_ref()
        .and_then(|b| b.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string);

    match status {
        200 => body.ok_or_else(|| SubmitError::TransportFailed("empty response body".to_string())),
        400 => {
            let details = body
                .as_ref()
                .and_then(|b| b.get("details"))
                .and_then(|d| serde_json::from_value::<BTreeMap<String, Vec<String>>>(d.clone()).ok());
            match details {
                Some(details) => Err(SubmitError::ValidationFailed(FieldErrors::from_details(&details))),
                None => Err(SubmitError::MalformedRequest(
                    message.unwrap_or_else(|| "bad request".to_string()),
                )),
            }
        }
        403 => Err(SubmitError::AuthorizationFailed),
        other => Err(SubmitError::TransportFailed(match message {
            Some(m) => format!("server returned {}: {}", other, m),
            None => format!("server returned {}", other),
        })),
    }
}
