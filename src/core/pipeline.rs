//! Submission pipeline - the authoritative write and read paths
//!
//! Every submission is validated again here against the addressed step, no
//! matter what the client already checked. Accepted payloads go to the record
//! sink unchanged; the sink assigns the id. Reads are gated by the admin key.

use std::sync::Arc;

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::core::identity::SubmissionId;
use crate::core::sink::{RecordSink, Submission};
use crate::schema::{FieldErrors, FormData, Schema, StepValidator};

/// Error text for a request without a usable `step` or `data`
pub const MISSING_STEP_OR_DATA: &str = "step & data required";

/// Outcome taxonomy shared by the server, the CLI and the remote client
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum SubmitError {
    #[error("{0}")]
    #[diagnostic(code(udyam::submit::malformed))]
    MalformedRequest(String),

    #[error("Validation failed")]
    #[diagnostic(code(udyam::submit::validation))]
    ValidationFailed(FieldErrors),

    #[error("Forbidden")]
    #[diagnostic(
        code(udyam::submit::forbidden),
        help("pass the admin key configured for the server (admin_key / UDYAM_ADMIN_KEY)")
    )]
    AuthorizationFailed,

    #[error("transport failed: {0}")]
    #[diagnostic(code(udyam::submit::transport))]
    TransportFailed(String),
}

impl SubmitError {
    /// Field errors carried by a validation failure
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            SubmitError::ValidationFailed(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Anything that accepts one step's payload and returns the stored id
pub trait Submitter {
    fn submit(&self, step: u32, data: &FormData) -> Result<SubmissionId, SubmitError>;
}

/// A decoded `{ step, data }` request body
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    pub step: u32,
    pub data: FormData,
}

impl SubmissionRequest {
    /// Decode a request body; `step` must be a positive integer and `data` an object
    pub fn from_value(body: &Value) -> Result<Self, SubmitError> {
        let malformed = || SubmitError::MalformedRequest(MISSING_STEP_OR_DATA.to_string());

        let step = body
            .get("step")
            .and_then(Value::as_u64)
            .filter(|s| *s >= 1)
            .and_then(|s| u32::try_from(s).ok())
            .ok_or_else(malformed)?;

        let data = body
            .get("data")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(malformed)?;

        Ok(Self { step, data })
    }
}

/// Validates, stores and lists submissions
pub struct SubmissionPipeline {
    schema: Arc<Schema>,
    sink: Box<dyn RecordSink>,
    admin_key: Option<String>,
}

impl SubmissionPipeline {
    pub fn new(schema: Arc<Schema>, sink: Box<dyn RecordSink>) -> Self {
        Self {
            schema,
            sink,
            admin_key: None,
        }
    }

    /// Set the key required by [`SubmissionPipeline::list`]; empty means unset
    pub fn with_admin_key(mut self, key: Option<String>) -> Self {
        self.admin_key = key.filter(|k| !k.is_empty());
        self
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn has_admin_key(&self) -> bool {
        self.admin_key.is_some()
    }

    /// Run the step validator without storing anything
    pub fn validate(&self, step: u32, data: &FormData) -> Result<(), SubmitError> {
        let step_def = self
            .schema
            .step(step)
            .ok_or_else(|| SubmitError::MalformedRequest(format!("unknown step {}", step)))?;

        StepValidator::build(step_def)
            .validate(data)
            .map_err(SubmitError::ValidationFailed)
    }

    /// Validate and store one step's payload
    pub fn submit(&self, step: u32, data: &FormData) -> Result<SubmissionId, SubmitError> {
        if let Err(e) = self.validate(step, data) {
            match &e {
                SubmitError::ValidationFailed(errors) => {
                    tracing::info!(step, fields = errors.len(), "submission rejected")
                }
                other => tracing::info!(step, error = %other, "submission refused"),
            }
            return Err(e);
        }

        let stored = self.sink.create(step, data).map_err(|e| {
            tracing::error!(step, error = %e, "record sink failed");
            SubmitError::TransportFailed(e.to_string())
        })?;

        tracing::info!(id = %stored.id, step, "submission accepted");
        Ok(stored.id)
    }

    /// Decode a raw `{ step, data }` body and submit it
    pub fn submit_request(&self, body: &Value) -> Result<SubmissionId, SubmitError> {
        let request = SubmissionRequest::from_value(body)?;
        self.submit(request.step, &request.data)
    }

    /// Check a credential against the configured admin key
    pub fn authorize(&self, credential: Option<&str>) -> Result<(), SubmitError> {
        match (self.admin_key.as_deref(), credential) {
            (Some(expected), Some(given)) if expected == given => Ok(()),
            _ => Err(SubmitError::AuthorizationFailed),
        }
    }

    /// All submissions, most recent first
    pub fn list(&self, credential: Option<&str>) -> Result<Vec<Submission>, SubmitError> {
        if let Err(e) = self.authorize(credential) {
            tracing::warn!(configured = self.has_admin_key(), "submission listing refused");
            return Err(e);
        }

        self.sink
            .list()
            .map_err(|e| SubmitError::TransportFailed(e.to_string()))
    }
}

impl Submitter for SubmissionPipeline {
    fn submit(&self, step: u32, data: &FormData) -> Result<SubmissionId, SubmitError> {
        SubmissionPipeline::submit(self, step, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sink::{MemorySink, SinkError};
    use crate::schema::fixtures::sample_schema;
    use serde_json::json;

    struct FailingSink;

    impl RecordSink for FailingSink {
        fn create(&self, _step: u32, _data: &FormData) -> Result<Submission, SinkError> {
            Err(SinkError::Unavailable("disk on fire".to_string()))
        }

        fn list(&self) -> Result<Vec<Submission>, SinkError> {
            Err(SinkError::Unavailable("disk on fire".to_string()))
        }
    }

    fn pipeline() -> SubmissionPipeline {
        SubmissionPipeline::new(Arc::new(sample_schema()), Box::new(MemorySink::new()))
            .with_admin_key(Some("s3cret".to_string()))
    }

    fn data(value: Value) -> FormData {
        value.as_object().cloned().unwrap()
    }

    fn step_one() -> FormData {
        data(json!({"aadhaarNumber": "123412341234", "applicantName": "Asha"}))
    }

    #[test]
    fn test_valid_submission_is_stored() {
        let p = pipeline();
        let id = p.submit(1, &step_one()).unwrap();

        let listed = p.list(Some("s3cret")).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].data, step_one());
    }

    #[test]
    fn test_invalid_submission_is_not_stored() {
        let p = pipeline();
        let err = p
            .submit(1, &data(json!({"aadhaarNumber": "12", "applicantName": ""})))
            .unwrap_err();

        let errors = err.field_errors().unwrap();
        assert_eq!(errors.get("aadhaarNumber"), Some("Invalid Aadhaar"));
        assert_eq!(errors.get("applicantName"), Some("applicantName is required"));
        assert!(p.list(Some("s3cret")).unwrap().is_empty());
    }

    #[test]
    fn test_validation_is_repeated_on_the_server() {
        // a client that skipped validation gets the same answer
        let p = pipeline();
        let err = p
            .submit(2, &data(json!({"panNumber": "abcde1234f", "terms": true, "businessType": "service"})))
            .unwrap_err();
        assert_eq!(
            err.field_errors().unwrap().get("panNumber"),
            Some("Invalid PAN")
        );
    }

    #[test]
    fn test_identical_payload_twice_creates_two_records() {
        let p = pipeline();
        let a = p.submit(1, &step_one()).unwrap();
        let b = p.submit(1, &step_one()).unwrap();
        assert_ne!(a, b);
        assert_eq!(p.list(Some("s3cret")).unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_step_is_malformed() {
        let err = pipeline().submit(7, &step_one()).unwrap_err();
        assert!(matches!(err, SubmitError::MalformedRequest(ref m) if m.contains("unknown step")));
    }

    #[test]
    fn test_sink_failure_is_transport_failure() {
        let p = SubmissionPipeline::new(Arc::new(sample_schema()), Box::new(FailingSink))
            .with_admin_key(Some("k".to_string()));

        let err = p.submit(1, &step_one()).unwrap_err();
        assert!(matches!(err, SubmitError::TransportFailed(ref m) if m.contains("disk on fire")));

        let err = p.list(Some("k")).unwrap_err();
        assert!(matches!(err, SubmitError::TransportFailed(_)));
    }

    #[test]
    fn test_validation_precedes_sink() {
        let p = SubmissionPipeline::new(Arc::new(sample_schema()), Box::new(FailingSink));
        let err = p.submit(1, &FormData::new()).unwrap_err();
        assert!(matches!(err, SubmitError::ValidationFailed(_)));
    }

    #[test]
    fn test_list_requires_matching_key() {
        let p = pipeline();
        p.submit(1, &step_one()).unwrap();

        assert_eq!(p.list(None).unwrap_err(), SubmitError::AuthorizationFailed);
        assert_eq!(p.list(Some("wrong")).unwrap_err(), SubmitError::AuthorizationFailed);
        assert_eq!(p.list(Some("")).unwrap_err(), SubmitError::AuthorizationFailed);
        assert_eq!(p.list(Some("s3cret")).unwrap().len(), 1);
    }

    #[test]
    fn test_list_without_configured_key_is_refused() {
        let p = SubmissionPipeline::new(Arc::new(sample_schema()), Box::new(MemorySink::new()));
        assert!(!p.has_admin_key());
        assert_eq!(p.list(None).unwrap_err(), SubmitError::AuthorizationFailed);
        assert_eq!(p.list(Some("anything")).unwrap_err(), SubmitError::AuthorizationFailed);

        let p = p.with_admin_key(Some(String::new()));
        assert_eq!(p.list(Some("")).unwrap_err(), SubmitError::AuthorizationFailed);
    }

    #[test]
    fn test_submit_request_decoding() {
        let p = pipeline();
        assert!(p
            .submit_request(&json!({"step": 1, "data": step_one()}))
            .is_ok());

        for bad in [
            json!({}),
            json!({"step": 1}),
            json!({"data": {}}),
            json!({"step": 0, "data": {}}),
            json!({"step": -1, "data": {}}),
            json!({"step": "1", "data": {}}),
            json!({"step": 1.5, "data": {}}),
            json!({"step": 1, "data": []}),
            json!([1, 2]),
        ] {
            let err = p.submit_request(&bad).unwrap_err();
            assert_eq!(
                err,
                SubmitError::MalformedRequest(MISSING_STEP_OR_DATA.to_string()),
                "body {}",
                bad
            );
        }
    }

    #[test]
    fn test_submitter_trait_object() {
        let p = pipeline();
        let submitter: &dyn Submitter = &p;
        assert!(submitter.submit(1, &step_one()).is_ok());
    }
}
