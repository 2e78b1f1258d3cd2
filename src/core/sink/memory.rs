//! In-memory record sink

use chrono::Utc;
use parking_lot::Mutex;

use super::{RecordSink, SinkError, Submission};
use crate::core::identity::SubmissionId;
use crate::schema::FormData;

/// Keeps submissions in insertion order for the life of the process
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Submission>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl RecordSink for MemorySink {
    fn create(&self, step: u32, data: &FormData) -> Result<Submission, SinkError> {
        let submission = Submission {
            id: SubmissionId::new(),
            step,
            data: data.clone(),
            created_at: Utc::now(),
        };
        self.records.lock().push(submission.clone());
        Ok(submission)
    }

    fn list(&self) -> Result<Vec<Submission>, SinkError> {
        Ok(self.records.lock().iter().rev().cloned().collect())
    }
}
