//! Multi-step form state machine
//!
//! [`FormState`] is a plain value with pure transitions: the caller owns it
//! and replaces it with whatever a transition returns. [`FormSession`] wraps
//! it with the per-step drafts needed to pre-populate steps on the way back
//! and to send every step's payload when the last step is accepted.
//!
//! ```text
//! Editing(0) --advance--> Editing(1) --advance--> ... Editing(last)
//!     ^                       |                           |
//!     +-------retreat---------+                       advance
//!                                                         v
//!            Editing(last) <--finish(failure)-- Submitting(last)
//!                                                         |
//!                                                  finish(success)
//!                                                         v
//!                                                     Submitted
//! ```

use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use crate::core::identity::SubmissionId;
use crate::core::pipeline::{SubmitError, Submitter};
use crate::schema::{FieldErrors, FormData, Schema, Step, StepValidator};

/// Where a form is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    /// User is filling in the step at `index` (0-based)
    Editing { index: usize },
    /// The last step was accepted and its submission is in flight
    Submitting { index: usize },
    /// Terminal
    Submitted,
}

/// Result of a successful call to [`FormState::advance`]
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Moved to the next step
    Moved(FormState),
    /// Validation failed; the state is unchanged
    Rejected(FieldErrors),
    /// The last step passed; the caller must dispatch the submission
    Finalize(FormState),
}

/// Transitions that are not allowed from the current state
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum NavigationError {
    #[error("already at the first step")]
    #[diagnostic(code(udyam::form::first_step))]
    AtFirstStep,

    #[error("a submission is in progress")]
    #[diagnostic(code(udyam::form::in_flight))]
    InFlight,

    #[error("the form has already been submitted")]
    #[diagnostic(code(udyam::form::submitted))]
    AlreadySubmitted,

    #[error("no submission is in progress")]
    #[diagnostic(code(udyam::form::not_submitting))]
    NotSubmitting,

    #[error("step index {index} is out of range (schema has {count} steps)")]
    #[diagnostic(code(udyam::form::out_of_range))]
    OutOfRange { index: usize, count: usize },
}

impl FormState {
    pub fn start() -> Self {
        FormState::Editing { index: 0 }
    }

    /// 0-based step index, if not yet submitted
    pub fn index(&self) -> Option<usize> {
        match self {
            FormState::Editing { index } | FormState::Submitting { index } => Some(*index),
            FormState::Submitted => None,
        }
    }

    /// Validate the current step and move forward
    pub fn advance(self, schema: &Schema, input: &FormData) -> Result<Transition, NavigationError> {
        let index = self.editing_index()?;
        let step = schema.step_at(index).ok_or(NavigationError::OutOfRange {
            index,
            count: schema.step_count(),
        })?;

        if let Err(errors) = StepValidator::build(step).validate(input) {
            return Ok(Transition::Rejected(errors));
        }

        if index + 1 < schema.step_count() {
            Ok(Transition::Moved(FormState::Editing { index: index + 1 }))
        } else {
            Ok(Transition::Finalize(FormState::Submitting { index }))
        }
    }

    /// Go back one step without validating
    pub fn retreat(self) -> Result<FormState, NavigationError> {
        match self.editing_index()? {
            0 => Err(NavigationError::AtFirstStep),
            index => Ok(FormState::Editing { index: index - 1 }),
        }
    }

    /// Settle an in-flight submission
    pub fn finish(self, succeeded: bool) -> Result<FormState, NavigationError> {
        match self {
            FormState::Submitting { .. } if succeeded => Ok(FormState::Submitted),
            FormState::Submitting { index } => Ok(FormState::Editing { index }),
            FormState::Editing { .. } => Err(NavigationError::NotSubmitting),
            FormState::Submitted => Err(NavigationError::AlreadySubmitted),
        }
    }

    fn editing_index(self) -> Result<usize, NavigationError> {
        match self {
            FormState::Editing { index } => Ok(index),
            FormState::Submitting { .. } => Err(NavigationError::InFlight),
            FormState::Submitted => Err(NavigationError::AlreadySubmitted),
        }
    }
}

/// Errors from driving a [`FormSession`]
#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Submit(#[from] SubmitError),
}

/// Outcome of [`FormSession::advance`]
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// Now editing the step at this index
    Moved(usize),
    /// The current step has errors; see [`FormSession::errors`]
    Rejected,
    /// All steps accepted; call [`FormSession::finalize`]
    ReadyToSubmit,
}

/// A form in progress: state plus the values entered for each step
pub struct FormSession {
    schema: Arc<Schema>,
    state: FormState,
    drafts: Vec<Option<FormData>>,
    /// Ids of steps already stored by an earlier finalize attempt
    stored: Vec<Option<SubmissionId>>,
    errors: Option<FieldErrors>,
    failure: Option<SubmitError>,
}

impl FormSession {
    pub fn new(schema: Arc<Schema>) -> Self {
        let drafts = vec![None; schema.step_count()];
        let stored = vec![None; schema.step_count()];
        Self {
            schema,
            state: FormState::start(),
            drafts,
            stored,
            errors: None,
            failure: None,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    /// Step definition for the current index
    pub fn current_step(&self) -> Option<&Step> {
        self.state.index().and_then(|i| self.schema.step_at(i))
    }

    /// Values last entered for the step at `index`
    pub fn draft(&self, index: usize) -> Option<&FormData> {
        self.drafts.get(index).and_then(Option::as_ref)
    }

    /// Field errors from the last rejected advance or submission
    pub fn errors(&self) -> Option<&FieldErrors> {
        self.errors.as_ref()
    }

    /// Failure from the last finalize attempt
    pub fn failure(&self) -> Option<&SubmitError> {
        self.failure.as_ref()
    }

    pub fn is_last_step(&self) -> bool {
        self.state
            .index()
            .map(|i| i + 1 == self.schema.step_count())
            .unwrap_or(false)
    }

    /// Record the input for the current step and try to move forward
    pub fn advance(&mut self, input: FormData) -> Result<Advance, NavigationError> {
        let transition = self.state.advance(&self.schema, &input)?;
        let index = self.state.index().unwrap_or(0);
        self.set_draft(index, input);

        match transition {
            Transition::Rejected(errors) => {
                self.errors = Some(errors);
                Ok(Advance::Rejected)
            }
            Transition::Moved(next) => {
                self.errors = None;
                self.state = next;
                Ok(Advance::Moved(next.index().unwrap_or(index + 1)))
            }
            Transition::Finalize(next) => {
                self.errors = None;
                self.failure = None;
                self.state = next;
                Ok(Advance::ReadyToSubmit)
            }
        }
    }

    /// Go back one step, keeping any unvalidated input as the current draft
    pub fn retreat(&mut self, input: Option<FormData>) -> Result<usize, NavigationError> {
        let previous = self.state.retreat()?;
        if let (Some(input), Some(index)) = (input, self.state.index()) {
            self.set_draft(index, input);
        }
        self.errors = None;
        self.state = previous;
        Ok(previous.index().unwrap_or(0))
    }

    /// Id stored for the step at `index` by an earlier finalize attempt
    pub fn stored_id(&self, index: usize) -> Option<SubmissionId> {
        self.stored.get(index).copied().flatten()
    }

    /// A changed draft must be stored again
    fn set_draft(&mut self, index: usize, input: FormData) {
        if self.drafts[index].as_ref() != Some(&input) {
            self.stored[index] = None;
        }
        self.drafts[index] = Some(input);
    }

    /// Step numbers and payloads in step order
    pub fn payloads(&self) -> Vec<(u32, FormData)> {
        self.schema
            .steps
            .iter()
            .zip(&self.drafts)
            .map(|(step, draft)| (step.step, draft.clone().unwrap_or_default()))
            .collect()
    }

    /// Submit every step's payload in order
    ///
    /// Each step becomes its own record. A failure part way leaves the
    /// earlier records stored and returns the form to the last step; a
    /// retry only sends the steps that were not stored (or changed since).
    pub fn finalize(&mut self, submitter: &dyn Submitter) -> Result<Vec<SubmissionId>, SessionError> {
        if !matches!(self.state, FormState::Submitting { .. }) {
            return Err(match self.state {
                FormState::Submitted => NavigationError::AlreadySubmitted,
                _ => NavigationError::NotSubmitting,
            }
            .into());
        }

        let mut ids = Vec::new();
        for (index, (step, data)) in self.payloads().into_iter().enumerate() {
            if let Some(id) = self.stored_id(index) {
                ids.push(id);
                continue;
            }
            match submitter.submit(step, &data) {
                Ok(id) => {
                    self.stored[index] = Some(id);
                    ids.push(id);
                }
                Err(e) => {
                    tracing::warn!(step, stored = ids.len(), error = %e, "form submission failed");
                    self.state = self.state.finish(false)?;
                    self.errors = e.field_errors().cloned();
                    self.failure = Some(e.clone());
                    return Err(e.into());
                }
            }
        }

        self.state = self.state.finish(true)?;
        self.failure = None;
        Ok(ids)
    }
}
