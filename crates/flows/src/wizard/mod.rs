//! Linear multi-step form controller shared by the registration and booking
//! wizards.
//!
//! A wizard moves forward one step at a time, and only when the current
//! step's required fields are filled. The confirmation step, for wizards that
//! have one, is reached only through a successful submit.

use std::fmt;

use async_trait::async_trait;
use client_core::ClientError;
use crossbeam_channel::Receiver;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    events::{EventHub, WizardEvent},
    feedback::{Notice, NoticeContext},
    validation::{self, RequiredField},
};

pub mod booking;
pub mod client_registration;
pub mod housekeeper_registration;

/// Describes one concrete wizard: its sections, how updates merge into them,
/// which fields each step requires and what gets submitted.
pub trait WizardSchema: Sized + 'static {
    type Sections: Default + Clone + fmt::Debug + Send + Sync;
    type Update: DeserializeOwned + fmt::Debug;
    type Submission: fmt::Debug + Send + Sync;
    type Receipt: Send;

    const NAME: &'static str;
    const TOTAL_STEPS: usize;
    /// Whether the last step is a read-only confirmation reached by submit.
    const HAS_CONFIRMATION: bool = true;

    fn required_fields(step: usize, sections: &Self::Sections) -> Vec<RequiredField<'_>>;

    fn apply(sections: &mut Self::Sections, update: Self::Update);

    fn submission(sections: &Self::Sections) -> Result<Self::Submission, WizardError>;

    fn notice_context() -> NoticeContext {
        NoticeContext::Registration
    }

    /// The last data-entry step, where submit is accepted.
    fn submit_step() -> usize {
        if Self::HAS_CONFIRMATION {
            Self::TOTAL_STEPS.saturating_sub(2)
        } else {
            Self::TOTAL_STEPS.saturating_sub(1)
        }
    }
}

/// Delivers a wizard's submission to the API.
#[async_trait]
pub trait SubmissionSink<S: WizardSchema>: Send + Sync {
    async fn deliver(&self, submission: &S::Submission) -> Result<S::Receipt, ClientError>;
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("submit is only available on step {expected} (currently on step {current})")]
    NotAtSubmitStep { current: usize, expected: usize },
    #[error("step {step} is missing required fields: {}", .missing.join(", "))]
    Incomplete {
        step: usize,
        missing: Vec<&'static str>,
    },
    #[error("a submission is already in flight")]
    AlreadySubmitting,
    #[error("no submission is in flight")]
    NotSubmitting,
    #[error("wizard already completed")]
    Completed,
    #[error("invalid section update: {0}")]
    InvalidUpdate(#[source] serde_json::Error),
    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("submission failed: {0}")]
    Submission(#[from] ClientError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepTransition {
    Moved { from: usize, to: usize },
    Blocked { missing: Vec<&'static str> },
    /// Already at the bound in that direction.
    Unchanged { step: usize },
    /// Submitting or completed.
    Locked,
}

impl StepTransition {
    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

pub struct WizardController<S: WizardSchema> {
    current_step: usize,
    sections: S::Sections,
    initial: S::Sections,
    is_submitting: bool,
    completed: bool,
    events: EventHub<WizardEvent>,
}

impl<S: WizardSchema> Default for WizardController<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: WizardSchema> fmt::Debug for WizardController<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardController")
            .field("wizard", &S::NAME)
            .field("current_step", &self.current_step)
            .field("is_submitting", &self.is_submitting)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

impl<S: WizardSchema> WizardController<S> {
    pub fn new() -> Self {
        Self::with_sections(S::Sections::default())
    }

    /// Starts from prefilled sections; `reset` returns to them.
    pub fn with_sections(initial: S::Sections) -> Self {
        Self {
            current_step: 0,
            sections: initial.clone(),
            initial,
            is_submitting: false,
            completed: false,
            events: EventHub::default(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<WizardEvent> {
        self.events.subscribe()
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        S::TOTAL_STEPS
    }

    pub fn sections(&self) -> &S::Sections {
        &self.sections
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn is_on_submit_step(&self) -> bool {
        self.current_step == S::submit_step()
    }

    /// Merges the set fields of `update` into its section. No validation
    /// happens here; a completed wizard ignores updates.
    pub fn update_section(&mut self, update: S::Update) {
        if self.completed {
            debug!(wizard = S::NAME, "ignoring update on completed wizard");
            return;
        }
        S::apply(&mut self.sections, update);
    }

    /// Accepts an untyped `{"section": ..., "data": {...}}` payload. Unknown
    /// sections or fields are rejected.
    pub fn update_section_json(&mut self, payload: serde_json::Value) -> Result<(), WizardError> {
        let update: S::Update =
            serde_json::from_value(payload).map_err(WizardError::InvalidUpdate)?;
        self.update_section(update);
        Ok(())
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        validation::missing_fields::<S>(self.current_step, &self.sections)
    }

    pub fn can_advance(&self) -> bool {
        validation::valid::<S>(self.current_step, &self.sections)
    }

    pub fn next(&mut self) -> StepTransition {
        if self.completed || self.is_submitting {
            return StepTransition::Locked;
        }
        let missing = self.missing_fields();
        if !missing.is_empty() {
            debug!(wizard = S::NAME, step = self.current_step, ?missing, "advance blocked");
            self.events.emit(WizardEvent::AdvanceBlocked {
                step: self.current_step,
                missing: missing.clone(),
            });
            return StepTransition::Blocked { missing };
        }
        if self.current_step >= S::submit_step() {
            return StepTransition::Unchanged {
                step: self.current_step,
            };
        }
        let from = self.current_step;
        self.current_step = (from + 1).min(S::TOTAL_STEPS - 1);
        debug!(wizard = S::NAME, from, to = self.current_step, "step advanced");
        self.events.emit(WizardEvent::StepAdvanced {
            from,
            to: self.current_step,
        });
        StepTransition::Moved {
            from,
            to: self.current_step,
        }
    }

    pub fn previous(&mut self) -> StepTransition {
        if self.completed || self.is_submitting {
            return StepTransition::Locked;
        }
        if self.current_step == 0 {
            return StepTransition::Unchanged { step: 0 };
        }
        let from = self.current_step;
        self.current_step = from - 1;
        self.events.emit(WizardEvent::StepReverted {
            from,
            to: self.current_step,
        });
        StepTransition::Moved {
            from,
            to: self.current_step,
        }
    }

    /// First half of a submit: checks the gate, marks the wizard as
    /// submitting and returns what must be sent.
    pub fn begin_submit(&mut self) -> Result<S::Submission, WizardError> {
        if self.completed {
            return Err(WizardError::Completed);
        }
        if self.is_submitting {
            return Err(WizardError::AlreadySubmitting);
        }
        let expected = S::submit_step();
        if self.current_step != expected {
            return Err(WizardError::NotAtSubmitStep {
                current: self.current_step,
                expected,
            });
        }
        let missing = self.missing_fields();
        if !missing.is_empty() {
            self.events.emit(WizardEvent::AdvanceBlocked {
                step: self.current_step,
                missing: missing.clone(),
            });
            return Err(WizardError::Incomplete {
                step: self.current_step,
                missing,
            });
        }
        let submission = S::submission(&self.sections)?;
        self.is_submitting = true;
        info!(wizard = S::NAME, step = self.current_step, "submitting");
        self.events.emit(WizardEvent::SubmitStarted {
            step: self.current_step,
        });
        Ok(submission)
    }

    /// Second half of a submit: applies the collaborator's answer.
    pub fn complete_submit<R>(&mut self, result: Result<R, ClientError>) -> Result<R, WizardError> {
        if !self.is_submitting {
            return Err(WizardError::NotSubmitting);
        }
        self.is_submitting = false;
        let step = self.current_step;
        match result {
            Ok(receipt) => {
                info!(wizard = S::NAME, step, "submission accepted");
                self.events.emit(WizardEvent::SubmitSucceeded { step });
                if S::HAS_CONFIRMATION {
                    self.current_step = (step + 1).min(S::TOTAL_STEPS - 1);
                    self.events.emit(WizardEvent::StepAdvanced {
                        from: step,
                        to: self.current_step,
                    });
                }
                self.completed = true;
                Ok(receipt)
            }
            Err(err) => {
                warn!(wizard = S::NAME, step, error = %err, "submission failed");
                let notice = Notice::from_client_error(S::notice_context(), &err);
                self.events.emit(WizardEvent::SubmitFailed { step, notice });
                Err(WizardError::Submission(err))
            }
        }
    }

    pub async fn submit<K>(&mut self, sink: &K) -> Result<S::Receipt, WizardError>
    where
        K: SubmissionSink<S> + ?Sized,
    {
        let submission = self.begin_submit()?;
        let result = sink.deliver(&submission).await;
        self.complete_submit(result)
    }

    pub fn reset(&mut self) {
        self.current_step = 0;
        self.sections = self.initial.clone();
        self.is_submitting = false;
        self.completed = false;
        self.events.emit(WizardEvent::Reset);
    }
}

/// Identity and contact block shared by both registration wizards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PersonalInfoPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl PersonalInfoPatch {
    pub(crate) fn merge_into(self, target: &mut PersonalInfo) {
        merge(&mut target.first_name, self.first_name);
        merge(&mut target.last_name, self.last_name);
        merge(&mut target.email, self.email);
        merge(&mut target.phone, self.phone);
        merge(&mut target.address, self.address);
    }
}

impl PersonalInfo {
    pub(crate) fn required_fields(&self) -> Vec<RequiredField<'_>> {
        vec![
            RequiredField::new("firstName", &self.first_name),
            RequiredField::new("lastName", &self.last_name),
            RequiredField::new("email", &self.email),
            RequiredField::new("phone", &self.phone),
            RequiredField::new("address", &self.address),
        ]
    }
}

pub(crate) fn merge<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

pub(crate) fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

pub(crate) fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub(crate) fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "../tests/wizard_tests.rs"]
mod tests;
