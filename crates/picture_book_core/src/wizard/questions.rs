//! crates/picture_book_core/src/wizard/questions.rs
//!
//! The question step. Answers accumulate locally while the user pages through
//! the questions and are sent to the backend only after the last one.

use std::collections::HashMap;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::domain::Question;
use crate::error::WizardError;
use crate::ports::{PortError, StoryBackendService};
use crate::wizard::routes;

/// Where the question flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Answering(usize),
    Submitting,
    Completed,
}

impl FlowState {
    pub fn label(&self) -> &'static str {
        match self {
            FlowState::Idle => "idle",
            FlowState::Answering(_) => "answering",
            FlowState::Submitting => "submitting",
            FlowState::Completed => "completed",
        }
    }
}

/// What a successful "next" did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOutcome {
    /// Moved to the given question without touching the network.
    Advanced(usize),
    /// The last question was answered; the flow is now `Submitting`.
    ReadyToSubmit,
}

#[derive(Debug, Clone, Default)]
pub struct QuestionFlow {
    questions: Vec<Question>,
    answers: HashMap<String, String>,
    current_answer: String,
    state: FlowState,
    last_error: Option<String>,
}

impl Default for FlowState {
    fn default() -> Self {
        FlowState::Idle
    }
}

impl QuestionFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a freshly fetched question list and returns to the first question.
    /// Answers already given for fields that still exist are kept.
    pub fn load(&mut self, questions: Vec<Question>) {
        self.questions = questions;
        self.last_error = None;
        self.state = if self.questions.is_empty() {
            FlowState::Idle
        } else {
            FlowState::Answering(0)
        };
        self.refresh_current_answer();
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn is_loaded(&self) -> bool {
        !self.questions.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            FlowState::Answering(i) => Some(i),
            FlowState::Submitting | FlowState::Completed => self.questions.len().checked_sub(1),
            FlowState::Idle => None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_index().and_then(|i| self.questions.get(i))
    }

    pub fn current_answer(&self) -> &str {
        &self.current_answer
    }

    pub fn stored_answer(&self, field: &str) -> Option<&str> {
        self.answers.get(field).map(String::as_str)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Edits the answer shown for the current question. Not stored until "next".
    pub fn set_answer(&mut self, value: impl Into<String>) -> Result<(), WizardError> {
        match self.state {
            FlowState::Answering(_) => {
                self.current_answer = value.into();
                Ok(())
            }
            FlowState::Idle => Err(WizardError::NoQuestions),
            _ => Err(WizardError::InvalidState("answers are locked while submitting")),
        }
    }

    /// Steps back one question; stays put on the first one.
    pub fn previous(&mut self) -> Result<usize, WizardError> {
        match self.state {
            FlowState::Answering(i) => {
                let target = i.saturating_sub(1);
                self.state = FlowState::Answering(target);
                self.refresh_current_answer();
                Ok(target)
            }
            FlowState::Idle => Ok(0),
            _ => Err(WizardError::InvalidState("cannot go back while submitting")),
        }
    }

    /// Stores the current answer and moves forward.
    ///
    /// A required question with an empty answer blocks without advancing.
    /// On the last question the flow enters `Submitting`.
    pub fn next(&mut self) -> Result<NextOutcome, WizardError> {
        let index = match self.state {
            FlowState::Answering(i) => i,
            FlowState::Idle => return Err(WizardError::NoQuestions),
            _ => return Err(WizardError::InvalidState("already submitting")),
        };
        let question = &self.questions[index];

        if question.required && self.current_answer.trim().is_empty() {
            return Err(WizardError::AnswerRequired {
                field: question.field.clone(),
            });
        }

        self.answers
            .insert(question.field.clone(), self.current_answer.clone());

        if index + 1 < self.questions.len() {
            self.state = FlowState::Answering(index + 1);
            self.refresh_current_answer();
            Ok(NextOutcome::Advanced(index + 1))
        } else {
            self.state = FlowState::Submitting;
            self.last_error = None;
            Ok(NextOutcome::ReadyToSubmit)
        }
    }

    /// Non-empty answers in question order, then any answers for fields no longer asked.
    pub fn pending_answers(&self) -> Vec<(String, String)> {
        let mut ordered: Vec<(String, String)> = self
            .questions
            .iter()
            .filter_map(|q| {
                self.answers
                    .get(&q.field)
                    .filter(|a| !a.trim().is_empty())
                    .map(|a| (q.field.clone(), a.clone()))
            })
            .collect();

        let mut extra: Vec<(String, String)> = self
            .answers
            .iter()
            .filter(|(field, answer)| {
                !answer.trim().is_empty() && !self.questions.iter().any(|q| &q.field == *field)
            })
            .map(|(f, a)| (f.clone(), a.clone()))
            .collect();
        extra.sort();
        ordered.extend(extra);
        ordered
    }

    /// Applies the result of sending the answers: `Completed` on success,
    /// otherwise back to the last question with the error shown.
    pub fn finish_submission(
        &mut self,
        result: Result<Vec<String>, WizardError>,
    ) -> Result<SubmitOutcome, WizardError> {
        match result {
            Ok(submitted_fields) => {
                self.state = FlowState::Completed;
                Ok(SubmitOutcome {
                    submitted_fields,
                    next: routes::STORY_THEME.to_string(),
                })
            }
            Err(e) => {
                let last = self.questions.len().saturating_sub(1);
                self.state = FlowState::Answering(last);
                self.last_error = Some(e.to_string());
                self.refresh_current_answer();
                Err(e)
            }
        }
    }

    fn refresh_current_answer(&mut self) {
        self.current_answer = self
            .current_question()
            .and_then(|q| self.answers.get(&q.field))
            .cloned()
            .unwrap_or_default();
    }

    pub fn view(&self) -> QuestionView {
        let index = self.current_index();
        QuestionView {
            state: self.state.label(),
            current_index: index,
            total: self.questions.len(),
            question: self.current_question().cloned(),
            current_answer: self.current_answer.clone(),
            is_last: index.map(|i| i + 1 == self.questions.len()).unwrap_or(false),
            error: self.last_error.clone(),
        }
    }
}

/// Snapshot rendered by the question page, including the progress-dot position.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuestionView {
    pub state: &'static str,
    pub current_index: Option<usize>,
    pub total: usize,
    pub question: Option<Question>,
    pub current_answer: String,
    pub is_last: bool,
    pub error: Option<String>,
}

/// Result of a successful submission.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubmitOutcome {
    pub submitted_fields: Vec<String>,
    pub next: String,
}

/// Sends every pending answer, one request per field and in order, then starts
/// story generation.
///
/// The flow must be `Submitting`. On failure or cancellation it returns to the
/// last question so the user can retry.
pub async fn submit_answers(
    flow: &mut QuestionFlow,
    backend: &dyn StoryBackendService,
    story_setting_id: i64,
    cancel: &CancellationToken,
) -> Result<SubmitOutcome, WizardError> {
    if flow.state() != FlowState::Submitting {
        return Err(WizardError::InvalidState("nothing to submit"));
    }
    let result = send_answers(flow.pending_answers(), backend, story_setting_id, cancel).await;
    flow.finish_submission(result)
}

/// The network half of a submission. Holds no reference to the flow, so
/// callers can release the flow while the requests are in flight and apply the
/// result with [`QuestionFlow::finish_submission`].
pub async fn send_answers(
    answers: Vec<(String, String)>,
    backend: &dyn StoryBackendService,
    story_setting_id: i64,
    cancel: &CancellationToken,
) -> Result<Vec<String>, WizardError> {
    let mut submitted = Vec::new();

    for (field, answer) in answers {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(story_setting_id, "Answer submission cancelled");
                return Err(WizardError::Cancelled);
            }
            result = backend.submit_answer(story_setting_id, &field, &answer) => {
                result.map_err(|e| {
                    error!("Failed to submit answer for field '{}': {:?}", field, e);
                    to_submit_error(e)
                })?;
            }
        }
        submitted.push(field);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!(story_setting_id, "Story generation trigger cancelled");
            Err(WizardError::Cancelled)
        }
        result = backend.start_story_generation(story_setting_id) => {
            result.map_err(|e| {
                error!("Failed to trigger story generation: {:?}", e);
                to_submit_error(e)
            })?;
            info!(story_setting_id, count = submitted.len(), "All answers submitted");
            Ok(submitted)
        }
    }
}

fn to_submit_error(e: PortError) -> WizardError {
    match e {
        PortError::Cancelled => WizardError::Cancelled,
        other => WizardError::SubmitFailed(other),
    }
}
