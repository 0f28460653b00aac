//! Wizard engine: synchronous transition functions over the wizard state.
//!
//! Every method here is instantaneous. Pacing delays and the valuation call
//! happen between calls, in [`super::session::WizardSession`]; the engine only
//! hands out a [`Generation`] so that late completions from before a reset are
//! recognised and dropped.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::record::{AnswerRecord, AnswerValue};
use super::state::WizardState;
use crate::catalog::{Catalog, FieldDescriptor};
use crate::config::{FAILURE_MESSAGE, GREETING, PacingConfig};
use crate::error::GatewayError;
use crate::gateway::Estimate;
use crate::transcript::{Transcript, TranscriptEntry};

/// Placeholder shown once there is no question left to answer.
pub const COMPLETE_PLACEHOLDER: &str = "Chat complete";

/// Identifies one conversation between two resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Generation(u64);

/// Why an answer was not taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Input was empty after trimming.
    Blank,
    /// A pacing step or the valuation call is in progress.
    Busy,
    /// The estimate is already shown; reset first.
    Done,
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank => write!(f, "blank"),
            Self::Busy => write!(f, "busy"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// What [`Wizard::accept`] did with an answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Accepted {
    Ignored(IgnoreReason),
    /// Answer stored; call [`Wizard::complete_advance`] after the advance delay.
    Advancing { generation: Generation, next: usize },
    /// Final answer stored; `record` goes to the valuation service and the
    /// outcome back through [`Wizard::complete_submission`].
    Submit {
        generation: Generation,
        record: AnswerRecord,
    },
}

/// Read-only view handed to renderers.
#[derive(Debug, Clone, Serialize)]
pub struct WizardSnapshot {
    pub session_id: Uuid,
    pub state: WizardState,
    pub busy: bool,
    pub done: bool,
    pub current_index: Option<usize>,
    pub placeholder: String,
    pub transcript: Transcript,
    pub record: AnswerRecord,
}

/// The question-and-answer state machine.
#[derive(Debug)]
pub struct Wizard {
    catalog: Arc<Catalog>,
    pacing: PacingConfig,
    state: WizardState,
    record: AnswerRecord,
    transcript: Transcript,
    /// Question whose prompt is due but not yet posted.
    pending_prompt: Option<usize>,
    generation: u64,
    session_id: Uuid,
}

impl Wizard {
    pub fn new(catalog: Arc<Catalog>, pacing: PacingConfig) -> Self {
        Self {
            catalog,
            pacing,
            state: WizardState::default(),
            record: AnswerRecord::default(),
            transcript: Transcript::starting_with(TranscriptEntry::bot(GREETING)),
            pending_prompt: Some(0),
            generation: 0,
            session_id: Uuid::new_v4(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn pacing(&self) -> PacingConfig {
        self.pacing
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn record(&self) -> &AnswerRecord {
        &self.record
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn generation(&self) -> Generation {
        Generation(self.generation)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn current_index(&self) -> Option<usize> {
        self.state.index()
    }

    pub fn current_field(&self) -> Option<&FieldDescriptor> {
        self.current_index().and_then(|i| self.catalog.get(i))
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    pub fn pending_prompt(&self) -> Option<usize> {
        self.pending_prompt
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        WizardSnapshot {
            session_id: self.session_id,
            state: self.state,
            busy: self.is_busy(),
            done: self.is_done(),
            current_index: self.current_index(),
            placeholder: self
                .current_field()
                .map(|f| f.placeholder.clone())
                .unwrap_or_else(|| COMPLETE_PLACEHOLDER.to_string()),
            transcript: self.transcript.clone(),
            record: self.record.clone(),
        }
    }

    /// Post the prompt for question `index` if it is still due in this
    /// generation. Returns whether an entry was appended.
    pub fn reveal_prompt(&mut self, generation: Generation, index: usize) -> bool {
        if generation != self.generation() || self.pending_prompt != Some(index) {
            return false;
        }
        self.post_pending_prompt();
        true
    }

    fn post_pending_prompt(&mut self) {
        let Some(index) = self.pending_prompt.take() else {
            return;
        };
        if let Some(field) = self.catalog.get(index) {
            debug!(session_id = %self.session_id, index, key = %field.key, "Posting prompt");
            self.transcript
                .push(TranscriptEntry::question(index, field.prompt.clone()));
        }
    }

    /// Take the user's answer to the current question.
    pub fn accept(&mut self, raw: &str) -> Accepted {
        let text = raw.trim();
        if text.is_empty() {
            return Accepted::Ignored(IgnoreReason::Blank);
        }
        let index = match self.state {
            WizardState::Collecting { index } | WizardState::Failed { index } => index,
            WizardState::Advancing { .. } | WizardState::Submitting => {
                return Accepted::Ignored(IgnoreReason::Busy);
            }
            WizardState::Completed => return Accepted::Ignored(IgnoreReason::Done),
        };
        let Some(field) = self.catalog.get(index) else {
            return Accepted::Ignored(IgnoreReason::Done);
        };
        let (key, kind) = (field.key.clone(), field.kind);

        // An answer typed before its prompt appeared still belongs under it.
        self.post_pending_prompt();

        self.transcript.push(TranscriptEntry::user(text));
        self.record.insert(key.clone(), AnswerValue::coerce(kind, text));
        debug!(session_id = %self.session_id, index, key = %key, %kind, "Answer recorded");

        if index < self.catalog.last_index() {
            self.transition(WizardState::Advancing {
                index,
                delay_ms: self.pacing.advance_delay.as_millis() as u64,
            });
            Accepted::Advancing {
                generation: self.generation(),
                next: index + 1,
            }
        } else {
            self.transition(WizardState::Submitting);
            Accepted::Submit {
                generation: self.generation(),
                record: self.record.clone(),
            }
        }
    }

    /// Finish an advance once its delay has passed. The next prompt becomes
    /// due. Returns false for a stale generation.
    pub fn complete_advance(&mut self, generation: Generation) -> bool {
        if generation != self.generation() {
            return false;
        }
        let WizardState::Advancing { index, .. } = self.state else {
            return false;
        };
        self.transition(WizardState::Collecting { index: index + 1 });
        self.pending_prompt = Some(index + 1);
        true
    }

    /// Apply the valuation outcome. Returns false for a stale generation.
    ///
    /// Success shows the estimate and completes. Failure posts the failure
    /// message and returns to the final question, whose prompt becomes due
    /// again; earlier answers are kept.
    pub fn complete_submission(
        &mut self,
        generation: Generation,
        outcome: Result<Estimate, GatewayError>,
    ) -> bool {
        if generation != self.generation() || self.state != WizardState::Submitting {
            return false;
        }
        match outcome {
            Ok(estimate) => {
                let price = estimate.formatted();
                info!(session_id = %self.session_id, price = %price, "Valuation shown");
                self.transcript.push(TranscriptEntry::result(price));
                self.transition(WizardState::Completed);
            }
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Valuation failed");
                let last = self.catalog.last_index();
                self.transcript.push(TranscriptEntry::bot(FAILURE_MESSAGE));
                self.transition(WizardState::Failed { index: last });
                self.pending_prompt = Some(last);
            }
        }
        true
    }

    /// Start over: fresh record, greeting-only transcript, first question due.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.session_id = Uuid::new_v4();
        self.record.clear();
        self.transcript.restart(TranscriptEntry::bot(GREETING));
        self.state = WizardState::default();
        self.pending_prompt = Some(0);
        info!(session_id = %self.session_id, "Wizard reset");
    }

    fn transition(&mut self, target: WizardState) {
        debug_assert!(
            self.state.can_transition_to(target),
            "invalid wizard transition {:?} -> {:?}",
            self.state,
            target
        );
        info!(session_id = %self.session_id, from = %self.state, to = %target, "Wizard transition");
        self.state = target;
    }
}
