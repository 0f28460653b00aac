//! Wizard: the question-by-question valuation conversation.
//!
//! The wizard walks the catalog one question at a time, coerces each answer
//! into the record, hands the completed record to the valuation gateway and
//! shows the estimate. A failed valuation sends the user back to the final
//! question only. `Wizard` holds the synchronous state machine;
//! `WizardSession` adds pacing, the gateway call and change broadcasts.

pub mod engine;
pub mod record;
pub mod session;
pub mod state;

pub use engine::{Accepted, Generation, IgnoreReason, Wizard, WizardSnapshot};
pub use record::{AnswerRecord, AnswerValue};
pub use session::{PendingStep, SubmitOutcome, WizardEvent, WizardSession};
pub use state::WizardState;
