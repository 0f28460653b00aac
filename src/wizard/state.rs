//! Wizard state machine: where the conversation currently is.

use serde::{Deserialize, Serialize};

/// The states of the wizard.
///
/// Progresses Collecting(0) → Advancing(0) → Collecting(1) → … →
/// Collecting(last) → Submitting → Completed. A failed submission lands in
/// `Failed(last)`, which takes input exactly like `Collecting(last)`.
/// `reset` is valid from every state and is not modelled as a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WizardState {
    /// Waiting for the answer to question `index`.
    Collecting { index: usize },
    /// Answer to `index` accepted; moving on after `delay_ms`.
    Advancing { index: usize, delay_ms: u64 },
    /// Completed record is with the valuation service.
    Submitting,
    /// Estimate received and shown.
    Completed,
    /// Valuation failed; waiting for the final answer again.
    Failed { index: usize },
}

impl Default for WizardState {
    fn default() -> Self {
        Self::Collecting { index: 0 }
    }
}

impl WizardState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: WizardState) -> bool {
        use WizardState::*;
        match (*self, target) {
            (Collecting { index: from } | Failed { index: from }, Advancing { index: to, .. }) => {
                from == to
            }
            (Collecting { .. } | Failed { .. }, Submitting) => true,
            (Advancing { index: from, .. }, Collecting { index: to }) => to == from + 1,
            (Submitting, Completed) | (Submitting, Failed { .. }) => true,
            _ => false,
        }
    }

    /// Question index, while one is meaningful.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Collecting { index } | Self::Advancing { index, .. } | Self::Failed { index } => {
                Some(*index)
            }
            Self::Submitting | Self::Completed => None,
        }
    }

    /// A step is in progress; input must be disabled.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Advancing { .. } | Self::Submitting)
    }

    /// The estimate has been shown; only reset is meaningful.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for WizardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Collecting { .. } => "collecting",
            Self::Advancing { .. } => "advancing",
            Self::Submitting => "submitting",
            Self::Completed => "completed",
            Self::Failed { .. } => "failed",
        };
        write!(f, "{s}")
    }
}
