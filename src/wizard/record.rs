//! Answer record: typed answers keyed by question.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

use crate::catalog::FieldKind;

/// Largest integer an `f64` holds exactly.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// A coerced answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(f64),
    Text(String),
}

impl AnswerValue {
    /// Coerce trimmed user input according to the field kind.
    ///
    /// Numeric parsing is permissive: anything that does not parse becomes
    /// NaN and is sent as JSON `null`, leaving rejection to the valuation
    /// service.
    pub fn coerce(kind: FieldKind, input: &str) -> Self {
        match kind {
            FieldKind::Text => Self::Text(input.to_string()),
            FieldKind::Number => Self::Number(input.parse::<f64>().unwrap_or(f64::NAN)),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl Serialize for AnswerValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::Number(n) if !n.is_finite() => serializer.serialize_none(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INT => {
                serializer.serialize_i64(*n as i64)
            }
            Self::Number(n) => serializer.serialize_f64(*n),
        }
    }
}

/// Answers collected so far, keyed by catalog key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerRecord {
    answers: BTreeMap<String, AnswerValue>,
}

impl AnswerRecord {
    /// Store an answer, replacing any earlier one for the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: AnswerValue) {
        self.answers.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&AnswerValue> {
        self.answers.get(key)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn clear(&mut self) {
        self.answers.clear();
    }
}
