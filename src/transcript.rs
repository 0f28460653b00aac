//! Transcript: the append-only conversation log renderers draw from.

use serde::{Deserialize, Serialize};

/// One line of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranscriptEntry {
    /// A question prompt or a system message.
    Bot {
        text: String,
        /// Catalog index when this entry poses a question. Renderers key
        /// decorations off it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        question: Option<usize>,
    },
    /// What the user typed, trimmed, before coercion.
    User { text: String },
    /// Final estimate, two decimal places.
    Result { price: String },
}

impl TranscriptEntry {
    pub fn bot(text: impl Into<String>) -> Self {
        Self::Bot {
            text: text.into(),
            question: None,
        }
    }

    pub fn question(index: usize, text: impl Into<String>) -> Self {
        Self::Bot {
            text: text.into(),
            question: Some(index),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    pub fn result(price: impl Into<String>) -> Self {
        Self::Result {
            price: price.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }

    /// Catalog index of a question prompt.
    pub fn question_index(&self) -> Option<usize> {
        match self {
            Self::Bot { question, .. } => *question,
            _ => None,
        }
    }
}

/// Ordered log of entries. Only [`Transcript::push`] and
/// [`Transcript::restart`] mutate it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// A transcript holding a single opening entry.
    pub fn starting_with(entry: TranscriptEntry) -> Self {
        Self {
            entries: vec![entry],
        }
    }

    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    /// Drop everything and start over from `entry`.
    pub fn restart(&mut self, entry: TranscriptEntry) {
        self.entries.clear();
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TranscriptEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_serialize_with_type_tag() {
        let bot = serde_json::to_value(TranscriptEntry::question(2, "What year?")).unwrap();
        assert_eq!(
            bot,
            serde_json::json!({"type": "bot", "text": "What year?", "question": 2})
        );

        let greeting = serde_json::to_value(TranscriptEntry::bot("Hi")).unwrap();
        assert_eq!(greeting, serde_json::json!({"type": "bot", "text": "Hi"}));

        let user = serde_json::to_value(TranscriptEntry::user("2018")).unwrap();
        assert_eq!(user, serde_json::json!({"type": "user", "text": "2018"}));

        let result = serde_json::to_value(TranscriptEntry::result("5.23")).unwrap();
        assert_eq!(result, serde_json::json!({"type": "result", "price": "5.23"}));
    }

    #[test]
    fn push_preserves_order() {
        let mut transcript = Transcript::starting_with(TranscriptEntry::bot("Hi"));
        transcript.push(TranscriptEntry::question(0, "Brand?"));
        transcript.push(TranscriptEntry::user("Maruti"));

        let kinds: Vec<bool> = transcript.iter().map(TranscriptEntry::is_user).collect();
        assert_eq!(kinds, [false, false, true]);
        assert_eq!(transcript.last(), Some(&TranscriptEntry::user("Maruti")));
    }

    #[test]
    fn restart_leaves_single_entry() {
        let mut transcript = Transcript::starting_with(TranscriptEntry::bot("Hi"));
        transcript.push(TranscriptEntry::user("Maruti"));
        transcript.push(TranscriptEntry::result("1.00"));

        transcript.restart(TranscriptEntry::bot("Hi again"));
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.entries(), [TranscriptEntry::bot("Hi again")]);
    }

    #[test]
    fn question_index_only_on_prompts() {
        assert_eq!(TranscriptEntry::question(4, "Owners?").question_index(), Some(4));
        assert_eq!(TranscriptEntry::bot("Hi").question_index(), None);
        assert_eq!(TranscriptEntry::user("4").question_index(), None);
    }
}
