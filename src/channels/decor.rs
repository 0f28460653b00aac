//! Terminal decorations. Icons are looked up by question index so the
//! catalog itself stays free of presentation.

use crate::transcript::TranscriptEntry;

/// Icons for the vehicle catalog, by question index.
const QUESTION_ICONS: [&str; 9] = ["🏢", "🚙", "📅", "🛣️", "👤", "⛽", "⚙️", "🔧", "💺"];

/// Icon for bot entries that are not question prompts.
pub const BOT_ICON: &str = "🤖";

pub fn icon_for(question: Option<usize>) -> &'static str {
    question
        .and_then(|i| QUESTION_ICONS.get(i).copied())
        .unwrap_or(BOT_ICON)
}

/// Render one transcript entry as a terminal line.
pub fn render_entry(entry: &TranscriptEntry) -> String {
    match entry {
        TranscriptEntry::Bot { text, question } => format!("{} {text}", icon_for(*question)),
        TranscriptEntry::User { text } => format!("   you: {text}"),
        TranscriptEntry::Result { price } => {
            format!("💰 Estimated Price: ₹{price} Lakhs")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_prompts_get_their_icon() {
        let entry = TranscriptEntry::question(5, "Fuel type?");
        assert_eq!(render_entry(&entry), "⛽ Fuel type?");
    }

    #[test]
    fn system_messages_get_bot_icon() {
        let entry = TranscriptEntry::bot("Error occurred. Please try again.");
        assert_eq!(render_entry(&entry), "🤖 Error occurred. Please try again.");
    }

    #[test]
    fn out_of_range_question_falls_back() {
        assert_eq!(icon_for(Some(42)), BOT_ICON);
        assert_eq!(icon_for(None), BOT_ICON);
    }

    #[test]
    fn result_shows_price_in_lakhs() {
        let line = render_entry(&TranscriptEntry::result("5.23"));
        assert_eq!(line, "💰 Estimated Price: ₹5.23 Lakhs");
    }

    #[test]
    fn user_entries_are_indented() {
        assert_eq!(render_entry(&TranscriptEntry::user("Maruti")), "   you: Maruti");
    }
}
