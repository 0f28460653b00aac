//! Parses a line of chat input into a command or an answer.

/// One line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// An answer to the current question (untrimmed; the wizard trims).
    Answer(String),
    /// Start a new conversation.
    NewChat,
    /// List past valuations from the service.
    History,
    /// Check the valuation service.
    Health,
    Help,
    Quit,
}

impl ChatCommand {
    /// Parse a line. Commands are case-insensitive; anything that is not a
    /// known command, including unknown `/words`, is an answer.
    pub fn parse(line: &str) -> Self {
        let lower = line.trim().to_lowercase();
        match lower.as_str() {
            "/new" | "/reset" | "/restart" => Self::NewChat,
            "/history" => Self::History,
            "/health" | "/status" => Self::Health,
            "/help" | "/?" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            _ => Self::Answer(line.to_string()),
        }
    }
}

/// Shown for `/help`.
pub const HELP_TEXT: &str = "\
Answer each question and press Enter.
  /new       start a new valuation
  /history   list past valuations
  /health    check the valuation service
  /quit      exit";
