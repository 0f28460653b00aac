//! CLI channel: stdin/stdout chat renderer for the wizard.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use super::command::{ChatCommand, HELP_TEXT};
use super::decor::render_entry;
use crate::catalog::Catalog;
use crate::error::HostError;
use crate::gateway::HttpGateway;
use crate::transcript::TranscriptEntry;
use crate::wizard::{IgnoreReason, WizardEvent, WizardSession, WizardSnapshot, WizardState};

/// How many past valuations `/history` lists.
const HISTORY_LIMIT: usize = 10;

/// Whether the input loop keeps going.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Terminal host: reads answers from stdin, prints the transcript as it grows.
pub struct CliChannel {
    session: Arc<WizardSession>,
    /// Prediction service client for `/history` and `/health`.
    service: Option<Arc<HttpGateway>>,
}

impl CliChannel {
    pub fn new(session: Arc<WizardSession>, service: Option<Arc<HttpGateway>>) -> Self {
        Self { session, service }
    }

    /// Run until `/quit` or EOF.
    pub async fn run(&self) -> Result<(), HostError> {
        let renderer = tokio::spawn(render_events(Arc::clone(&self.session)));

        for entry in self.session.snapshot().await.transcript.iter() {
            println!("{}", render_entry(entry));
        }
        if self.service.is_some() {
            self.check_health(false).await;
        }
        self.session.start().await;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let result = loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break Ok(()),
                Err(e) => {
                    tracing::error!("Error reading stdin: {}", e);
                    break Err(HostError::Io(e));
                }
            };

            if let Flow::Quit = self.dispatch(ChatCommand::parse(&line)).await {
                break Ok(());
            }
        };

        renderer.abort();
        result
    }

    /// Handle one parsed line. Never waits on pacing or the valuation call.
    async fn dispatch(&self, command: ChatCommand) -> Flow {
        match command {
            ChatCommand::Quit => return Flow::Quit,
            ChatCommand::Help => println!("{HELP_TEXT}"),
            ChatCommand::NewChat => {
                self.session.reset().await;
                let session = Arc::clone(&self.session);
                tokio::spawn(async move { session.start().await });
            }
            ChatCommand::History => self.print_history().await,
            ChatCommand::Health => self.check_health(true).await,
            ChatCommand::Answer(text) => {
                if let Err(reason) = self.answer(&text).await {
                    if let Some(note) = ignore_note(reason) {
                        eprintln!("{note}");
                    }
                }
            }
        }
        Flow::Continue
    }

    /// Accept an answer and let the rest of the step run in the background.
    async fn answer(&self, text: &str) -> Result<(), IgnoreReason> {
        let step = self.session.begin(text).await?;
        let session = Arc::clone(&self.session);
        tokio::spawn(async move {
            let outcome = session.finish(step).await;
            tracing::debug!(?outcome, "CLI step finished");
        });
        Ok(())
    }

    async fn check_health(&self, verbose: bool) {
        let Some(service) = &self.service else {
            eprintln!("ℹ️  No valuation service configured");
            return;
        };
        match service.health().await {
            Ok(health) if health.ok => {
                if verbose {
                    eprintln!(
                        "✅ Valuation service at {} is up ({} features)",
                        service.base_url(),
                        health.features.len()
                    );
                }
            }
            Ok(_) => eprintln!("⚠️  Valuation service at {} reports not ok", service.base_url()),
            Err(e) => eprintln!("⚠️  Valuation service unreachable: {e}"),
        }
    }

    async fn print_history(&self) {
        let Some(service) = &self.service else {
            eprintln!("ℹ️  No valuation service configured");
            return;
        };
        match service.history().await {
            Ok(predictions) if predictions.is_empty() => println!("No valuations yet."),
            Ok(predictions) => {
                let skip = predictions.len().saturating_sub(HISTORY_LIMIT);
                for prediction in &predictions[skip..] {
                    println!("  {}", prediction.summary());
                }
            }
            Err(e) => eprintln!("⚠️  Could not fetch history: {e}"),
        }
    }
}

/// Print events until the session goes away.
async fn render_events(session: Arc<WizardSession>) {
    let mut rx = session.subscribe();
    let catalog = Arc::clone(session.catalog());
    loop {
        match rx.recv().await {
            Ok(event) => {
                for line in event_lines(&event, &catalog) {
                    println!("{line}");
                }
            }
            Err(RecvError::Lagged(n)) => {
                tracing::warn!(missed = n, "CLI renderer lagged behind wizard events");
                let snapshot = session.snapshot().await;
                for line in transcript_lines("── Catching up ──", &snapshot, &catalog) {
                    println!("{line}");
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Terminal lines for one event. User entries are skipped because the
/// terminal already echoed what was typed.
pub fn event_lines(event: &WizardEvent, catalog: &Catalog) -> Vec<String> {
    match event {
        WizardEvent::EntryAppended { entry } => entry_lines(entry, catalog),
        WizardEvent::StateChanged {
            state: WizardState::Submitting,
            ..
        } => vec!["⏳ Estimating your car's price...".to_string()],
        WizardEvent::StateChanged {
            state: WizardState::Completed,
            ..
        } => vec!["   Type /new to value another car.".to_string()],
        WizardEvent::StateChanged { .. } => Vec::new(),
        WizardEvent::Sync { snapshot } => transcript_lines("── New chat ──", snapshot, catalog),
    }
}

/// A header followed by the whole transcript.
fn transcript_lines(header: &str, snapshot: &WizardSnapshot, catalog: &Catalog) -> Vec<String> {
    let mut lines = vec![header.to_string()];
    for entry in snapshot.transcript.iter() {
        lines.extend(entry_lines(entry, catalog));
    }
    lines
}

fn entry_lines(entry: &TranscriptEntry, catalog: &Catalog) -> Vec<String> {
    if entry.is_user() {
        return Vec::new();
    }
    let mut lines = vec![render_entry(entry)];
    if let Some(field) = entry.question_index().and_then(|i| catalog.get(i)) {
        lines.push(format!("   ({})", field.placeholder));
    }
    lines
}

/// Feedback for answers the wizard did not take.
fn ignore_note(reason: IgnoreReason) -> Option<&'static str> {
    match reason {
        IgnoreReason::Done => Some("Chat complete. Type /new to start over."),
        IgnoreReason::Busy => Some("⏳ Still working, one moment..."),
        IgnoreReason::Blank => None,
    }
}
