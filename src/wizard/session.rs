//! Wizard session: drives the engine through pacing delays and the
//! valuation call, and broadcasts every change to renderers.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};

use super::engine::{Accepted, Generation, IgnoreReason, Wizard, WizardSnapshot};
use super::state::WizardState;
use crate::catalog::Catalog;
use crate::config::PacingConfig;
use crate::gateway::{Estimate, ValuationGateway};
use crate::transcript::TranscriptEntry;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Change notifications for renderers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WizardEvent {
    /// Full state; sent after a reset and whenever a renderer needs to resync.
    Sync { snapshot: WizardSnapshot },
    EntryAppended { entry: TranscriptEntry },
    StateChanged {
        state: WizardState,
        busy: bool,
        done: bool,
        placeholder: String,
    },
}

/// Result of one [`WizardSession::submit`] step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ignored(IgnoreReason),
    /// Moved on; question `index` is now being asked.
    Advanced { index: usize },
    /// Estimate shown.
    Completed { price: String },
    /// Valuation failed; the final question is being asked again.
    Failed,
    /// A reset happened while the step was in flight.
    Superseded,
}

/// An accepted answer whose delays and valuation call still have to run.
#[derive(Debug)]
pub struct PendingStep(Accepted);

/// A wizard shared between one driver and any number of renderers.
///
/// The lock is held only for each instantaneous transition, never across a
/// delay or the valuation call.
pub struct WizardSession {
    catalog: Arc<Catalog>,
    wizard: RwLock<Wizard>,
    gateway: Arc<dyn ValuationGateway>,
    tx: broadcast::Sender<WizardEvent>,
}

impl WizardSession {
    pub fn new(
        catalog: Arc<Catalog>,
        gateway: Arc<dyn ValuationGateway>,
        pacing: PacingConfig,
    ) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            wizard: RwLock::new(Wizard::new(Arc::clone(&catalog), pacing)),
            catalog,
            gateway,
            tx,
        })
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Subscribe to change events. Each renderer calls this.
    pub fn subscribe(&self) -> broadcast::Receiver<WizardEvent> {
        self.tx.subscribe()
    }

    pub async fn snapshot(&self) -> WizardSnapshot {
        self.wizard.read().await.snapshot()
    }

    /// Post the prompt that is currently due, after the prompt delay.
    pub async fn start(&self) {
        let (generation, index, delay) = {
            let wizard = self.wizard.read().await;
            (wizard.generation(), wizard.pending_prompt(), wizard.pacing().prompt_delay)
        };
        if let Some(index) = index {
            self.reveal(generation, index, delay).await;
        }
    }

    /// Run one complete user step: accept `raw`, then pace, submit and
    /// reveal as needed.
    pub async fn submit(&self, raw: &str) -> SubmitOutcome {
        match self.begin(raw).await {
            Ok(step) => self.finish(step).await,
            Err(reason) => SubmitOutcome::Ignored(reason),
        }
    }

    /// The instantaneous half of [`submit`](Self::submit). Hosts that answer
    /// requests before the step completes call this and spawn
    /// [`finish`](Self::finish).
    pub async fn begin(&self, raw: &str) -> Result<PendingStep, IgnoreReason> {
        let mut wizard = self.wizard.write().await;
        let mark = Mark::of(&wizard);
        let accepted = wizard.accept(raw);
        if let Accepted::Ignored(reason) = accepted {
            debug!(session_id = %wizard.session_id(), %reason, "Input ignored");
            return Err(reason);
        }
        self.publish(&wizard, mark);
        Ok(PendingStep(accepted))
    }

    /// The paced half of [`submit`](Self::submit).
    pub async fn finish(&self, step: PendingStep) -> SubmitOutcome {
        let pacing = self.wizard.read().await.pacing();
        match step.0 {
            Accepted::Ignored(reason) => SubmitOutcome::Ignored(reason),
            Accepted::Advancing { generation, next } => {
                sleep(pacing.advance_delay).await;
                {
                    let mut wizard = self.wizard.write().await;
                    let mark = Mark::of(&wizard);
                    if !wizard.complete_advance(generation) {
                        return SubmitOutcome::Superseded;
                    }
                    self.publish(&wizard, mark);
                }
                self.reveal(generation, next, pacing.prompt_delay).await;
                SubmitOutcome::Advanced { index: next }
            }
            Accepted::Submit { generation, record } => {
                info!(fields = record.len(), "Requesting valuation");
                let outcome = self.gateway.estimate(&record).await;
                let price = outcome.as_ref().ok().map(Estimate::formatted);
                if price.is_some() {
                    sleep(pacing.result_delay).await;
                }

                let retry_prompt = {
                    let mut wizard = self.wizard.write().await;
                    let mark = Mark::of(&wizard);
                    if !wizard.complete_submission(generation, outcome) {
                        return SubmitOutcome::Superseded;
                    }
                    self.publish(&wizard, mark);
                    wizard.pending_prompt()
                };

                match (price, retry_prompt) {
                    (Some(price), _) => SubmitOutcome::Completed { price },
                    (None, Some(index)) => {
                        self.reveal(generation, index, pacing.prompt_delay).await;
                        SubmitOutcome::Failed
                    }
                    (None, None) => SubmitOutcome::Failed,
                }
            }
        }
    }

    /// Reset to a fresh conversation holding only the greeting.
    ///
    /// The first prompt is due but not posted; call [`start`](Self::start)
    /// (or use [`restart`](Self::restart)).
    pub async fn reset(&self) -> WizardSnapshot {
        let mut wizard = self.wizard.write().await;
        wizard.reset();
        let snapshot = wizard.snapshot();
        let _ = self.tx.send(WizardEvent::Sync {
            snapshot: snapshot.clone(),
        });
        snapshot
    }

    /// Reset and pose the first question.
    pub async fn restart(&self) {
        self.reset().await;
        self.start().await;
    }

    async fn reveal(&self, generation: Generation, index: usize, delay: Duration) {
        sleep(delay).await;
        let mut wizard = self.wizard.write().await;
        let mark = Mark::of(&wizard);
        if wizard.reveal_prompt(generation, index) {
            self.publish(&wizard, mark);
        }
    }

    /// Broadcast what changed since `mark`. Ok if nobody is listening.
    fn publish(&self, wizard: &Wizard, mark: Mark) {
        for entry in &wizard.transcript().entries()[mark.len..] {
            let _ = self.tx.send(WizardEvent::EntryAppended {
                entry: entry.clone(),
            });
        }
        if wizard.state() != mark.state {
            let snapshot = wizard.snapshot();
            let _ = self.tx.send(WizardEvent::StateChanged {
                state: snapshot.state,
                busy: snapshot.busy,
                done: snapshot.done,
                placeholder: snapshot.placeholder,
            });
        }
    }
}

/// Transcript length and state before a transition.
#[derive(Clone, Copy)]
struct Mark {
    len: usize,
    state: WizardState,
}

impl Mark {
    fn of(wizard: &Wizard) -> Self {
        Self {
            len: wizard.transcript().len(),
            state: wizard.state(),
        }
    }
}

async fn sleep(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::catalog::FieldDescriptor;
    use crate::config::{FAILURE_MESSAGE, GREETING};
    use crate::error::GatewayError;
    use crate::wizard::{AnswerRecord, AnswerValue};

    /// Gateway that fails the first `failures` calls, then returns `lakhs`.
    struct StubGateway {
        lakhs: f64,
        failures: usize,
        calls: AtomicUsize,
        last_record: std::sync::Mutex<Option<AnswerRecord>>,
    }

    impl StubGateway {
        fn new(lakhs: f64, failures: usize) -> Arc<Self> {
            Arc::new(Self {
                lakhs,
                failures,
                calls: AtomicUsize::new(0),
                last_record: std::sync::Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ValuationGateway for StubGateway {
        async fn estimate(&self, record: &AnswerRecord) -> Result<Estimate, GatewayError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_record.lock().unwrap() = Some(record.clone());
            if n < self.failures {
                Err(GatewayError::Status {
                    status: 500,
                    body: "model unavailable".into(),
                })
            } else {
                Ok(Estimate::new(self.lakhs))
            }
        }
    }

    fn catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::new(vec![
                FieldDescriptor::text("brand", "What's the brand of your car?", "e.g., Maruti"),
                FieldDescriptor::number("year", "What year was it manufactured?", "2018"),
            ])
            .unwrap(),
        )
    }

    async fn started(gateway: Arc<StubGateway>) -> Arc<WizardSession> {
        let session = WizardSession::new(catalog(), gateway, PacingConfig::instant());
        session.start().await;
        session
    }

    #[tokio::test]
    async fn happy_path_ends_with_result() {
        let gateway = StubGateway::new(5.234, 0);
        let session = started(Arc::clone(&gateway)).await;

        assert_eq!(session.submit("Maruti").await, SubmitOutcome::Advanced { index: 1 });
        assert_eq!(
            session.submit("2018").await,
            SubmitOutcome::Completed {
                price: "5.23".into()
            }
        );

        let snap = session.snapshot().await;
        assert!(snap.done);
        assert!(!snap.busy);
        assert_eq!(snap.transcript.last(), Some(&TranscriptEntry::result("5.23")));
        assert_eq!(
            serde_json::to_value(&snap.record).unwrap(),
            serde_json::json!({"brand": "Maruti", "year": 2018})
        );
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn paced_steps_wait_for_their_delays() {
        let pacing = PacingConfig {
            prompt_delay: Duration::from_millis(30),
            advance_delay: Duration::from_millis(40),
            result_delay: Duration::from_millis(50),
        };
        let session = WizardSession::new(catalog(), StubGateway::new(3.0, 0), pacing);

        let start = tokio::time::Instant::now();
        session.start().await;
        assert!(start.elapsed() >= pacing.prompt_delay);
        assert_eq!(session.snapshot().await.transcript.len(), 2);

        // Busy while the advance delay runs; input is refused.
        let step = session.begin("Maruti").await.unwrap();
        assert!(session.snapshot().await.busy);
        assert_eq!(session.begin("Swift").await.err(), Some(IgnoreReason::Busy));

        let start = tokio::time::Instant::now();
        session.finish(step).await;
        assert!(start.elapsed() >= pacing.advance_delay + pacing.prompt_delay);

        let start = tokio::time::Instant::now();
        session.submit("2018").await;
        assert!(start.elapsed() >= pacing.result_delay);
        assert!(session.snapshot().await.done);
    }

    #[tokio::test]
    async fn failure_then_retry_succeeds() {
        let gateway = StubGateway::new(4.5, 1);
        let session = started(Arc::clone(&gateway)).await;

        session.submit("Maruti").await;
        assert_eq!(session.submit("2018").await, SubmitOutcome::Failed);

        let snap = session.snapshot().await;
        assert_eq!(snap.current_index, Some(1));
        assert!(!snap.done);
        let failures = snap
            .transcript
            .iter()
            .filter(|e| **e == TranscriptEntry::bot(FAILURE_MESSAGE))
            .count();
        assert_eq!(failures, 1);
        // The final question is asked again.
        assert_eq!(snap.transcript.last().and_then(TranscriptEntry::question_index), Some(1));

        assert_eq!(
            session.submit("2019").await,
            SubmitOutcome::Completed {
                price: "4.50".into()
            }
        );
        assert_eq!(gateway.calls(), 2);
        let sent = gateway.last_record.lock().unwrap().clone().unwrap();
        assert_eq!(sent.get("year"), Some(&AnswerValue::Number(2019.0)));
    }

    #[tokio::test]
    async fn blank_submit_changes_nothing() {
        let gateway = StubGateway::new(1.0, 0);
        let session = started(Arc::clone(&gateway)).await;
        let before = session.snapshot().await;

        assert_eq!(session.submit("   ").await, SubmitOutcome::Ignored(IgnoreReason::Blank));
        assert_eq!(session.submit("").await, SubmitOutcome::Ignored(IgnoreReason::Blank));

        let after = session.snapshot().await;
        assert_eq!(after.transcript, before.transcript);
        assert_eq!(after.current_index, Some(0));
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn submit_after_completion_is_ignored() {
        let gateway = StubGateway::new(1.0, 0);
        let session = started(Arc::clone(&gateway)).await;
        session.submit("Maruti").await;
        session.submit("2018").await;

        assert_eq!(session.submit("again").await, SubmitOutcome::Ignored(IgnoreReason::Done));
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn reset_then_restart() {
        let gateway = StubGateway::new(1.0, 0);
        let session = started(gateway).await;
        session.submit("Maruti").await;
        session.submit("2018").await;

        let snap = session.reset().await;
        assert_eq!(snap.transcript.entries(), [TranscriptEntry::bot(GREETING)]);
        assert_eq!(snap.current_index, Some(0));
        assert!(snap.record.is_empty());
        assert!(!snap.busy && !snap.done);

        session.start().await;
        let snap = session.snapshot().await;
        assert_eq!(snap.transcript.len(), 2);
        assert_eq!(snap.transcript.last().and_then(TranscriptEntry::question_index), Some(0));
    }

    #[tokio::test]
    async fn begin_marks_busy_until_finish() {
        let gateway = StubGateway::new(1.0, 0);
        let session = started(gateway).await;

        let step = session.begin("Maruti").await.unwrap();
        assert!(session.snapshot().await.busy);
        assert_eq!(session.begin("Hyundai").await.unwrap_err(), IgnoreReason::Busy);

        assert_eq!(session.finish(step).await, SubmitOutcome::Advanced { index: 1 });
        assert!(!session.snapshot().await.busy);
    }

    #[tokio::test]
    async fn reset_during_step_supersedes_it() {
        let gateway = StubGateway::new(1.0, 0);
        let session = started(Arc::clone(&gateway)).await;
        session.submit("Maruti").await;

        let step = session.begin("2018").await.unwrap();
        session.reset().await;
        assert_eq!(session.finish(step).await, SubmitOutcome::Superseded);

        let snap = session.snapshot().await;
        assert_eq!(snap.transcript.len(), 1);
        assert!(!snap.done);
    }

    #[tokio::test]
    async fn events_follow_transcript() {
        let gateway = StubGateway::new(2.0, 0);
        let session = WizardSession::new(catalog(), gateway, PacingConfig::instant());
        let mut rx = session.subscribe();

        session.start().await;
        session.submit("Maruti").await;

        let mut appended = Vec::new();
        let mut states = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                WizardEvent::EntryAppended { entry } => appended.push(entry),
                WizardEvent::StateChanged { state, .. } => states.push(state),
                WizardEvent::Sync { .. } => {}
            }
        }

        assert_eq!(
            appended,
            [
                TranscriptEntry::question(0, "What's the brand of your car?"),
                TranscriptEntry::user("Maruti"),
                TranscriptEntry::question(1, "What year was it manufactured?"),
            ]
        );
        assert_eq!(
            states,
            [
                WizardState::Advancing {
                    index: 0,
                    delay_ms: 0
                },
                WizardState::Collecting { index: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn reset_broadcasts_sync() {
        let gateway = StubGateway::new(2.0, 0);
        let session = started(gateway).await;
        let mut rx = session.subscribe();

        session.reset().await;
        match rx.try_recv().unwrap() {
            WizardEvent::Sync { snapshot } => assert_eq!(snapshot.transcript.len(), 1),
            other => panic!("expected sync, got {other:?}"),
        }
    }
}
