//! Claim transaction controller.
//!
//! Drives a single `claimFreeTokens` attempt through submission and
//! confirmation, and owns the exactly-once notification guarantee: however
//! many times the surrounding poll/render cycle re-evaluates state while the
//! attempt sits in `Confirmed`, the success notification fires once per
//! `submit`. A fresh `submit` re-arms it.
//!
//! Phase and the notified flag live behind a short-lived internal lock, so
//! `phase()` stays readable while a submission or confirmation is awaited —
//! the busy indicator must be observable mid-attempt.
//!
//! Concurrency guard: the controller does NOT deduplicate overlapping
//! `submit` calls. Callers must keep the claim action disabled while
//! [`ClaimController::is_busy`] — the render projection does this — and only
//! call `submit` from a quiescent phase.

use crate::chain::{ChainError, ClaimSubmitter, ConfirmationStatus, ConfirmationWatcher};
use crate::view::format_tokens;
use alloy::primitives::U256;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Lifecycle of one claim attempt. Not persisted; scoped to a single
/// `(market, wallet)` attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimPhase {
    Idle,
    Submitting,
    Confirming,
    Confirmed,
    Failed(String),
}

impl std::fmt::Display for ClaimPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimPhase::Idle => write!(f, "idle"),
            ClaimPhase::Submitting => write!(f, "submitting"),
            ClaimPhase::Confirming => write!(f, "confirming"),
            ClaimPhase::Confirmed => write!(f, "confirmed"),
            ClaimPhase::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Failure,
}

/// One user-visible notification (toast/push), fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
}

/// Presentation-layer notification sink. At most one call per event.
pub trait NotifySink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Default sink: structured log lines.
pub struct LogNotifier;

impl NotifySink for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => info!(
                title = %notification.title,
                description = %notification.description,
                "notification"
            ),
            NotificationKind::Failure => warn!(
                title = %notification.title,
                description = %notification.description,
                "notification"
            ),
        }
    }
}

const FAILURE_TITLE: &str = "Claim Failed";
const GENERIC_FAILURE: &str = "Failed to claim free shares";

/// Mutable attempt state, locked only for reads and transitions — never
/// across an await.
struct AttemptState {
    phase: ClaimPhase,
    /// Set once the success notification for the current attempt has fired.
    notified: bool,
}

pub struct ClaimController {
    submitter: Arc<dyn ClaimSubmitter>,
    watcher: Arc<dyn ConfirmationWatcher>,
    notifier: Arc<dyn NotifySink>,
    state: Mutex<AttemptState>,
}

impl ClaimController {
    pub fn new(
        submitter: Arc<dyn ClaimSubmitter>,
        watcher: Arc<dyn ConfirmationWatcher>,
        notifier: Arc<dyn NotifySink>,
    ) -> Self {
        Self {
            submitter,
            watcher,
            notifier,
            state: Mutex::new(AttemptState {
                phase: ClaimPhase::Idle,
                notified: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, AttemptState> {
        self.state.lock().expect("claim attempt state poisoned")
    }

    pub fn phase(&self) -> ClaimPhase {
        self.state().phase.clone()
    }

    /// True while a submission or confirmation is in flight. The claim
    /// action surface must be disabled while this holds.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state().phase,
            ClaimPhase::Submitting | ClaimPhase::Confirming
        )
    }

    /// Run one claim attempt to its terminal phase.
    ///
    /// `tokens_per_participant` is the allocation from the config current at
    /// submit time; it gates and fills the success notification. If the
    /// future is dropped mid-flight no notification fires (the attempt's
    /// context is gone).
    pub async fn submit(&self, market_id: U256, tokens_per_participant: U256) {
        // New attempt: re-arm the one-shot notification.
        self.state().notified = false;
        self.set_phase(ClaimPhase::Submitting);

        let handle = match self.submitter.submit_claim(market_id).await {
            Ok(handle) => handle,
            Err(e) => {
                self.fail(rejection_reason(&e));
                return;
            }
        };

        debug!(market = %market_id, tx = %handle, "claim submitted, awaiting finality");
        self.set_phase(ClaimPhase::Confirming);

        match self.watcher.await_confirmation(handle).await {
            Ok(ConfirmationStatus::Success) => {
                self.set_phase(ClaimPhase::Confirmed);
                self.refresh(tokens_per_participant);
            }
            Ok(ConfirmationStatus::Failure) => {
                self.fail("transaction reverted".to_string());
            }
            Err(e) => {
                self.fail(e.to_string());
            }
        }
    }

    /// Re-run the success-notification check. Safe to call on every poll or
    /// re-render cycle: emits at most once per `submit`, and only for a
    /// non-zero allocation.
    pub fn refresh(&self, tokens_per_participant: U256) {
        {
            let mut state = self.state();
            if state.phase != ClaimPhase::Confirmed
                || state.notified
                || tokens_per_participant == U256::ZERO
            {
                return;
            }
            state.notified = true;
        }
        self.notifier.notify(Notification {
            kind: NotificationKind::Success,
            title: "Tokens Claimed Successfully! 🎉".to_string(),
            description: format!(
                "You've claimed {} tokens for this free market.",
                format_tokens(tokens_per_participant)
            ),
        });
    }

    /// Acknowledge a failure, returning to `Idle` so the action can be
    /// retried. Returns false if the controller was not in `Failed`.
    pub fn acknowledge_failure(&self) -> bool {
        if matches!(self.state().phase, ClaimPhase::Failed(_)) {
            self.set_phase(ClaimPhase::Idle);
            true
        } else {
            false
        }
    }

    fn fail(&self, reason: String) {
        self.notifier.notify(Notification {
            kind: NotificationKind::Failure,
            title: FAILURE_TITLE.to_string(),
            description: if reason.is_empty() {
                GENERIC_FAILURE.to_string()
            } else {
                reason.clone()
            },
        });
        self.set_phase(ClaimPhase::Failed(reason));
    }

    fn set_phase(&self, next: ClaimPhase) {
        let mut state = self.state();
        if state.phase != next {
            debug!(from = %state.phase, to = %next, "claim phase transition");
            state.phase = next;
        }
    }
}

/// Surface the underlying rejection message verbatim where there is one.
fn rejection_reason(error: &ChainError) -> String {
    match error {
        ChainError::Rejected(message) => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::TxHandle;
    use alloy::primitives::B256;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    const WAD: u128 = 1_000_000_000_000_000_000;

    struct StubSubmitter {
        reject_with: Option<String>,
    }

    #[async_trait]
    impl ClaimSubmitter for StubSubmitter {
        async fn submit_claim(&self, _market_id: U256) -> Result<TxHandle, ChainError> {
            match &self.reject_with {
                Some(message) => Err(ChainError::Rejected(message.clone())),
                None => Ok(TxHandle(B256::ZERO)),
            }
        }
    }

    struct StubWatcher {
        status: ConfirmationStatus,
    }

    #[async_trait]
    impl ConfirmationWatcher for StubWatcher {
        async fn await_confirmation(
            &self,
            _tx: TxHandle,
        ) -> Result<ConfirmationStatus, ChainError> {
            Ok(self.status)
        }
    }

    /// Watcher that holds confirmation open until released.
    struct GatedWatcher {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl ConfirmationWatcher for GatedWatcher {
        async fn await_confirmation(
            &self,
            _tx: TxHandle,
        ) -> Result<ConfirmationStatus, ChainError> {
            self.gate.notified().await;
            Ok(ConfirmationStatus::Success)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<Notification>>,
    }

    impl NotifySink for RecordingSink {
        fn notify(&self, notification: Notification) {
            self.events.lock().unwrap().push(notification);
        }
    }

    fn controller(
        reject_with: Option<String>,
        status: ConfirmationStatus,
    ) -> (ClaimController, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let controller = ClaimController::new(
            Arc::new(StubSubmitter { reject_with }),
            Arc::new(StubWatcher { status }),
            sink.clone(),
        );
        (controller, sink)
    }

    #[tokio::test]
    async fn success_notifies_exactly_once_across_refreshes() {
        let (c, sink) = controller(None, ConfirmationStatus::Success);
        let allocation = U256::from(5 * WAD);

        c.submit(U256::from(1u64), allocation).await;
        assert_eq!(c.phase(), ClaimPhase::Confirmed);

        // Unrelated poll-driven re-evaluations.
        for _ in 0..10 {
            c.refresh(allocation);
        }

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, NotificationKind::Success);
        assert!(events[0].description.contains("5.00 tokens"));
    }

    #[tokio::test]
    async fn resubmit_rearms_the_notification() {
        let (c, sink) = controller(None, ConfirmationStatus::Success);
        let allocation = U256::from(WAD);

        c.submit(U256::from(1u64), allocation).await;
        c.refresh(allocation);
        c.submit(U256::from(1u64), allocation).await;
        c.refresh(allocation);

        assert_eq!(sink.events.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn zero_allocation_suppresses_success_notification() {
        let (c, sink) = controller(None, ConfirmationStatus::Success);

        c.submit(U256::from(1u64), U256::ZERO).await;
        assert_eq!(c.phase(), ClaimPhase::Confirmed);
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn phase_is_readable_while_confirmation_is_in_flight() {
        // The busy indicator must be observable from other tasks while the
        // watcher is still waiting on finality.
        let gate = Arc::new(Notify::new());
        let sink = Arc::new(RecordingSink::default());
        let c = Arc::new(ClaimController::new(
            Arc::new(StubSubmitter { reject_with: None }),
            Arc::new(GatedWatcher { gate: gate.clone() }),
            sink.clone(),
        ));

        let drive = tokio::spawn({
            let c = c.clone();
            async move { c.submit(U256::from(1u64), U256::from(WAD)).await }
        });

        // Wait for the attempt to reach the confirmation window.
        for _ in 0..100 {
            if c.phase() == ClaimPhase::Confirming {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(c.phase(), ClaimPhase::Confirming);
        assert!(c.is_busy());
        assert!(sink.events.lock().unwrap().is_empty());

        gate.notify_one();
        drive.await.unwrap();
        assert_eq!(c.phase(), ClaimPhase::Confirmed);
        assert_eq!(sink.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejection_surfaces_verbatim_and_allows_retry() {
        let (c, sink) = controller(
            Some("user denied transaction".to_string()),
            ConfirmationStatus::Success,
        );

        c.submit(U256::from(1u64), U256::from(WAD)).await;
        assert_eq!(
            c.phase(),
            ClaimPhase::Failed("user denied transaction".to_string())
        );

        {
            let events = sink.events.lock().unwrap();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].kind, NotificationKind::Failure);
            assert_eq!(events[0].description, "user denied transaction");
        }

        assert!(c.acknowledge_failure());
        assert_eq!(c.phase(), ClaimPhase::Idle);

        // Retry goes through and notifies once more.
        let (retry, retry_sink) = controller(None, ConfirmationStatus::Success);
        retry.submit(U256::from(1u64), U256::from(WAD)).await;
        assert_eq!(retry_sink.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reverted_transaction_fails_once() {
        let (c, sink) = controller(None, ConfirmationStatus::Failure);

        c.submit(U256::from(1u64), U256::from(WAD)).await;
        assert!(matches!(c.phase(), ClaimPhase::Failed(_)));

        // Later refreshes never turn a failure into a success emission.
        c.refresh(U256::from(WAD));
        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, NotificationKind::Failure);
    }

    #[tokio::test]
    async fn acknowledge_is_a_noop_outside_failed() {
        let (c, _sink) = controller(None, ConfirmationStatus::Success);
        assert!(!c.acknowledge_failure());
        assert_eq!(c.phase(), ClaimPhase::Idle);
    }
}
