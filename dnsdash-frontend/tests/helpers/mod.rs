#![allow(dead_code)]

mod mock_backend;

pub use mock_backend::{BackendCall, CallKind, MockStatsBackend};

use std::sync::Arc;
use std::time::Duration;

use dnsdash_frontend::messages::OperatorAction;
use dnsdash_frontend::session::{SessionController, SessionSettings, SessionStatus};
use dnsdash_shared::PollingInterval;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Runs a session controller against a mock backend and records every
/// status it publishes.
pub struct SessionHarness {
    pub backend: Arc<MockStatsBackend>,
    pub started: Instant,
    actions: mpsc::UnboundedSender<OperatorAction>,
    updates: mpsc::UnboundedReceiver<SessionStatus>,
    history: Vec<SessionStatus>,
}

impl SessionHarness {
    pub fn start(backend: Arc<MockStatsBackend>, interval_secs: i64) -> Self {
        Self::start_with_timeout(backend, interval_secs, Duration::from_secs(5))
    }

    pub fn start_with_timeout(
        backend: Arc<MockStatsBackend>,
        interval_secs: i64,
        call_timeout: Duration,
    ) -> Self {
        let settings = SessionSettings {
            initial_interval: PollingInterval::new(interval_secs).unwrap(),
            call_timeout,
        };
        let controller = SessionController::new(backend.clone(), settings);
        let (actions, action_rx) = mpsc::unbounded_channel();
        let (update_tx, updates) = mpsc::unbounded_channel();
        tokio::spawn(controller.run(action_rx, update_tx));

        Self {
            backend,
            started: Instant::now(),
            actions,
            updates,
            history: Vec::new(),
        }
    }

    pub fn act(&self, action: OperatorAction) {
        self.actions.send(action).unwrap();
    }

    pub fn select(&self, interface: &str) {
        self.act(OperatorAction::SelectInterface(interface.to_string()));
    }

    /// Lets the paused clock run until `millis` after the harness started.
    pub async fn advance_to(&mut self, millis: u64) {
        tokio::time::sleep_until(self.started + Duration::from_millis(millis)).await;
        self.collect();
    }

    fn collect(&mut self) {
        while let Ok(status) = self.updates.try_recv() {
            self.history.push(status);
        }
    }

    pub fn latest(&mut self) -> SessionStatus {
        self.collect();
        self.history.last().cloned().expect("controller published no status")
    }

    /// Every status published so far, oldest first.
    pub fn history(&mut self) -> &[SessionStatus] {
        self.collect();
        &self.history
    }

    /// Offsets from harness start of every call of `kind`, in milliseconds.
    pub async fn call_offsets(&self, kind: CallKind) -> Vec<u64> {
        self.backend
            .calls()
            .await
            .into_iter()
            .filter(|call| call.kind == kind)
            .map(|call| call.at.duration_since(self.started).as_millis() as u64)
            .collect()
    }
}
