//! Session controller: the single owner of the monitoring session.
//!
//! All operator actions and all background completions funnel into one
//! task, which is the only place session state is mutated. Background work
//! (interface listing, capture start, poll timer, stats fetches) runs in
//! spawned tasks that report back with [`SessionEvent`]s.
//!
//! # State Machine
//!
//! ```text
//!                 select(i)                 start
//! Unselected ───────────────► Idle(i) ─────────────────► Monitoring(i, epoch n)
//!                               ▲  ▲                      │  │  │
//!                    stop       │  │ capture failed        │  │  │ select(j != i)
//!               ────────────────┘  └───────────────────────┘  │  └──► Monitoring(j, epoch n+1)
//!                                                             │
//!                                              interval change: timer replaced
//! ```
//!
//! Each activation gets a fresh [`Epoch`]. Everything spawned for an
//! activation is scoped to a cancellation token owned by that activation,
//! and every event it produces carries the epoch, so leaving an activation
//! both cancels its work and makes late results recognisable.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dnsdash_shared::errors::{DashboardError, DashboardResult};
use dnsdash_shared::{
    BackendConfig, CaptureAck, NetworkInterface, PollingInterval, StatsSnapshot,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, trace, warn};

use crate::backend_client::StatsBackend;
use crate::capture::{capture_note, spawn_capture};
use crate::interface_registry::{InterfaceRegistry, RegistryStatus};
use crate::messages::{OperatorAction, SessionEvent};
use crate::poller::{FetchTicket, StatsPoller};

/// Identity of one monitoring activation. Strictly increasing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

impl Epoch {
    pub fn next(self) -> Self {
        Epoch(self.0 + 1)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Externally visible phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unselected,
    Idle,
    /// Monitoring requested, capture acknowledgement pending
    Starting,
    Monitoring,
}

impl SessionPhase {
    /// True while an activation exists (capture pending or polling).
    pub fn is_monitoring(self) -> bool {
        matches!(self, SessionPhase::Starting | SessionPhase::Monitoring)
    }
}

/// Freshness of the displayed statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsAvailability {
    /// No snapshot received for the current activation yet
    Waiting,
    Fresh,
    /// The latest fetch failed; any displayed snapshot is the previous one
    Unavailable(String),
}

/// Snapshot of the session published after every applied change.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub interface: Option<NetworkInterface>,
    pub activation: Option<Epoch>,
    pub polling_interval: PollingInterval,
    pub interfaces: Vec<NetworkInterface>,
    pub registry: RegistryStatus,
    pub snapshot: Option<Arc<StatsSnapshot>>,
    pub stats: StatsAvailability,
    /// Last operator-visible failure (capture start)
    pub error: Option<DashboardError>,
    /// Informational message (rejected interval, capture note)
    pub notice: Option<String>,
}

impl SessionStatus {
    pub fn is_monitoring(&self) -> bool {
        self.phase.is_monitoring()
    }
}

/// Timing parameters of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub initial_interval: PollingInterval,
    /// Upper bound of every backend call
    pub call_timeout: Duration,
}

impl From<&BackendConfig> for SessionSettings {
    fn from(config: &BackendConfig) -> Self {
        Self {
            initial_interval: config.initial_interval,
            call_timeout: config.request_timeout,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&BackendConfig::default())
    }
}

enum ActivationStage {
    AwaitingCapture,
    Polling(StatsPoller),
}

/// One monitoring activation. Dropping it cancels the capture request,
/// the poll timer and every in-flight fetch.
struct Activation {
    interface: NetworkInterface,
    epoch: Epoch,
    stage: ActivationStage,
    token: CancellationToken,
    _guard: DropGuard,
}

enum SessionState {
    Unselected,
    Idle { interface: NetworkInterface },
    Monitoring(Activation),
}

pub struct SessionController {
    backend: Arc<dyn StatsBackend>,
    settings: SessionSettings,
    state: SessionState,
    interval: PollingInterval,
    last_epoch: Epoch,
    registry: InterfaceRegistry,
    snapshot: Option<Arc<StatsSnapshot>>,
    stats: StatsAvailability,
    error: Option<DashboardError>,
    notice: Option<String>,
    events_tx: UnboundedSender<SessionEvent>,
    events_rx: UnboundedReceiver<SessionEvent>,
}

impl SessionController {
    pub fn new(backend: Arc<dyn StatsBackend>, settings: SessionSettings) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            settings,
            state: SessionState::Unselected,
            interval: settings.initial_interval,
            last_epoch: Epoch::default(),
            registry: InterfaceRegistry::new(),
            snapshot: None,
            stats: StatsAvailability::Waiting,
            error: None,
            notice: None,
            events_tx,
            events_rx,
        }
    }

    /// Runs the controller until the action channel closes or nobody
    /// listens to status updates anymore.
    ///
    /// The interface list is requested on startup. A status is published
    /// initially and after every action or applied event.
    pub async fn run(
        mut self,
        mut actions: UnboundedReceiver<OperatorAction>,
        updates: UnboundedSender<SessionStatus>,
    ) {
        info!("Session controller started");
        self.refresh_interfaces();
        if updates.send(self.status()).is_err() {
            return;
        }

        loop {
            let changed = tokio::select! {
                biased;

                action = actions.recv() => match action {
                    Some(action) => {
                        self.handle_action(action);
                        true
                    }
                    None => break,
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            };

            if changed && updates.send(self.status()).is_err() {
                break;
            }
        }

        info!("Session controller stopped");
    }

    pub fn status(&self) -> SessionStatus {
        let (phase, interface, activation) = match &self.state {
            SessionState::Unselected => (SessionPhase::Unselected, None, None),
            SessionState::Idle { interface } => (SessionPhase::Idle, Some(interface.clone()), None),
            SessionState::Monitoring(activation) => {
                let phase = match activation.stage {
                    ActivationStage::AwaitingCapture => SessionPhase::Starting,
                    ActivationStage::Polling(_) => SessionPhase::Monitoring,
                };
                (
                    phase,
                    Some(activation.interface.clone()),
                    Some(activation.epoch),
                )
            }
        };

        SessionStatus {
            phase,
            interface,
            activation,
            polling_interval: self.interval,
            interfaces: self.registry.interfaces().to_vec(),
            registry: self.registry.status().clone(),
            snapshot: self.snapshot.clone(),
            stats: self.stats.clone(),
            error: self.error.clone(),
            notice: self.notice.clone(),
        }
    }

    pub fn handle_action(&mut self, action: OperatorAction) {
        debug!("Operator action: {:?}", action);
        match action {
            OperatorAction::SelectInterface(interface) => self.select_interface(interface),
            OperatorAction::StartMonitoring => self.start_monitoring(),
            OperatorAction::StopMonitoring => self.stop_monitoring(),
            OperatorAction::SetPollingInterval(seconds) => self.set_polling_interval(seconds),
            OperatorAction::RefreshInterfaces => self.refresh_interfaces(),
        }
    }

    /// Applies a background completion. Returns true if the published
    /// status changed.
    pub fn handle_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::InterfacesListed { request, result } => {
                self.registry.apply(request, result)
            }
            SessionEvent::CaptureFinished { epoch, result } => {
                self.on_capture_finished(epoch, result)
            }
            SessionEvent::PollTick {
                epoch,
                timer,
                scheduled_at,
            } => {
                self.on_poll_tick(epoch, timer, scheduled_at);
                false
            }
            SessionEvent::StatsFetched { ticket, result } => self.on_stats_fetched(ticket, result),
        }
    }

    fn refresh_interfaces(&mut self) {
        self.registry.request(
            Arc::clone(&self.backend),
            self.settings.call_timeout,
            self.events_tx.clone(),
        );
    }

    fn select_interface(&mut self, interface: NetworkInterface) {
        if interface.trim().is_empty() {
            warn!("Ignoring selection of an empty interface name");
            return;
        }

        match std::mem::replace(&mut self.state, SessionState::Unselected) {
            SessionState::Monitoring(activation) if activation.interface == interface => {
                debug!("{} is already being monitored", interface);
                self.state = SessionState::Monitoring(activation);
            }
            SessionState::Monitoring(activation) => {
                info!(from = %activation.interface, to = %interface, "Switching monitored interface");
                drop(activation);
                self.begin_activation(interface);
            }
            SessionState::Unselected | SessionState::Idle { .. } => {
                info!(interface = %interface, "Interface selected");
                self.error = None;
                self.state = SessionState::Idle { interface };
            }
        }
    }

    fn start_monitoring(&mut self) {
        match &self.state {
            SessionState::Unselected => {
                warn!("Start requested without a selected interface");
                self.notice = Some("Select a network interface first.".to_string());
            }
            SessionState::Idle { interface } => {
                let interface = interface.clone();
                self.begin_activation(interface);
            }
            SessionState::Monitoring(_) => debug!("Already monitoring"),
        }
    }

    fn stop_monitoring(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::Unselected) {
            SessionState::Monitoring(activation) => {
                let interface = activation.interface.clone();
                info!(interface = %interface, epoch = %activation.epoch, "Monitoring stopped");
                drop(activation);
                self.clear_stats();
                self.state = SessionState::Idle { interface };
            }
            other => {
                debug!("Stop requested while not monitoring");
                self.state = other;
            }
        }
    }

    fn set_polling_interval(&mut self, seconds: i64) {
        let interval = match PollingInterval::new(seconds) {
            Ok(interval) => interval,
            Err(e) => {
                warn!("{}", e);
                self.notice = Some(format!("{}; keeping {}.", e, self.interval));
                return;
            }
        };

        self.notice = None;
        if interval == self.interval {
            return;
        }
        info!(from = %self.interval, to = %interval, "Polling interval changed");
        self.interval = interval;

        if let SessionState::Monitoring(Activation {
            stage: ActivationStage::Polling(poller),
            ..
        }) = &mut self.state
        {
            poller.reschedule(interval.as_duration());
        }
    }

    /// Enters a new activation on `interface`. The previous activation, if
    /// any, must already have been dropped.
    fn begin_activation(&mut self, interface: NetworkInterface) {
        self.last_epoch = self.last_epoch.next();
        let epoch = self.last_epoch;
        let token = CancellationToken::new();

        info!(interface = %interface, epoch = %epoch, "Starting monitoring");
        spawn_capture(
            Arc::clone(&self.backend),
            epoch,
            interface.clone(),
            self.settings.call_timeout,
            token.child_token(),
            self.events_tx.clone(),
        );

        self.clear_stats();
        self.error = None;
        self.notice = None;
        self.state = SessionState::Monitoring(Activation {
            interface,
            epoch,
            stage: ActivationStage::AwaitingCapture,
            token: token.clone(),
            _guard: token.drop_guard(),
        });
    }

    fn clear_stats(&mut self) {
        self.snapshot = None;
        self.stats = StatsAvailability::Waiting;
    }

    fn on_capture_finished(&mut self, epoch: Epoch, result: DashboardResult<CaptureAck>) -> bool {
        let SessionState::Monitoring(activation) = &mut self.state else {
            debug!(epoch = %epoch, "Ignoring capture result while not monitoring");
            return false;
        };
        if activation.epoch != epoch
            || !matches!(activation.stage, ActivationStage::AwaitingCapture)
        {
            debug!(epoch = %epoch, "Ignoring capture result of superseded activation");
            return false;
        }

        match result {
            Ok(ack) => {
                self.notice = capture_note(&activation.interface, &ack);
                let poller = StatsPoller::start(
                    epoch,
                    self.interval.as_duration(),
                    activation.token.clone(),
                    Arc::clone(&self.backend),
                    self.events_tx.clone(),
                    self.settings.call_timeout,
                );
                activation.stage = ActivationStage::Polling(poller);
                info!(
                    interface = %activation.interface,
                    epoch = %epoch,
                    interval = %self.interval,
                    "Capture acknowledged, polling stats"
                );
            }
            Err(e) => {
                warn!(epoch = %epoch, error = %e, "Capture failed, back to idle");
                let interface = activation.interface.clone();
                self.state = SessionState::Idle { interface };
                self.clear_stats();
                self.error = Some(e);
            }
        }
        true
    }

    fn on_poll_tick(&mut self, epoch: Epoch, timer: u64, scheduled_at: Instant) {
        if let SessionState::Monitoring(Activation {
            epoch: current,
            stage: ActivationStage::Polling(poller),
            ..
        }) = &mut self.state
        {
            if *current == epoch {
                poller.on_tick(timer, scheduled_at);
                return;
            }
        }
        trace!(epoch = %epoch, "Dropping poll tick of a retired activation");
    }

    fn on_stats_fetched(
        &mut self,
        ticket: FetchTicket,
        result: DashboardResult<StatsSnapshot>,
    ) -> bool {
        let accepted = match &mut self.state {
            SessionState::Monitoring(Activation {
                stage: ActivationStage::Polling(poller),
                ..
            }) => poller.accept(ticket),
            _ => false,
        };
        if !accepted {
            debug!(
                epoch = %ticket.epoch,
                sequence = ticket.sequence,
                "Dropping stale stats result"
            );
            return false;
        }

        match result {
            Ok(snapshot) => {
                trace!(sequence = ticket.sequence, "Applying stats snapshot");
                self.snapshot = Some(Arc::new(snapshot));
                self.stats = StatsAvailability::Fresh;
            }
            Err(e) => {
                warn!(epoch = %ticket.epoch, error = %e, "Stats fetch failed");
                self.stats = StatsAvailability::Unavailable(e.to_string());
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dnsdash_shared::errors::BackendResult;

    struct OfflineBackend;

    #[async_trait]
    impl StatsBackend for OfflineBackend {
        async fn list_interfaces(&self) -> BackendResult<Vec<NetworkInterface>> {
            Ok(Vec::new())
        }

        async fn start_capture(&self, _interface: &str) -> BackendResult<CaptureAck> {
            Ok(CaptureAck::from_body("{}"))
        }

        async fn fetch_stats(&self) -> BackendResult<StatsSnapshot> {
            Ok(StatsSnapshot::default())
        }
    }

    fn controller() -> SessionController {
        SessionController::new(Arc::new(OfflineBackend), SessionSettings::default())
    }

    #[test]
    fn test_initial_status() {
        let status = controller().status();
        assert_eq!(status.phase, SessionPhase::Unselected);
        assert_eq!(status.polling_interval, PollingInterval::default());
        assert!(status.snapshot.is_none());
        assert!(!status.is_monitoring());
    }

    #[test]
    fn test_select_enters_idle() {
        let mut session = controller();
        session.handle_action(OperatorAction::SelectInterface("eth0".to_string()));

        let status = session.status();
        assert_eq!(status.phase, SessionPhase::Idle);
        assert_eq!(status.interface.as_deref(), Some("eth0"));
    }

    #[test]
    fn test_start_without_interface_is_refused() {
        let mut session = controller();
        session.handle_action(OperatorAction::StartMonitoring);

        let status = session.status();
        assert_eq!(status.phase, SessionPhase::Unselected);
        assert!(status.notice.is_some());
    }

    #[test]
    fn test_out_of_range_interval_keeps_previous() {
        let mut session = controller();
        session.handle_action(OperatorAction::SetPollingInterval(5));
        session.handle_action(OperatorAction::SetPollingInterval(0));
        session.handle_action(OperatorAction::SetPollingInterval(500));

        let status = session.status();
        assert_eq!(status.polling_interval.seconds(), 5);
        assert!(status.notice.unwrap().contains("keeping 5s"));
    }

    #[test]
    fn test_stop_while_idle_is_noop() {
        let mut session = controller();
        session.handle_action(OperatorAction::SelectInterface("lo".to_string()));
        session.handle_action(OperatorAction::StopMonitoring);
        assert_eq!(session.status().phase, SessionPhase::Idle);
    }

    #[test]
    fn test_epoch_ordering() {
        let first = Epoch::default().next();
        assert!(first.next() > first);
        assert_eq!(first.to_string(), "1");
    }
}
