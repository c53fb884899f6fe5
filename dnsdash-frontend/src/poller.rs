//! Stats poller: the repeating fetch of `GET /api/stats` while monitoring.
//!
//! The poller owns exactly one timer task. The timer only emits ticks; the
//! session controller hands each tick back to [`StatsPoller::on_tick`], which
//! issues the fetch. Every fetch carries a [`FetchTicket`] and only the newest
//! issued ticket may replace the displayed snapshot, so a slow fetch can
//! never overwrite a faster, later one.
//!
//! # Lifecycle
//!
//! ```text
//! start ──► timer(1) ──► tick ──► fetch(seq 1) ──► StatsFetched
//!             │
//! reschedule ─┴─► timer(1) dropped, timer(2) armed at max(now, last + period)
//!
//! drop poller ──► timer cancelled; in-flight fetches cancelled with the activation
//! ```

use std::sync::Arc;
use std::time::Duration;

use dnsdash_shared::errors::{DashboardError, DashboardResult};
use dnsdash_shared::{api, StatsSnapshot};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::backend_client::{with_deadline, StatsBackend};
use crate::messages::SessionEvent;
use crate::session::Epoch;

/// Fetches one snapshot.
pub async fn fetch_stats(
    backend: &dyn StatsBackend,
    timeout: Duration,
) -> DashboardResult<StatsSnapshot> {
    with_deadline(api::STATS, timeout, backend.fetch_stats())
        .await
        .map_err(DashboardError::fetch)
}

/// Identity of one issued fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub epoch: Epoch,
    /// Issue order within the epoch, starting at 1
    pub sequence: u64,
}

/// A running timer task. Dropping it stops the task.
#[derive(Debug)]
struct PollTimer {
    id: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.token.cancel();
        self.handle.abort();
    }
}

pub struct StatsPoller {
    epoch: Epoch,
    period: Duration,
    timer: Option<PollTimer>,
    timers_armed: u64,
    issued: u64,
    last_applied: Option<u64>,
    /// Scheduled instant of the last accepted tick
    last_tick: Option<Instant>,
    /// Activation scope; cancelling it stops the timer and every fetch
    activation: CancellationToken,
    backend: Arc<dyn StatsBackend>,
    events: UnboundedSender<SessionEvent>,
    call_timeout: Duration,
}

impl StatsPoller {
    /// Starts polling. The first tick fires immediately.
    pub fn start(
        epoch: Epoch,
        period: Duration,
        activation: CancellationToken,
        backend: Arc<dyn StatsBackend>,
        events: UnboundedSender<SessionEvent>,
        call_timeout: Duration,
    ) -> Self {
        let mut poller = Self {
            epoch,
            period,
            timer: None,
            timers_armed: 0,
            issued: 0,
            last_applied: None,
            last_tick: None,
            activation,
            backend,
            events,
            call_timeout,
        };
        poller.arm(Instant::now());
        poller
    }

    #[cfg(test)]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    #[cfg(test)]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of fetches issued so far.
    #[cfg(test)]
    pub fn issued(&self) -> u64 {
        self.issued
    }

    fn arm(&mut self, first_tick: Instant) {
        // Release the old timer before the new one exists.
        self.timer = None;

        self.timers_armed += 1;
        let id = self.timers_armed;
        let token = self.activation.child_token();
        let handle = tokio::spawn(run_timer(
            self.epoch,
            id,
            first_tick,
            self.period,
            token.clone(),
            self.events.clone(),
        ));
        debug!(epoch = %self.epoch, timer = id, period = ?self.period, "Poll timer armed");

        self.timer = Some(PollTimer { id, token, handle });
    }

    /// Replaces the timer with one of the new period. The next tick is due at
    /// `max(now, last tick + period)`; fetches already in flight are kept.
    pub fn reschedule(&mut self, period: Duration) {
        self.period = period;
        let now = Instant::now();
        let first_tick = self
            .last_tick
            .map_or(now, |last| (last + period).max(now));
        self.arm(first_tick);
    }

    /// Handles a tick of `timer`. Issues a fetch and returns its ticket, or
    /// `None` when the tick came from a timer that has since been replaced.
    pub fn on_tick(&mut self, timer: u64, scheduled_at: Instant) -> Option<FetchTicket> {
        if self.timer.as_ref().map(|t| t.id) != Some(timer) {
            trace!("Dropping tick of retired timer {}", timer);
            return None;
        }

        self.issued += 1;
        self.last_tick = Some(scheduled_at);
        let ticket = FetchTicket {
            epoch: self.epoch,
            sequence: self.issued,
        };

        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        let cancel = self.activation.child_token();
        let timeout = self.call_timeout;
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = fetch_stats(backend.as_ref(), timeout) => result,
            };
            let _ = events.send(SessionEvent::StatsFetched { ticket, result });
        });

        trace!(epoch = %ticket.epoch, sequence = ticket.sequence, "Fetch issued");
        Some(ticket)
    }

    /// Decides whether the result of `ticket` may replace the displayed
    /// snapshot, and records it as applied if so.
    pub fn accept(&mut self, ticket: FetchTicket) -> bool {
        if ticket.epoch != self.epoch {
            return false;
        }
        if self.last_applied.is_some_and(|last| ticket.sequence <= last) {
            return false;
        }
        self.last_applied = Some(ticket.sequence);
        true
    }
}

async fn run_timer(
    epoch: Epoch,
    timer: u64,
    first_tick: Instant,
    period: Duration,
    token: CancellationToken,
    events: UnboundedSender<SessionEvent>,
) {
    let mut ticker = tokio::time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            scheduled_at = ticker.tick() => {
                let tick = SessionEvent::PollTick { epoch, timer, scheduled_at };
                if events.send(tick).is_err() {
                    break;
                }
            }
        }
    }

    debug!(epoch = %epoch, timer, "Poll timer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dnsdash_shared::errors::BackendResult;
    use dnsdash_shared::{CaptureAck, NetworkInterface};
    use tokio::sync::mpsc;

    struct EmptyBackend;

    #[async_trait]
    impl StatsBackend for EmptyBackend {
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

    fn poller(events: UnboundedSender<SessionEvent>) -> StatsPoller {
        StatsPoller::start(
            Epoch::default().next(),
            Duration::from_secs(10),
            CancellationToken::new(),
            Arc::new(EmptyBackend),
            events,
            Duration::from_secs(5),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_is_immediate() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _poller = poller(tx);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, SessionEvent::PollTick { timer: 1, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepts_only_newer_sequences() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut poller = poller(tx);
        let epoch = poller.epoch();

        let first = FetchTicket { epoch, sequence: 1 };
        let second = FetchTicket { epoch, sequence: 2 };
        assert!(poller.accept(second));
        assert!(!poller.accept(first));
        assert!(!poller.accept(second));
        assert!(!poller.accept(FetchTicket {
            epoch: epoch.next(),
            sequence: 3
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retired_timer_ticks_are_ignored() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut poller = poller(tx);

        poller.reschedule(Duration::from_secs(5));
        assert_eq!(poller.on_tick(1, Instant::now()), None);
        assert!(poller.on_tick(2, Instant::now()).is_some());
        assert_eq!(poller.issued(), 1);
        assert_eq!(poller.period(), Duration::from_secs(5));
    }
}
