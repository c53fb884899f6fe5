//! Capture trigger: asks the backend to start capturing on an interface.
//!
//! Runs once per activation. The outcome is reported back to the session
//! controller tagged with the activation epoch, so an answer that arrives
//! after the operator moved on is recognised and ignored.

use std::sync::Arc;
use std::time::Duration;

use dnsdash_shared::errors::{DashboardError, DashboardResult};
use dnsdash_shared::{api, CaptureAck, CaptureStatus};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend_client::{with_deadline, StatsBackend};
use crate::messages::SessionEvent;
use crate::session::Epoch;

/// Starts capture on `interface`. Fails with [`DashboardError::Capture`] on
/// any transport error, non-2xx answer or timeout.
pub async fn start_capture(
    backend: &dyn StatsBackend,
    interface: &str,
    timeout: Duration,
) -> DashboardResult<CaptureAck> {
    let ack = with_deadline(api::CAPTURE, timeout, backend.start_capture(interface))
        .await
        .map_err(|e| DashboardError::capture(interface, e))?;

    match &ack.status {
        CaptureStatus::Started => info!("Capture started on {}", interface),
        CaptureStatus::AlreadyCapturing => {
            // The backend keeps capturing on its current interface.
            warn!(
                "Backend reports it is already capturing; {} may not be the captured interface",
                interface
            );
        }
        CaptureStatus::Unknown(status) => {
            info!("Capture acknowledged on {} (status: {:?})", interface, status)
        }
    }

    Ok(ack)
}

/// Spawns the capture request of one activation.
///
/// The task stops silently when `cancel` fires; otherwise it posts
/// [`SessionEvent::CaptureFinished`] exactly once.
pub fn spawn_capture(
    backend: Arc<dyn StatsBackend>,
    epoch: Epoch,
    interface: String,
    timeout: Duration,
    cancel: CancellationToken,
    events: UnboundedSender<SessionEvent>,
) {
    tokio::spawn(async move {
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(interface = %interface, epoch = %epoch, "Capture request cancelled");
                return;
            }
            result = start_capture(backend.as_ref(), &interface, timeout) => result,
        };

        let _ = events.send(SessionEvent::CaptureFinished { epoch, result });
    });
}

/// Operator-facing note for acknowledgements that are not a plain start.
pub fn capture_note(interface: &str, ack: &CaptureAck) -> Option<String> {
    match &ack.status {
        CaptureStatus::Started => None,
        CaptureStatus::AlreadyCapturing => Some(format!(
            "The backend was already capturing; statistics may come from another interface than {}.",
            interface
        )),
        CaptureStatus::Unknown(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dnsdash_shared::errors::BackendResult;
    use dnsdash_shared::{NetworkInterface, StatsSnapshot};
    use tokio::sync::mpsc;

    struct SlowCaptureBackend;

    #[async_trait]
    impl StatsBackend for SlowCaptureBackend {
        async fn list_interfaces(&self) -> BackendResult<Vec<NetworkInterface>> {
            Ok(Vec::new())
        }

        async fn start_capture(&self, interface: &str) -> BackendResult<CaptureAck> {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok(CaptureAck {
                status: CaptureStatus::Started,
                interface: Some(interface.to_string()),
            })
        }

        async fn fetch_stats(&self) -> BackendResult<StatsSnapshot> {
            Ok(StatsSnapshot::default())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_capture_reports_with_epoch() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let epoch = Epoch::default().next();
        spawn_capture(
            Arc::new(SlowCaptureBackend),
            epoch,
            "eth0".to_string(),
            Duration::from_secs(5),
            CancellationToken::new(),
            tx,
        );

        match rx.recv().await {
            Some(SessionEvent::CaptureFinished { epoch: got, result }) => {
                assert_eq!(got, epoch);
                assert_eq!(result.unwrap().status, CaptureStatus::Started);
            }
            other => panic!("expected capture result, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_capture_reports_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        spawn_capture(
            Arc::new(SlowCaptureBackend),
            Epoch::default().next(),
            "eth0".to_string(),
            Duration::from_secs(5),
            cancel.clone(),
            tx,
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        cancel.cancel();

        // The sender is dropped with the task, so the channel closes empty
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_capture_note_only_for_already_capturing() {
        let started = CaptureAck {
            status: CaptureStatus::Started,
            interface: Some("eth0".to_string()),
        };
        assert_eq!(capture_note("eth0", &started), None);

        let already = CaptureAck {
            status: CaptureStatus::AlreadyCapturing,
            interface: None,
        };
        let note = capture_note("wlan0", &already).unwrap();
        assert!(note.contains("wlan0"));
    }
}
