use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dnsdash_frontend::backend_client::StatsBackend;
use dnsdash_shared::errors::{BackendError, BackendResult};
use dnsdash_shared::{CaptureAck, CaptureStatus, NetworkInterface, StatsSnapshot};
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallKind {
    ListInterfaces,
    StartCapture(String),
    FetchStats,
}

#[derive(Debug, Clone)]
pub struct BackendCall {
    pub kind: CallKind,
    pub at: Instant,
}

/// Scriptable [`StatsBackend`].
///
/// Stats answers are numbered: the n-th `fetch_stats` call returns a
/// snapshot with `total_queries == n`, which lets tests tell which fetch
/// ended up on screen.
pub struct MockStatsBackend {
    interfaces: Arc<RwLock<BackendResult<Vec<NetworkInterface>>>>,
    calls: Arc<RwLock<Vec<BackendCall>>>,
    fetch_count: Arc<AtomicU64>,
    capture_count: Arc<AtomicU64>,
    capture_delays: Arc<RwLock<HashMap<String, Duration>>>,
    failing_captures: Arc<RwLock<HashSet<String>>>,
    already_capturing: Arc<RwLock<bool>>,
    /// Latency of successive fetches; empty means instant
    fetch_delays: Arc<RwLock<VecDeque<Duration>>>,
    /// Fetch numbers (1-based) that fail
    failing_fetches: Arc<RwLock<HashSet<u64>>>,
}

impl MockStatsBackend {
    pub fn new() -> Self {
        Self::with_interfaces(&["eth0", "lo"])
    }

    pub fn with_interfaces(interfaces: &[&str]) -> Self {
        Self {
            interfaces: Arc::new(RwLock::new(Ok(interfaces
                .iter()
                .map(|name| name.to_string())
                .collect()))),
            calls: Arc::new(RwLock::new(Vec::new())),
            fetch_count: Arc::new(AtomicU64::new(0)),
            capture_count: Arc::new(AtomicU64::new(0)),
            capture_delays: Arc::new(RwLock::new(HashMap::new())),
            failing_captures: Arc::new(RwLock::new(HashSet::new())),
            already_capturing: Arc::new(RwLock::new(false)),
            fetch_delays: Arc::new(RwLock::new(VecDeque::new())),
            failing_fetches: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            interfaces: Arc::new(RwLock::new(Err(connection_refused("/api/interfaces")))),
            ..Self::new()
        }
    }

    pub async fn set_interfaces(&self, interfaces: &[&str]) {
        *self.interfaces.write().await =
            Ok(interfaces.iter().map(|name| name.to_string()).collect());
    }

    pub async fn set_capture_delay(&self, interface: &str, delay: Duration) {
        self.capture_delays
            .write()
            .await
            .insert(interface.to_string(), delay);
    }

    pub async fn fail_capture_on(&self, interface: &str) {
        self.failing_captures
            .write()
            .await
            .insert(interface.to_string());
    }

    pub async fn set_already_capturing(&self, value: bool) {
        *self.already_capturing.write().await = value;
    }

    pub async fn push_fetch_delays(&self, delays: &[Duration]) {
        self.fetch_delays.write().await.extend(delays.iter().copied());
    }

    pub async fn fail_fetch(&self, number: u64) {
        self.failing_fetches.write().await.insert(number);
    }

    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn capture_count(&self) -> u64 {
        self.capture_count.load(Ordering::SeqCst)
    }

    pub async fn calls(&self) -> Vec<BackendCall> {
        self.calls.read().await.clone()
    }

    async fn record(&self, kind: CallKind) {
        self.calls.write().await.push(BackendCall {
            kind,
            at: Instant::now(),
        });
    }
}

fn connection_refused(path: &str) -> BackendError {
    BackendError::Transport {
        url: format!("http://127.0.0.1:5000{}", path),
        message: "connection refused".to_string(),
    }
}

#[async_trait]
impl StatsBackend for MockStatsBackend {
    async fn list_interfaces(&self) -> BackendResult<Vec<NetworkInterface>> {
        self.record(CallKind::ListInterfaces).await;
        self.interfaces.read().await.clone()
    }

    async fn start_capture(&self, interface: &str) -> BackendResult<CaptureAck> {
        self.record(CallKind::StartCapture(interface.to_string()))
            .await;
        self.capture_count.fetch_add(1, Ordering::SeqCst);

        let delay = self.capture_delays.read().await.get(interface).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_captures.read().await.contains(interface) {
            return Err(BackendError::Status {
                url: "http://127.0.0.1:5000/api/capture".to_string(),
                status: 500,
                message: format!("no such device: {}", interface),
            });
        }

        let status = if *self.already_capturing.read().await {
            CaptureStatus::AlreadyCapturing
        } else {
            CaptureStatus::Started
        };
        Ok(CaptureAck {
            status,
            interface: Some(interface.to_string()),
        })
    }

    async fn fetch_stats(&self) -> BackendResult<StatsSnapshot> {
        self.record(CallKind::FetchStats).await;
        let number = self.fetch_count.fetch_add(1, Ordering::SeqCst) + 1;

        let delay = self.fetch_delays.write().await.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_fetches.read().await.contains(&number) {
            return Err(BackendError::Status {
                url: "http://127.0.0.1:5000/api/stats".to_string(),
                status: 500,
                message: "capture thread crashed".to_string(),
            });
        }

        Ok(StatsSnapshot {
            total_queries: number,
            ..StatsSnapshot::default()
        })
    }
}
