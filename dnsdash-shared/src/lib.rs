//! Shared types and wire definitions for the dnsdash monitoring client.
//!
//! This crate contains the data structures exchanged with the DNS capture
//! backend over its HTTP/JSON contract, the validated configuration types the
//! frontend is built from, and the error taxonomy used across the client.
//!
//! # Key Components
//!
//! * [`api`] - Endpoint paths of the capture backend
//! * [`StatsSnapshot`] - Aggregated DNS statistics returned by `GET /api/stats`
//! * [`QueryRecord`] - One captured DNS request or response
//! * [`CaptureRequest`]/[`CaptureAck`] - Capture start request and its acknowledgement
//! * [`PollingInterval`] - Validated polling period in seconds
//! * [`BackendConfig`] - Base URL and request timeout of the backend
//!
//! # Communication Patterns
//!
//! ```text
//! Frontend                                Backend
//!    │ ──── GET  /api/interfaces ───────► │
//!    │ ◄─── ["eth0", "lo", ...] ───────── │
//!    │                                    │
//!    │ ──── POST /api/capture ──────────► │   {"interface": "eth0"}
//!    │ ◄─── 2xx {"status": ...} ───────── │
//!    │                                    │
//!    │ ──── GET  /api/stats (periodic) ─► │
//!    │ ◄─── StatsSnapshot ─────────────── │
//! ```
//!
use std::fmt;
use std::time::Duration;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};

pub mod errors;

use errors::{ConfigError, ConfigResult};

/// Endpoint paths of the capture backend
pub mod api {
    /// `GET` → JSON array of interface names
    pub const INTERFACES: &str = "/api/interfaces";
    /// `POST` with `{"interface": <name>}` → acknowledgement
    pub const CAPTURE: &str = "/api/capture";
    /// `GET` → [`crate::StatsSnapshot`]
    pub const STATS: &str = "/api/stats";

    /// Joins a base URL and an endpoint path without doubling the slash.
    pub fn endpoint(base_url: &str, path: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), path)
    }
}

/// Name of a capturable network interface as reported by the backend.
pub type NetworkInterface = String;

/// Polling period of the stats poller, in whole seconds.
///
/// Always within `[PollingInterval::MIN_SECS, PollingInterval::MAX_SECS]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PollingInterval(u32);

impl PollingInterval {
    pub const MIN_SECS: u32 = 1;
    pub const MAX_SECS: u32 = 120;
    pub const DEFAULT_SECS: u32 = 10;

    /// Creates a polling interval, rejecting values outside `[1, 120]`.
    pub fn new(seconds: i64) -> ConfigResult<Self> {
        if seconds < i64::from(Self::MIN_SECS) || seconds > i64::from(Self::MAX_SECS) {
            return Err(ConfigError::IntervalOutOfRange {
                value: seconds,
                min: Self::MIN_SECS,
                max: Self::MAX_SECS,
            });
        }
        Ok(Self(seconds as u32))
    }

    pub fn seconds(self) -> u32 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(u64::from(self.0))
    }
}

impl Default for PollingInterval {
    fn default() -> Self {
        Self(Self::DEFAULT_SECS)
    }
}

impl fmt::Display for PollingInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Connection settings for the capture backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackendConfig {
    /// Base URL, e.g. `http://127.0.0.1:5000`
    pub base_url: String,
    /// Upper bound for every backend call; exceeding it is an error
    pub request_timeout: Duration,
    /// Polling interval the session starts with
    pub initial_interval: PollingInterval,
}

impl BackendConfig {
    pub const DEFAULT_URL: &'static str = "http://127.0.0.1:5000";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
    pub const MAX_TIMEOUT_SECS: u64 = 300;

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_initial_interval(mut self, interval: PollingInterval) -> Self {
        self.initial_interval = interval;
        self
    }

    /// Full URL of an endpoint from [`api`].
    pub fn endpoint(&self, path: &str) -> String {
        api::endpoint(&self.base_url, path)
    }

    /// Validates the base URL scheme/host and the request timeout.
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |reason: &str| ConfigError::InvalidBackendUrl {
            url: self.base_url.clone(),
            reason: reason.to_string(),
        };

        let rest = self
            .base_url
            .strip_prefix("http://")
            .or_else(|| self.base_url.strip_prefix("https://"))
            .ok_or_else(|| invalid("expected an http:// or https:// URL"))?;

        let authority = rest.split('/').next().unwrap_or_default();
        let host = authority.rsplit_once(':').map_or(authority, |(host, _)| host);
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        if let Some((_, port)) = authority.rsplit_once(':') {
            if port.parse::<u16>().is_err() {
                return Err(invalid("port must be a number between 0 and 65535"));
            }
        }

        let timeout_secs = self.request_timeout.as_secs();
        if self.request_timeout.is_zero() || timeout_secs > Self::MAX_TIMEOUT_SECS {
            return Err(ConfigError::InvalidTimeout {
                value: timeout_secs,
                max: Self::MAX_TIMEOUT_SECS,
            });
        }

        Ok(())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_URL.to_string(),
            request_timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            initial_interval: PollingInterval::default(),
        }
    }
}

/// Label → count mapping that keeps the backend's document order.
///
/// The backend decides the ordering of every aggregate; the client never
/// re-sorts, so a plain hash map is not an option here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts(Vec<(String, u64)>);

impl CategoryCounts {
    pub fn new(entries: Vec<(String, u64)>) -> Self {
        Self(entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(label, count)| (label.as_str(), *count))
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.iter()
            .find_map(|(candidate, count)| (candidate == label).then_some(count))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for CategoryCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(label, count)| (label, count)))
    }
}

impl<'de> Deserialize<'de> for CategoryCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CategoryCountsVisitor;

        impl<'de> Visitor<'de> for CategoryCountsVisitor {
            type Value = CategoryCounts;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping labels to counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((label, count)) = map.next_entry::<String, u64>()? {
                    entries.push((label, count));
                }
                Ok(CategoryCounts(entries))
            }
        }

        deserializer.deserialize_map(CategoryCountsVisitor)
    }
}

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// One point of the per-minute query time series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBucket {
    /// ISO-8601 timestamp, `YYYY-MM-DDTHH:MM:SS...`
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub count: u64,
}

/// DNS query type or response code as emitted by the backend.
///
/// The backend sends raw numbers for individual records and mnemonic
/// strings as aggregate labels, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DnsCode {
    Numeric(u16),
    Text(String),
}

impl DnsCode {
    /// Mnemonic for a response code (`3` → `NXDOMAIN`).
    pub fn rcode_label(&self) -> String {
        match self {
            DnsCode::Numeric(code) => rcode_name(*code),
            DnsCode::Text(text) => text.clone(),
        }
    }

    /// Mnemonic for a query type (`28` → `AAAA`).
    pub fn qtype_label(&self) -> String {
        match self {
            DnsCode::Numeric(code) => qtype_name(*code),
            DnsCode::Text(text) => text.clone(),
        }
    }
}

impl fmt::Display for DnsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsCode::Numeric(code) => write!(f, "{}", code),
            DnsCode::Text(text) => f.write_str(text),
        }
    }
}

/// Response code mnemonic, using the same names the backend uses for
/// `queries_by_rcode` labels.
pub fn rcode_name(code: u16) -> String {
    match code {
        0 => "NOERROR",
        1 => "FORMERR",
        2 => "SERVFAIL",
        3 => "NXDOMAIN",
        4 => "NOTIMP",
        5 => "REFUSED",
        other => return other.to_string(),
    }
    .to_string()
}

/// Query type mnemonic for the common record types.
pub fn qtype_name(code: u16) -> String {
    match code {
        1 => "A",
        2 => "NS",
        5 => "CNAME",
        6 => "SOA",
        12 => "PTR",
        15 => "MX",
        16 => "TXT",
        28 => "AAAA",
        33 => "SRV",
        65 => "HTTPS",
        255 => "ANY",
        other => return other.to_string(),
    }
    .to_string()
}

/// One captured DNS packet (request or response).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    #[serde(default)]
    pub timestamp: String,
    pub src_ip: Option<String>,
    pub dst_ip: Option<String>,
    #[serde(default)]
    pub qname: String,
    pub qtype: Option<DnsCode>,
    pub protocol: Option<String>,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    pub rcode: Option<DnsCode>,
    /// True for responses, false for requests
    #[serde(default)]
    pub response: bool,
}

/// Aggregated statistics returned by `GET /api/stats`.
///
/// Immutable once received: a new fetch produces a new snapshot that
/// replaces the previous one wholesale. Aggregates that are missing or
/// `null` in the payload deserialize as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_queries: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub top_domains: Vec<(String, u64)>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub top_clients: Vec<(String, u64)>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub queries_by_type: CategoryCounts,
    #[serde(default, deserialize_with = "null_as_default")]
    pub queries_by_protocol: CategoryCounts,
    #[serde(default, deserialize_with = "null_as_default")]
    pub queries_by_rcode: CategoryCounts,
    #[serde(default, deserialize_with = "null_as_default")]
    pub queries_by_port: CategoryCounts,
    #[serde(default, deserialize_with = "null_as_default")]
    pub queries_over_time: Vec<TimeBucket>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recent_queries: Vec<QueryRecord>,
}

/// Body of `POST /api/capture`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub interface: String,
}

/// How the backend acknowledged a capture request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    Started,
    AlreadyCapturing,
    /// 2xx with a body this client does not recognise
    Unknown(String),
}

/// Successful (2xx) answer to a capture request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureAck {
    pub status: CaptureStatus,
    pub interface: Option<String>,
}

#[derive(Deserialize)]
struct CaptureReply {
    status: Option<String>,
    interface: Option<String>,
}

impl CaptureAck {
    /// Interprets a 2xx body. Any 2xx is an acknowledgement, so an
    /// unreadable body still yields an ack with [`CaptureStatus::Unknown`].
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<CaptureReply>(body) {
            Ok(reply) => {
                let status = match reply.status.as_deref() {
                    Some("capture_started") => CaptureStatus::Started,
                    Some("already capturing") => CaptureStatus::AlreadyCapturing,
                    Some(other) => CaptureStatus::Unknown(other.to_string()),
                    None => CaptureStatus::Unknown(String::new()),
                };
                Self {
                    status,
                    interface: reply.interface,
                }
            }
            Err(_) => Self {
                status: CaptureStatus::Unknown(body.trim().to_string()),
                interface: None,
            },
        }
    }
}

/// Error body the backend attaches to non-2xx answers.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    /// Extracts the `error` message from a body, falling back to the raw text.
    pub fn message_from(body: &str) -> String {
        serde_json::from_str::<ErrorBody>(body)
            .map(|parsed| parsed.error)
            .unwrap_or_else(|_| body.trim().to_string())
    }
}
