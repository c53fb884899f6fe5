use thiserror::Error;

/// Failure of a single HTTP call to the capture backend.
///
/// Carries rendered messages rather than the underlying client error so the
/// value can travel inside GUI messages (which must be `Clone`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("backend returned HTTP {status} for {url}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("unexpected payload from {url}: {message}")]
    Decode { url: String, message: String },
}

impl BackendError {
    /// Returns the URL of the request that failed.
    pub fn url(&self) -> &str {
        match self {
            BackendError::Transport { url, .. }
            | BackendError::Timeout { url }
            | BackendError::Status { url, .. }
            | BackendError::Decode { url, .. } => url,
        }
    }

    /// True when the backend answered but the body did not have the expected shape.
    pub fn is_decode(&self) -> bool {
        matches!(self, BackendError::Decode { .. })
    }
}

/// Operator-facing error taxonomy of the dashboard.
///
/// Every backend failure is converted into one of these at the component
/// boundary (registry, capture trigger, poller) before it reaches the
/// session controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DashboardError {
    #[error("could not list capture interfaces: {source}")]
    Registry {
        #[source]
        source: BackendError,
    },

    #[error("capture could not be started on {interface}: {source}")]
    Capture {
        interface: String,
        #[source]
        source: BackendError,
    },

    #[error("stats unavailable: {source}")]
    Fetch {
        #[source]
        source: BackendError,
    },

    #[error("stats payload malformed: {source}")]
    MalformedResponse {
        #[source]
        source: BackendError,
    },
}

impl DashboardError {
    /// Classifies a failed stats fetch. Decode failures are malformed
    /// responses, everything else is a plain fetch error.
    pub fn fetch(source: BackendError) -> Self {
        if source.is_decode() {
            DashboardError::MalformedResponse { source }
        } else {
            DashboardError::Fetch { source }
        }
    }

    pub fn capture(interface: impl Into<String>, source: BackendError) -> Self {
        DashboardError::Capture {
            interface: interface.into(),
            source,
        }
    }

    pub fn registry(source: BackendError) -> Self {
        DashboardError::Registry { source }
    }
}

/// Configuration and input validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("polling interval must be between {min} and {max} seconds, got {value}")]
    IntervalOutOfRange { value: i64, min: u32, max: u32 },

    #[error("invalid backend URL '{url}': {reason}")]
    InvalidBackendUrl { url: String, reason: String },

    #[error("request timeout must be between 1 and {max} seconds, got {value}")]
    InvalidTimeout { value: u64, max: u64 },
}

/// Result type aliases for convenience
pub type BackendResult<T> = Result<T, BackendError>;
pub type DashboardResult<T> = Result<T, DashboardError>;
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_error() -> BackendError {
        BackendError::Decode {
            url: "http://127.0.0.1:5000/api/stats".to_string(),
            message: "expected an object".to_string(),
        }
    }

    #[test]
    fn test_fetch_classifies_decode_as_malformed() {
        let err = DashboardError::fetch(decode_error());
        assert!(matches!(err, DashboardError::MalformedResponse { .. }));
    }

    #[test]
    fn test_fetch_classifies_transport_as_fetch() {
        let err = DashboardError::fetch(BackendError::Timeout {
            url: "http://127.0.0.1:5000/api/stats".to_string(),
        });
        assert!(matches!(err, DashboardError::Fetch { .. }));
        assert_eq!(
            err.to_string(),
            "stats unavailable: request to http://127.0.0.1:5000/api/stats timed out"
        );
    }

    #[test]
    fn test_capture_error_message_names_interface() {
        let err = DashboardError::capture(
            "eth0",
            BackendError::Status {
                url: "http://127.0.0.1:5000/api/capture".to_string(),
                status: 400,
                message: "interface is required".to_string(),
            },
        );
        let message = err.to_string();
        assert!(message.contains("eth0"));
        assert!(message.contains("HTTP 400"));
        assert!(message.contains("interface is required"));
    }

    #[test]
    fn test_backend_error_url() {
        assert_eq!(decode_error().url(), "http://127.0.0.1:5000/api/stats");
    }
}
