//! HTTP access to the DNS capture backend.
//!
//! [`StatsBackend`] is the seam between the session controller and the
//! network: the controller only ever talks to a trait object, which lets the
//! tests substitute a scripted backend. [`HttpBackend`] is the production
//! implementation over `reqwest`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use dnsdash_shared::errors::{BackendError, BackendResult, ConfigError};
use dnsdash_shared::{
    api, BackendConfig, CaptureAck, CaptureRequest, ErrorBody, NetworkInterface, StatsSnapshot,
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

/// The three calls the dashboard makes against the capture backend.
#[async_trait]
pub trait StatsBackend: Send + Sync {
    /// `GET /api/interfaces`
    async fn list_interfaces(&self) -> BackendResult<Vec<NetworkInterface>>;

    /// `POST /api/capture`. Any 2xx answer is an acknowledgement.
    async fn start_capture(&self, interface: &str) -> BackendResult<CaptureAck>;

    /// `GET /api/stats`
    async fn fetch_stats(&self) -> BackendResult<StatsSnapshot>;
}

/// Errors raised while building the HTTP client.
#[derive(Error, Debug)]
pub enum ClientSetupError {
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// [`StatsBackend`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self, ClientSetupError> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientSetupError::HttpClient(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn request_error(url: &str, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout {
                url: url.to_string(),
            }
        } else {
            BackendError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// Reads the body of a response, turning non-2xx answers into
    /// [`BackendError::Status`] with the backend's own error message.
    async fn read_body(url: &str, response: reqwest::Response) -> BackendResult<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Self::request_error(url, e))?;

        if !status.is_success() {
            let message = ErrorBody::message_from(&body);
            warn!("Backend answered {} for {}: {}", status.as_u16(), url, message);
            return Err(BackendError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> BackendResult<T> {
        let url = self.config.endpoint(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::request_error(&url, e))?;
        let body = Self::read_body(&url, response).await?;

        serde_json::from_str(&body).map_err(|e| BackendError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl StatsBackend for HttpBackend {
    async fn list_interfaces(&self) -> BackendResult<Vec<NetworkInterface>> {
        self.get_json(api::INTERFACES).await
    }

    async fn start_capture(&self, interface: &str) -> BackendResult<CaptureAck> {
        let url = self.config.endpoint(api::CAPTURE);
        debug!("POST {} (interface={})", url, interface);

        let response = self
            .client
            .post(&url)
            .json(&CaptureRequest {
                interface: interface.to_string(),
            })
            .send()
            .await
            .map_err(|e| Self::request_error(&url, e))?;
        let body = Self::read_body(&url, response).await?;

        Ok(CaptureAck::from_body(&body))
    }

    async fn fetch_stats(&self) -> BackendResult<StatsSnapshot> {
        self.get_json(api::STATS).await
    }
}

/// Bounds a backend call by `timeout`, whatever the backend implementation.
///
/// `HttpBackend` already enforces the client timeout; this guard keeps the
/// session free of hung calls for any other [`StatsBackend`].
pub async fn with_deadline<T>(
    path: &str,
    timeout: Duration,
    call: impl Future<Output = BackendResult<T>>,
) -> BackendResult<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout {
            url: path.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_config() {
        let result = HttpBackend::new(BackendConfig::new("localhost:5000"));
        assert!(matches!(result, Err(ClientSetupError::InvalidConfig(_))));
    }

    #[test]
    fn test_builds_with_default_config() {
        let backend = HttpBackend::new(BackendConfig::default()).unwrap();
        assert_eq!(backend.config().base_url, BackendConfig::DEFAULT_URL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_deadline_times_out() {
        let result: BackendResult<()> = with_deadline(
            api::STATS,
            Duration::from_secs(2),
            std::future::pending(),
        )
        .await;
        assert_eq!(
            result,
            Err(BackendError::Timeout {
                url: api::STATS.to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_with_deadline_passes_result_through() {
        let result = with_deadline(api::STATS, Duration::from_secs(2), async { Ok(7u32) }).await;
        assert_eq!(result, Ok(7));
    }
}
