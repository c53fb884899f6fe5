//! Interface registry: the set of capturable interfaces offered to the operator.
//!
//! The list is replaced wholesale by each successful listing. A failed
//! listing empties it and records why, so the selector can show
//! "No active interfaces" and the operator can retry.

use std::sync::Arc;
use std::time::Duration;

use dnsdash_shared::errors::{DashboardError, DashboardResult};
use dnsdash_shared::{api, NetworkInterface};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::backend_client::{with_deadline, StatsBackend};
use crate::messages::SessionEvent;

/// Lists the backend's interfaces in the order it reports them.
pub async fn list_interfaces(
    backend: &dyn StatsBackend,
    timeout: Duration,
) -> DashboardResult<Vec<NetworkInterface>> {
    with_deadline(api::INTERFACES, timeout, backend.list_interfaces())
        .await
        .map_err(DashboardError::registry)
}

/// Where the registry's current list came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryStatus {
    /// A listing is in flight and nothing has been received yet
    Loading,
    Ready,
    /// The last listing failed; the list is empty
    Unavailable(String),
}

#[derive(Debug)]
pub struct InterfaceRegistry {
    interfaces: Vec<NetworkInterface>,
    status: RegistryStatus,
    /// Identifier of the most recent listing; older answers are ignored
    latest_request: u64,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self {
            interfaces: Vec::new(),
            status: RegistryStatus::Loading,
            latest_request: 0,
        }
    }

    /// Issues a new listing. The answer arrives as
    /// [`SessionEvent::InterfacesListed`].
    pub fn request(
        &mut self,
        backend: Arc<dyn StatsBackend>,
        timeout: Duration,
        events: UnboundedSender<SessionEvent>,
    ) {
        self.latest_request += 1;
        let request = self.latest_request;
        if self.interfaces.is_empty() {
            self.status = RegistryStatus::Loading;
        }
        debug!("Requesting interface list (request {})", request);

        tokio::spawn(async move {
            let result = list_interfaces(backend.as_ref(), timeout).await;
            let _ = events.send(SessionEvent::InterfacesListed { request, result });
        });
    }

    /// Applies a listing answer. Returns false when a newer request superseded it.
    pub fn apply(
        &mut self,
        request: u64,
        result: DashboardResult<Vec<NetworkInterface>>,
    ) -> bool {
        if request != self.latest_request {
            debug!(
                "Ignoring interface list from request {} (latest is {})",
                request, self.latest_request
            );
            return false;
        }

        match result {
            Ok(interfaces) => {
                info!("Backend reports {} interfaces", interfaces.len());
                self.interfaces = interfaces;
                self.status = RegistryStatus::Ready;
            }
            Err(e) => {
                warn!("{}", e);
                self.interfaces.clear();
                self.status = RegistryStatus::Unavailable(e.to_string());
            }
        }
        true
    }

    pub fn interfaces(&self) -> &[NetworkInterface] {
        &self.interfaces
    }

    pub fn status(&self) -> &RegistryStatus {
        &self.status
    }
}

impl Default for InterfaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
