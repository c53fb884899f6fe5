use dnsdash_shared::errors::DashboardResult;
use dnsdash_shared::{CaptureAck, NetworkInterface, StatsSnapshot};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::poller::FetchTicket;
use crate::session::{Epoch, SessionStatus};

/// Operator intent delivered to the session controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorAction {
    SelectInterface(NetworkInterface),
    StartMonitoring,
    StopMonitoring,
    /// Raw seconds as entered; validated by the controller
    SetPollingInterval(i64),
    RefreshInterfaces,
}

/// Completions of background work, posted to the session controller.
///
/// Every variant carries the identity of the work that produced it so the
/// controller can drop results that belong to a superseded request.
#[derive(Debug)]
pub enum SessionEvent {
    InterfacesListed {
        request: u64,
        result: DashboardResult<Vec<NetworkInterface>>,
    },
    CaptureFinished {
        epoch: Epoch,
        result: DashboardResult<CaptureAck>,
    },
    PollTick {
        epoch: Epoch,
        timer: u64,
        scheduled_at: Instant,
    },
    StatsFetched {
        ticket: FetchTicket,
        result: DashboardResult<StatsSnapshot>,
    },
}

/// Events emitted by the session subscription to the GUI
#[derive(Debug, Clone)]
pub enum RunnerEvent {
    /// The controller is running and accepts actions on this channel
    ControllerReady(mpsc::UnboundedSender<OperatorAction>),
    StatusChanged(Box<SessionStatus>),
    /// The controller could not be started
    StartupFailed(String),
}

/// Frontend application messages
#[derive(Debug, Clone)]
pub enum DashMessage {
    Runner(RunnerEvent),
    InterfaceSelected(NetworkInterface),
    StartMonitoring,
    StopMonitoring,
    PollingInputChanged(String),
    PollingInputSubmitted,
    RefreshInterfaces,
    NextPage,
    PreviousPage,
    RowsPerPageSelected(usize),
    DismissNotice,
}
