//! Main application state and message handling for the DNS dashboard.
//!
//! Follows the Elm architecture used by Iced. The application itself holds
//! no session logic: operator intent is forwarded to the session controller
//! as [`OperatorAction`]s, and the controller's [`SessionStatus`] is what the
//! view draws.
//!
//! # Message Flow
//!
//! ```text
//! widgets ──► DashMessage ──► OperatorAction ──► SessionController
//!                                                       │
//! view ◄── SessionStatus ◄── RunnerEvent ◄──────────────┘
//! ```

use dnsdash_shared::BackendConfig;
use iced::{Element, Subscription, Task};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::messages::{DashMessage, OperatorAction, RunnerEvent};
use crate::session::SessionStatus;
use crate::session_runner;
use crate::ui_state::UiStateManager;
use crate::view::render_main_view;

pub struct DnsDashboard {
    config: BackendConfig,
    /// Action channel of the running controller
    actions: Option<mpsc::UnboundedSender<OperatorAction>>,
    /// Latest status published by the controller
    status: Option<SessionStatus>,
    startup_error: Option<String>,
    ui_state: UiStateManager,
}

impl DnsDashboard {
    pub fn new(config: BackendConfig) -> (Self, Task<DashMessage>) {
        let app = Self {
            config,
            actions: None,
            status: None,
            startup_error: None,
            ui_state: UiStateManager::new(),
        };

        (app, Task::none())
    }

    pub fn status(&self) -> Option<&SessionStatus> {
        self.status.as_ref()
    }

    pub fn update(&mut self, message: DashMessage) -> Task<DashMessage> {
        match message {
            DashMessage::Runner(event) => self.handle_runner_event(event),

            DashMessage::InterfaceSelected(interface) => {
                self.send(OperatorAction::SelectInterface(interface))
            }
            DashMessage::StartMonitoring => self.send(OperatorAction::StartMonitoring),
            DashMessage::StopMonitoring => self.send(OperatorAction::StopMonitoring),
            DashMessage::RefreshInterfaces => self.send(OperatorAction::RefreshInterfaces),

            DashMessage::PollingInputChanged(input) => self.ui_state.set_polling_input(input),
            DashMessage::PollingInputSubmitted => {
                if let Some(seconds) = self.ui_state.parse_polling_input() {
                    self.send(OperatorAction::SetPollingInterval(seconds));
                }
            }

            DashMessage::NextPage => {
                let rows = self.recent_query_count();
                self.ui_state.next_page(rows);
            }
            DashMessage::PreviousPage => self.ui_state.previous_page(),
            DashMessage::RowsPerPageSelected(rows) => self.ui_state.set_rows_per_page(rows),

            DashMessage::DismissNotice => {
                let notice = self.status.as_ref().and_then(|s| s.notice.as_deref());
                self.ui_state.dismiss_notice(notice);
            }
        }

        Task::none()
    }

    fn handle_runner_event(&mut self, event: RunnerEvent) {
        match event {
            RunnerEvent::ControllerReady(sender) => {
                debug!("Session controller ready");
                self.actions = Some(sender);
                self.startup_error = None;
            }
            RunnerEvent::StatusChanged(status) => {
                self.ui_state.sync(&status);
                self.status = Some(*status);
            }
            RunnerEvent::StartupFailed(reason) => {
                self.startup_error = Some(reason);
            }
        }
    }

    fn send(&self, action: OperatorAction) {
        match &self.actions {
            Some(sender) => {
                if sender.send(action).is_err() {
                    warn!("Session controller is gone; action dropped");
                }
            }
            None => warn!("Session controller not ready; dropping {:?}", action),
        }
    }

    fn recent_query_count(&self) -> usize {
        self.status
            .as_ref()
            .and_then(|status| status.snapshot.as_ref())
            .map_or(0, |snapshot| snapshot.recent_queries.len())
    }

    pub fn view(&self) -> Element<'_, DashMessage> {
        render_main_view(
            self.status.as_ref(),
            &self.ui_state,
            self.startup_error.as_deref(),
        )
    }

    /// Hosts the session controller for the configured backend.
    pub fn subscription(&self) -> Subscription<DashMessage> {
        session_runner::subscription(&self.config).map(DashMessage::Runner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface_registry::RegistryStatus;
    use crate::session::{SessionPhase, StatsAvailability};
    use dnsdash_shared::PollingInterval;

    fn ready_app() -> (DnsDashboard, mpsc::UnboundedReceiver<OperatorAction>) {
        let (mut app, _) = DnsDashboard::new(BackendConfig::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = app.update(DashMessage::Runner(RunnerEvent::ControllerReady(tx)));
        (app, rx)
    }

    fn idle_status() -> SessionStatus {
        SessionStatus {
            phase: SessionPhase::Idle,
            interface: Some("eth0".to_string()),
            activation: None,
            polling_interval: PollingInterval::default(),
            interfaces: vec!["eth0".to_string(), "lo".to_string()],
            registry: RegistryStatus::Ready,
            snapshot: None,
            stats: StatsAvailability::Waiting,
            error: None,
            notice: Some("The backend was already capturing".to_string()),
        }
    }

    #[test]
    fn test_widget_messages_become_actions() {
        let (mut app, mut rx) = ready_app();

        let _ = app.update(DashMessage::InterfaceSelected("eth0".to_string()));
        let _ = app.update(DashMessage::StartMonitoring);
        let _ = app.update(DashMessage::StopMonitoring);
        let _ = app.update(DashMessage::RefreshInterfaces);

        assert_eq!(
            rx.try_recv().unwrap(),
            OperatorAction::SelectInterface("eth0".to_string())
        );
        assert_eq!(rx.try_recv().unwrap(), OperatorAction::StartMonitoring);
        assert_eq!(rx.try_recv().unwrap(), OperatorAction::StopMonitoring);
        assert_eq!(rx.try_recv().unwrap(), OperatorAction::RefreshInterfaces);
    }

    #[test]
    fn test_polling_input_submission() {
        let (mut app, mut rx) = ready_app();

        let _ = app.update(DashMessage::PollingInputChanged("abc".to_string()));
        let _ = app.update(DashMessage::PollingInputSubmitted);
        assert!(rx.try_recv().is_err());

        let _ = app.update(DashMessage::PollingInputChanged("5".to_string()));
        let _ = app.update(DashMessage::PollingInputSubmitted);
        assert_eq!(rx.try_recv().unwrap(), OperatorAction::SetPollingInterval(5));
    }

    #[test]
    fn test_status_update_and_notice_dismissal() {
        let (mut app, _rx) = ready_app();
        let _ = app.update(DashMessage::Runner(RunnerEvent::StatusChanged(Box::new(
            idle_status(),
        ))));

        let status = app.status().unwrap();
        assert_eq!(status.phase, SessionPhase::Idle);
        assert!(app.ui_state.visible_notice(status).is_some());

        let _ = app.update(DashMessage::DismissNotice);
        let status = app.status().unwrap();
        assert!(app.ui_state.visible_notice(status).is_none());
    }

    #[test]
    fn test_actions_before_ready_are_dropped() {
        let (mut app, _) = DnsDashboard::new(BackendConfig::default());
        let _ = app.update(DashMessage::StartMonitoring);
        assert!(app.status().is_none());
    }
}
