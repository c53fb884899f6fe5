//! UI state management for the dashboard.
//!
//! Holds the state that belongs to the view only: table pagination, the
//! polling-interval text field, and which notice the operator dismissed.
//! None of it is sent to the session controller.

use dnsdash_shared::PollingInterval;

use crate::presentation::PaginationState;
use crate::session::SessionStatus;

/// Manager for view-local state.
#[derive(Debug, Clone, Default)]
pub struct UiStateManager {
    pagination: PaginationState,
    /// Text currently in the polling interval field
    polling_input: String,
    /// Parse error of the polling interval field
    input_error: Option<String>,
    /// Notice text the operator closed; hidden until a different one appears
    dismissed_notice: Option<String>,
    /// Interval last reported by the session
    known_interval: Option<PollingInterval>,
}

impl UiStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    pub fn next_page(&mut self, total_rows: usize) {
        self.pagination.next_page(total_rows);
    }

    pub fn previous_page(&mut self) {
        self.pagination.previous_page();
    }

    pub fn set_rows_per_page(&mut self, rows_per_page: usize) {
        self.pagination.set_rows_per_page(rows_per_page);
    }

    pub fn polling_input(&self) -> &str {
        &self.polling_input
    }

    pub fn set_polling_input(&mut self, input: String) {
        self.polling_input = input;
        self.input_error = None;
    }

    pub fn input_error(&self) -> Option<&str> {
        self.input_error.as_deref()
    }

    /// Parses the polling field as whole seconds. Range checking is left to
    /// the session, which keeps the previous interval on rejection.
    pub fn parse_polling_input(&mut self) -> Option<i64> {
        match self.polling_input.trim().parse::<i64>() {
            Ok(seconds) => {
                self.input_error = None;
                Some(seconds)
            }
            Err(_) => {
                self.input_error = Some(format!(
                    "'{}' is not a whole number of seconds",
                    self.polling_input.trim()
                ));
                None
            }
        }
    }

    /// Reconciles view state with a new session status.
    pub fn sync(&mut self, status: &SessionStatus) {
        let rows = status
            .snapshot
            .as_ref()
            .map_or(0, |snapshot| snapshot.recent_queries.len());
        self.pagination.clamp_to(rows);

        if self.known_interval != Some(status.polling_interval) {
            self.known_interval = Some(status.polling_interval);
            self.polling_input = status.polling_interval.seconds().to_string();
            self.input_error = None;
        }
    }

    pub fn dismiss_notice(&mut self, notice: Option<&str>) {
        self.dismissed_notice = notice.map(str::to_string);
    }

    /// The session notice, unless the operator dismissed this exact text.
    pub fn visible_notice<'a>(&self, status: &'a SessionStatus) -> Option<&'a str> {
        status
            .notice
            .as_deref()
            .filter(|notice| self.dismissed_notice.as_deref() != Some(*notice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface_registry::RegistryStatus;
    use crate::session::{SessionPhase, StatsAvailability};
    use dnsdash_shared::{QueryRecord, StatsSnapshot};
    use std::sync::Arc;

    fn status_with_rows(rows: usize, interval: i64) -> SessionStatus {
        let record = QueryRecord {
            timestamp: "2024-05-01T10:15:02Z".to_string(),
            src_ip: None,
            dst_ip: None,
            qname: "example.com.".to_string(),
            qtype: None,
            protocol: None,
            src_port: None,
            dst_port: None,
            rcode: None,
            response: false,
        };
        SessionStatus {
            phase: SessionPhase::Monitoring,
            interface: Some("eth0".to_string()),
            activation: None,
            polling_interval: PollingInterval::new(interval).unwrap(),
            interfaces: vec!["eth0".to_string()],
            registry: RegistryStatus::Ready,
            snapshot: Some(Arc::new(StatsSnapshot {
                recent_queries: vec![record; rows],
                ..StatsSnapshot::default()
            })),
            stats: StatsAvailability::Fresh,
            error: None,
            notice: None,
        }
    }

    #[test]
    fn test_sync_clamps_page_and_fills_interval() {
        let mut ui = UiStateManager::new();
        ui.sync(&status_with_rows(12, 10));
        assert_eq!(ui.polling_input(), "10");

        ui.next_page(12);
        assert_eq!(ui.pagination().page(), 1);

        ui.sync(&status_with_rows(5, 10));
        assert_eq!(ui.pagination().page(), 0);
    }

    #[test]
    fn test_sync_keeps_edit_in_progress() {
        let mut ui = UiStateManager::new();
        ui.sync(&status_with_rows(0, 10));
        ui.set_polling_input("3".to_string());

        ui.sync(&status_with_rows(0, 10));
        assert_eq!(ui.polling_input(), "3");

        ui.sync(&status_with_rows(0, 3));
        assert_eq!(ui.polling_input(), "3");
    }

    #[test]
    fn test_parse_polling_input() {
        let mut ui = UiStateManager::new();
        ui.set_polling_input(" 15 ".to_string());
        assert_eq!(ui.parse_polling_input(), Some(15));

        ui.set_polling_input("fast".to_string());
        assert_eq!(ui.parse_polling_input(), None);
        assert!(ui.input_error().is_some());
    }

    #[test]
    fn test_dismissed_notice_stays_hidden() {
        let mut ui = UiStateManager::new();
        let mut status = status_with_rows(0, 10);
        status.notice = Some("first".to_string());
        assert_eq!(ui.visible_notice(&status), Some("first"));

        ui.dismiss_notice(Some("first"));
        assert_eq!(ui.visible_notice(&status), None);

        status.notice = Some("second".to_string());
        assert_eq!(ui.visible_notice(&status), Some("second"));
    }
}
