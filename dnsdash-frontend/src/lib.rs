//! DNS traffic dashboard frontend.
//!
//! Drives a DNS capture backend over HTTP: lists its interfaces, starts
//! capture on the operator's choice, polls aggregated statistics and renders
//! them with Iced.
//!
//! # Key Components
//!
//! * [`session`] - Session controller, the single owner of session state
//! * [`interface_registry`], [`capture`], [`poller`] - Background work of a session
//! * [`backend_client`] - `StatsBackend` trait and its HTTP implementation
//! * [`presentation`] - Pure derivation of display data from a snapshot
//! * [`app`] - Iced application (update/view/subscription)

pub mod app;
pub mod backend_client;
pub mod capture;
pub mod cli;
pub mod interface_registry;
pub mod messages;
pub mod poller;
pub mod presentation;
pub mod series_chart;
pub mod session;
pub mod session_runner;
pub mod table_view;
pub mod ui_state;
pub mod view;
