use std::sync::Arc;

use dnsdash_shared::BackendConfig;
use iced::task::{sipper, Never, Sipper};
use iced::Subscription;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::backend_client::HttpBackend;
use crate::messages::{OperatorAction, RunnerEvent};
use crate::session::{SessionController, SessionSettings, SessionStatus};

/// Iced subscription hosting the session controller for `config`.
pub fn subscription(config: &BackendConfig) -> Subscription<RunnerEvent> {
    Subscription::run_with(config.clone(), |config| connect(config.clone()))
}

/// Starts the session controller and relays its status to the GUI.
///
/// The first event is [`RunnerEvent::ControllerReady`] with the channel the
/// GUI sends operator actions on.
pub fn connect(config: BackendConfig) -> impl Sipper<Never, RunnerEvent> {
    sipper(async move |mut output| {
        let backend = match HttpBackend::new(config.clone()) {
            Ok(backend) => backend,
            Err(e) => {
                error!("Cannot start session: {}", e);
                output.send(RunnerEvent::StartupFailed(e.to_string())).await;
                return std::future::pending().await;
            }
        };

        let settings = SessionSettings::from(backend.config());
        info!(
            "Connecting to capture backend at {} (timeout {:?})",
            backend.config().base_url,
            settings.call_timeout
        );

        let (action_sender, action_receiver) = mpsc::unbounded_channel::<OperatorAction>();
        let (status_sender, mut status_receiver) = mpsc::unbounded_channel::<SessionStatus>();

        let controller = SessionController::new(Arc::new(backend), settings);
        tokio::spawn(controller.run(action_receiver, status_sender));

        output
            .send(RunnerEvent::ControllerReady(action_sender))
            .await;

        while let Some(status) = status_receiver.recv().await {
            output
                .send(RunnerEvent::StatusChanged(Box::new(status)))
                .await;
        }

        error!("Session controller exited");
        std::future::pending().await
    })
}
