use std::path::PathBuf;
use std::time::Duration;

use relay_core::{Backoff, PollInterval, StatusView};
use relay_logging::{relay_info, relay_warn};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    ControlChannel, ControlSettings, Credentials, Notifier, Outbox, Portal, PortalSettings,
    ReconcileState, Reconciler, SessionManager, SnapshotStore,
};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub portal: PortalSettings,
    pub credentials: Credentials,
    pub state_path: PathBuf,
    pub poll: PollInterval,
    pub backoff: Backoff,
    pub delivery_attempts: u32,
    pub delivery_retry_delay: Duration,
    /// Send every message already present when starting without a baseline.
    pub replay_backlog: bool,
    /// Bot command channel; `None` runs without one.
    pub control: Option<ControlSettings>,
}

impl EngineSettings {
    pub fn new(credentials: Credentials, state_path: impl Into<PathBuf>) -> Self {
        Self {
            portal: PortalSettings::default(),
            credentials,
            state_path: state_path.into(),
            poll: PollInterval::default(),
            backoff: Backoff::default(),
            delivery_attempts: 1,
            delivery_retry_delay: Duration::from_secs(2),
            replay_backlog: false,
            control: None,
        }
    }
}

/// Runs the relay until `shutdown` fires and returns the final baseline.
///
/// The control channel, when configured, runs as its own task; the
/// reconciliation loop runs on the calling task.
pub async fn run_engine<N>(
    settings: EngineSettings,
    notifier: N,
    shutdown: CancellationToken,
) -> ReconcileState
where
    N: Notifier + 'static,
{
    let (status_tx, status_rx) = watch::channel(StatusView::default());

    let control = settings
        .control
        .and_then(|control| match ControlChannel::new(control, status_rx) {
            Ok(channel) => Some(tokio::spawn(channel.run(shutdown.clone()))),
            Err(err) => {
                relay_warn!("Control channel unavailable: {}", err);
                None
            }
        });

    let sessions = SessionManager::new(settings.portal.clone(), settings.credentials)
        .with_shutdown(shutdown.clone());
    let outbox = Outbox::new(notifier)
        .with_retries(settings.delivery_attempts, settings.delivery_retry_delay)
        .with_shutdown(shutdown.clone());
    let reconciler = Reconciler::new(
        Portal::new(settings.portal),
        sessions,
        SnapshotStore::new(settings.state_path),
        outbox,
    )
    .with_timing(settings.poll, settings.backoff);

    let state = reconciler.restore_state(settings.replay_backlog);
    relay_info!("Relay started");
    let state = reconciler.run(state, shutdown.clone(), status_tx).await;

    shutdown.cancel();
    if let Some(handle) = control {
        let _ = handle.await;
    }
    state
}
