//! MirrorLink Engine
//!
//! Turns noisy hardware events (adapter plug/unplug, output hotplug, mode
//! changes, platform-side teardown) into one coherent connection status,
//! and manages the screen-mirroring session lifecycle over that path.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  MirrorEngine                     │
//! │  ┌───────────────┐        ┌───────────────────┐  │
//! │  │ Connection    │ facts  │ Session           │  │
//! │  │ Watcher       │───────▶│ Lifecycle Manager │  │
//! │  │ (event fusion,│◀───────│ (consent → bind   │  │
//! │  │  settle, poll)│teardown│  → live → idle)   │  │
//! │  └───────┬───────┘        └─────────┬─────────┘  │
//! │          ▼                          ▼            │
//! │  ┌──────────────────────────────────────────┐    │
//! │  │ StatusPublisher: status / modes / errors │    │
//! │  └──────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! The engine is constructed against the collaborator traits in
//! `mirrorlink-platform-core`; nothing here touches a concrete platform.

pub mod consent;
pub mod publisher;
pub mod session;
pub mod state;
mod watcher;

use std::fmt;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use mirrorlink_common::config::AppConfig;
use mirrorlink_common::error::{MirrorError, MirrorResult};
use mirrorlink_platform_core::{
    any_adapter, AdapterFilter, ConsentProvider, DisplayHost, Mode, SessionBinder, SettingsStore,
};

pub use consent::ChannelConsent;
pub use publisher::{ErrorEvent, ErrorKind, StatusPublisher};
pub use session::{LifecycleState, TeardownReason};
pub use state::{evaluate, select_external, ConnectionFacts, ConnectionStatus, Evaluation};

use session::SessionManager;
use watcher::{ConnectionWatcher, WatcherCommand};

/// Engine tuning knobs.
#[derive(Clone)]
pub struct EngineConfig {
    /// Wait after adapter attach before trusting output enumeration.
    pub settle_delay: Duration,

    /// Re-check cadence while an adapter is attached with no output yet.
    pub poll_interval: Duration,

    /// Which attached devices count as "the adapter".
    pub adapter_filter: AdapterFilter,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(1),
            poll_interval: Duration::from_secs(2),
            adapter_filter: any_adapter(),
        }
    }
}

impl EngineConfig {
    /// Build from the application config file, keeping the default filter.
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            settle_delay: config.watcher.settle_delay(),
            poll_interval: config.watcher.poll_interval(),
            adapter_filter: any_adapter(),
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("settle_delay", &self.settle_delay)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

/// The engine facade: owns the watcher task, the session lifecycle
/// manager, and the observable status surface.
pub struct MirrorEngine {
    settings: Arc<dyn SettingsStore>,
    publisher: Arc<StatusPublisher>,
    session: Arc<SessionManager>,
    commands_tx: mpsc::UnboundedSender<WatcherCommand>,
    shutdown_tx: watch::Sender<bool>,
    watcher: StdMutex<Option<ConnectionWatcher>>,
    task: StdMutex<Option<JoinHandle<()>>>,
}

impl MirrorEngine {
    /// Wire up an engine against its collaborators. Nothing runs until
    /// [`MirrorEngine::start`].
    pub fn new(
        config: EngineConfig,
        host: Arc<dyn DisplayHost>,
        consent: Arc<dyn ConsentProvider>,
        binder: Arc<dyn SessionBinder>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        let signals = host.subscribe();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let publisher = Arc::new(StatusPublisher::new());
        let session = Arc::new(SessionManager::new(
            Arc::clone(&host),
            consent,
            binder,
            Arc::clone(&settings),
            Arc::clone(&publisher),
            commands_tx.clone(),
            stop_tx,
        ));
        let watcher = ConnectionWatcher::new(
            host,
            Arc::clone(&publisher),
            Arc::clone(&session),
            config.adapter_filter.clone(),
            config.settle_delay,
            config.poll_interval,
            signals,
            commands_rx,
            stop_rx,
            shutdown_rx,
        );

        Self {
            settings,
            publisher,
            session,
            commands_tx,
            shutdown_tx,
            watcher: StdMutex::new(Some(watcher)),
            task: StdMutex::new(None),
        }
    }

    /// Start the watcher task. Runs the initial adapter scan and
    /// evaluation, then listens until [`MirrorEngine::shutdown`].
    pub fn start(&self) -> MirrorResult<()> {
        let watcher = self
            .watcher
            .lock()
            .expect("watcher slot poisoned")
            .take()
            .ok_or_else(|| MirrorError::session("Engine already started"))?;
        let handle = tokio::spawn(watcher.run());
        *self.task.lock().expect("task slot poisoned") = Some(handle);
        tracing::info!("MirrorLink engine started");
        Ok(())
    }

    /// Stop the watcher and tear down any live session.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self.task.lock().expect("task slot poisoned").take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Watcher task join failed");
            }
        }
        self.session.teardown(TeardownReason::UserStop).await;
        tracing::info!("MirrorLink engine stopped");
    }

    /// Request the start of a mirroring session. Valid only while idle and
    /// ready-to-transmit; the consent and bind flow continues detached.
    pub async fn start_mirroring(&self) -> MirrorResult<()> {
        self.session.start().await
    }

    /// Stop the mirroring session. Safe no-op when nothing is running.
    pub async fn stop_mirroring(&self) {
        self.session.teardown(TeardownReason::UserStop).await;
        let _ = self.commands_tx.send(WatcherCommand::Reevaluate);
    }

    /// Persist a new preferred mode. A live session is torn down; the new
    /// mode applies on the next start (binding needs fresh consent).
    pub async fn select_mode(&self, mode: Mode) {
        tracing::info!(%mode, "Mode selected");
        if let Err(e) = self.settings.set_preferred_mode(Some(mode)) {
            tracing::warn!(error = %e, "Failed to persist preferred mode");
        }
        if self.session.is_live() {
            self.session.teardown(TeardownReason::ModeChanged).await;
            let _ = self.commands_tx.send(WatcherCommand::Reevaluate);
        }
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.publisher.status()
    }

    /// Current ranked mode list.
    pub fn available_modes(&self) -> Vec<Mode> {
        self.publisher.modes()
    }

    /// Subscribe to status changes.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.publisher.watch_status()
    }

    /// Subscribe to mode-list changes.
    pub fn watch_modes(&self) -> watch::Receiver<Vec<Mode>> {
        self.publisher.watch_modes()
    }

    /// Take the pending advisory error, if any.
    pub fn take_error(&self) -> Option<ErrorEvent> {
        self.publisher.take_error()
    }

    /// Wait for the next advisory error.
    pub async fn next_error(&self) -> ErrorEvent {
        self.publisher.next_error().await
    }

    /// Current lifecycle state of the session manager.
    pub async fn lifecycle_state(&self) -> LifecycleState {
        self.session.lifecycle().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_follows_app_config_timings() {
        let mut app = AppConfig::default();
        app.watcher.settle_delay_ms = 250;
        app.watcher.poll_interval_ms = 3000;

        let config = EngineConfig::from_app(&app);
        assert_eq!(config.settle_delay, Duration::from_millis(250));
        assert_eq!(config.poll_interval, Duration::from_millis(3000));
    }

    #[test]
    fn default_engine_config_accepts_any_adapter() {
        let config = EngineConfig::default();
        assert_eq!(config.settle_delay, Duration::from_secs(1));
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert!((config.adapter_filter)(&mirrorlink_platform_core::AdapterInfo {
            name: "anything".to_string(),
            vendor_id: 0xffff,
            product_id: 0x0001,
        }));
    }
}
