//! The capture-session lifecycle manager.
//!
//! Owns the only capture grant and display handle in the process. Every
//! teardown trigger — explicit stop, output loss, platform revocation,
//! bind failure — funnels through the single [`SessionManager::teardown`]
//! path, so cleanup can never diverge or double-release.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};

use mirrorlink_common::error::{MirrorError, MirrorResult};
use mirrorlink_platform_core::{
    BindError, CaptureGrant, ConsentOutcome, ConsentProvider, DisplayHandle, DisplayHost, Mode,
    OutputId, OutputInfo, SessionBinder, SettingsStore, StopSender,
};

use crate::publisher::{ErrorKind, StatusPublisher};
use crate::state::{select_external, ConnectionStatus};
use crate::watcher::WatcherCommand;

/// Where the lifecycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// No session and none in flight.
    Idle,
    /// Consent dialog outstanding.
    AwaitingConsent,
    /// Consent granted; acquiring and binding resources.
    Binding,
    /// Session confirmed live.
    Live,
}

/// Why a session was (or is being) torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    /// Explicit stop request.
    UserStop,
    /// The backing external output disappeared.
    OutputLost,
    /// The platform revoked the capture grant.
    GrantRevoked,
    /// The bound display handle reported itself stopped.
    OutputStopped,
    /// The user picked a different mode while live.
    ModeChanged,
}

/// The two live resources, dropped only through [`SessionManager::teardown`].
struct SessionResources {
    display: Box<dyn DisplayHandle>,
    grant: Box<dyn CaptureGrant>,
    output: OutputId,
}

struct Inner {
    state: LifecycleState,
    resources: Option<SessionResources>,
    /// Bumped whenever a consent round-trip is started or abandoned; a
    /// flow whose generation no longer matches discards its late result.
    generation: u64,
}

pub(crate) struct SessionManager {
    host: Arc<dyn DisplayHost>,
    consent: Arc<dyn ConsentProvider>,
    binder: Arc<dyn SessionBinder>,
    settings: Arc<dyn SettingsStore>,
    publisher: Arc<StatusPublisher>,
    commands: mpsc::UnboundedSender<WatcherCommand>,
    stop_tx: StopSender,
    inner: Mutex<Inner>,
    live: AtomicBool,
    bound: StdMutex<Option<OutputId>>,
}

impl SessionManager {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        host: Arc<dyn DisplayHost>,
        consent: Arc<dyn ConsentProvider>,
        binder: Arc<dyn SessionBinder>,
        settings: Arc<dyn SettingsStore>,
        publisher: Arc<StatusPublisher>,
        commands: mpsc::UnboundedSender<WatcherCommand>,
        stop_tx: StopSender,
    ) -> Self {
        Self {
            host,
            consent,
            binder,
            settings,
            publisher,
            commands,
            stop_tx,
            inner: Mutex::new(Inner {
                state: LifecycleState::Idle,
                resources: None,
                generation: 0,
            }),
            live: AtomicBool::new(false),
            bound: StdMutex::new(None),
        }
    }

    /// Whether a session is confirmed live. Cheap; readable from anywhere.
    pub(crate) fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// The output the live session is bound to, if any.
    pub(crate) fn bound_output(&self) -> Option<OutputId> {
        *self.bound.lock().expect("bound slot poisoned")
    }

    pub(crate) async fn lifecycle(&self) -> LifecycleState {
        self.inner.lock().await.state
    }

    /// Begin the start flow: validate, move to `AwaitingConsent`, and run
    /// the consent round-trip as a detached task. Duplicate requests while
    /// not idle are rejected, never queued.
    pub(crate) async fn start(self: &Arc<Self>) -> MirrorResult<()> {
        let generation = {
            let mut inner = self.inner.lock().await;
            if inner.state != LifecycleState::Idle {
                return Err(MirrorError::session(
                    "A mirroring session is already starting or active",
                ));
            }
            let status = self.publisher.status();
            if status != ConnectionStatus::ReadyToTransmit {
                return Err(MirrorError::session(format!(
                    "Cannot start mirroring while {status}"
                )));
            }
            inner.generation += 1;
            inner.state = LifecycleState::AwaitingConsent;
            inner.generation
        };

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.run_start_flow(generation).await;
        });
        Ok(())
    }

    async fn run_start_flow(self: Arc<Self>, generation: u64) {
        tracing::info!("Requesting screen capture consent");
        let outcome = self.consent.request_consent().await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation || inner.state != LifecycleState::AwaitingConsent {
            tracing::debug!("Discarding superseded consent result");
            return;
        }

        let token = match outcome {
            ConsentOutcome::Granted(token) => token,
            ConsentOutcome::Denied => {
                inner.state = LifecycleState::Idle;
                self.publisher.post_error(
                    ErrorKind::ConsentDenied,
                    "Screen capture permission was denied",
                );
                return;
            }
            ConsentOutcome::Cancelled => {
                inner.state = LifecycleState::Idle;
                self.publisher.post_error(
                    ErrorKind::ConsentDenied,
                    "Screen capture permission request was cancelled",
                );
                return;
            }
        };
        inner.state = LifecycleState::Binding;

        // The output may have disappeared during the consent round-trip;
        // re-check before touching the binder.
        let output = match self.host.visible_outputs() {
            Ok(outputs) => match select_external(&outputs).cloned() {
                Some(output) => output,
                None => {
                    inner.state = LifecycleState::Idle;
                    self.publisher.post_error(
                        ErrorKind::OutputLost,
                        "External output disappeared before binding",
                    );
                    return;
                }
            },
            Err(e) => {
                inner.state = LifecycleState::Idle;
                self.publisher.post_error(
                    ErrorKind::FactQuery,
                    format!("Could not re-check outputs: {e}"),
                );
                return;
            }
        };

        let mode = self.target_mode(&output);
        tracing::info!(output = %output.id, %mode, "Binding capture session");

        let mut grant = match self.binder.acquire(token, self.stop_tx.clone()).await {
            Ok(grant) => grant,
            Err(e) => {
                self.fail_bind(&mut inner, e);
                return;
            }
        };

        match grant.bind(output.id, mode, self.stop_tx.clone()).await {
            Ok(display) => {
                inner.resources = Some(SessionResources {
                    display,
                    grant,
                    output: output.id,
                });
                inner.state = LifecycleState::Live;
                self.live.store(true, Ordering::SeqCst);
                *self.bound.lock().expect("bound slot poisoned") = Some(output.id);
                if let Err(e) = self.settings.set_last_active(true) {
                    tracing::warn!(error = %e, "Failed to persist last-active flag");
                }
                tracing::info!(output = %output.id, %mode, "Capture session live");
                self.request_reevaluation();
            }
            Err(e) => {
                // Reverse-acquisition unwind: only the grant exists here.
                grant.release();
                self.fail_bind(&mut inner, e);
            }
        }
    }

    /// Target mode for a bind: the preferred mode when set and supported
    /// by this output, else the output's own current mode.
    fn target_mode(&self, output: &OutputInfo) -> Mode {
        let preferred = match self.settings.preferred_mode() {
            Ok(preferred) => preferred,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read preferred mode");
                None
            }
        };
        match preferred {
            Some(mode) if output.supported_modes.contains(&mode) => mode,
            Some(mode) => {
                tracing::debug!(%mode, "Preferred mode not supported by output, using current");
                output.current_mode
            }
            None => output.current_mode,
        }
    }

    fn fail_bind(&self, inner: &mut Inner, error: BindError) {
        inner.state = LifecycleState::Idle;
        let message = match &error {
            BindError::PermissionDenied(detail) => {
                format!("Capture permission rejected during bind: {detail}")
            }
            _ => format!("Could not bind the capture session: {error}"),
        };
        self.publisher.post_error(ErrorKind::BindFailed, message);
        self.publisher.publish_status(ConnectionStatus::Error);
    }

    /// The single teardown path. Idempotent: calling while idle is a no-op.
    /// Releases in reverse-acquisition order and always lands in `Idle`.
    pub(crate) async fn teardown(&self, reason: TeardownReason) {
        let mut inner = self.inner.lock().await;
        // Abandon any in-flight consent so its late result is discarded.
        inner.generation += 1;

        if inner.state == LifecycleState::Idle {
            tracing::debug!(?reason, "Teardown requested while idle; nothing to do");
            return;
        }

        let had_resources = inner.resources.is_some();
        if let Some(mut resources) = inner.resources.take() {
            resources.display.release();
            resources.grant.release();
            tracing::info!(?reason, output = %resources.output, "Capture session released");
        } else {
            tracing::info!(?reason, "Abandoning session setup");
        }

        inner.state = LifecycleState::Idle;
        self.live.store(false, Ordering::SeqCst);
        *self.bound.lock().expect("bound slot poisoned") = None;

        if had_resources {
            if let Err(e) = self.settings.set_last_active(false) {
                tracing::warn!(error = %e, "Failed to persist last-active flag");
            }
        }

        match reason {
            TeardownReason::GrantRevoked | TeardownReason::OutputStopped => {
                self.publisher.post_error(
                    ErrorKind::SessionStopped,
                    "Screen mirroring was stopped by the system",
                );
            }
            TeardownReason::ModeChanged => {
                self.publisher.post_error(
                    ErrorKind::ModeChange,
                    "Start mirroring again to apply the new mode",
                );
            }
            TeardownReason::UserStop | TeardownReason::OutputLost => {}
        }
    }

    fn request_reevaluation(&self) {
        // Send failure only happens during shutdown, when a re-evaluation
        // is pointless anyway.
        let _ = self.commands.send(WatcherCommand::Reevaluate);
    }
}
