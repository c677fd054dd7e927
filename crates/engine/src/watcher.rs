//! The output event source.
//!
//! One task fuses adapter attach/detach signals, output add/remove/change
//! signals, internal re-evaluation requests, external stop notifications,
//! and the poll/settle timers into ordered re-evaluations of the
//! connection facts. The poll timer is armed only while the facts say
//! "adapter attached, no external output yet"; it never runs otherwise.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};

use mirrorlink_platform_core::{
    AdapterFilter, DisplayHost, ExternalStop, HardwareSignal,
};

use crate::publisher::{ErrorKind, StatusPublisher};
use crate::session::{SessionManager, TeardownReason};
use crate::state::{evaluate, ConnectionFacts, ConnectionStatus};

/// Internal request posted to the watcher task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WatcherCommand {
    /// Re-run fact gathering and publish the result.
    Reevaluate,
}

pub(crate) struct ConnectionWatcher {
    host: Arc<dyn DisplayHost>,
    publisher: Arc<StatusPublisher>,
    session: Arc<SessionManager>,
    filter: AdapterFilter,
    settle_delay: Duration,
    poll_interval: Duration,
    adapter_attached: AtomicBool,
    signals: mpsc::UnboundedReceiver<HardwareSignal>,
    commands: mpsc::UnboundedReceiver<WatcherCommand>,
    stops: mpsc::UnboundedReceiver<ExternalStop>,
    shutdown: watch::Receiver<bool>,
}

impl ConnectionWatcher {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        host: Arc<dyn DisplayHost>,
        publisher: Arc<StatusPublisher>,
        session: Arc<SessionManager>,
        filter: AdapterFilter,
        settle_delay: Duration,
        poll_interval: Duration,
        signals: mpsc::UnboundedReceiver<HardwareSignal>,
        commands: mpsc::UnboundedReceiver<WatcherCommand>,
        stops: mpsc::UnboundedReceiver<ExternalStop>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            host,
            publisher,
            session,
            filter,
            settle_delay,
            poll_interval,
            adapter_attached: AtomicBool::new(false),
            signals,
            commands,
            stops,
            shutdown,
        }
    }

    /// Run until shutdown. Fact-query failures are reported and survived;
    /// the loop itself never exits on error.
    pub(crate) async fn run(mut self) {
        tracing::debug!("Connection watcher started");
        self.scan_initial_adapters();
        self.reevaluate().await;

        let mut settle_deadline: Option<Instant> = None;
        let mut poll_next: Option<Instant> = None;

        loop {
            // The poll timer exists only while an attach is waiting for an
            // output to show up; a pending settle wait takes its place.
            let polling = settle_deadline.is_none()
                && self.publisher.status() == ConnectionStatus::AdapterConnected;
            if !polling {
                poll_next = None;
            } else if poll_next.is_none() {
                poll_next = Some(Instant::now() + self.poll_interval);
            }
            let deadline = settle_deadline.or(poll_next);

            tokio::select! {
                result = self.shutdown.changed() => {
                    if result.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                Some(signal) = self.signals.recv() => {
                    self.handle_signal(signal, &mut settle_deadline).await;
                }
                Some(command) = self.commands.recv() => {
                    match command {
                        WatcherCommand::Reevaluate => self.reevaluate().await,
                    }
                }
                Some(stop) = self.stops.recv() => {
                    let reason = match stop {
                        ExternalStop::GrantRevoked => TeardownReason::GrantRevoked,
                        ExternalStop::OutputStopped => TeardownReason::OutputStopped,
                    };
                    tracing::warn!(?reason, "External session stop received");
                    self.session.teardown(reason).await;
                    self.reevaluate().await;
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if settle_deadline.take().is_some() {
                        tracing::debug!("Settle delay elapsed");
                    } else {
                        tracing::debug!("Polling for external output");
                        poll_next = None;
                    }
                    self.reevaluate().await;
                }
            }
        }
        tracing::debug!("Connection watcher stopped");
    }

    fn scan_initial_adapters(&self) {
        match self.host.attached_adapters() {
            Ok(adapters) => {
                let attached = adapters.iter().any(|adapter| (self.filter)(adapter));
                self.adapter_attached.store(attached, Ordering::SeqCst);
                tracing::debug!(count = adapters.len(), attached, "Initial adapter scan");
            }
            Err(e) => {
                tracing::error!(error = %e, "Initial adapter scan failed");
                self.publisher
                    .post_error(ErrorKind::FactQuery, "Could not read attached devices");
                self.publisher.publish_status(ConnectionStatus::Error);
            }
        }
    }

    async fn handle_signal(
        &self,
        signal: HardwareSignal,
        settle_deadline: &mut Option<Instant>,
    ) {
        match signal {
            HardwareSignal::AdapterAttached(adapter) => {
                if !(self.filter)(&adapter) {
                    tracing::debug!(name = %adapter.name, "Ignoring non-matching device attach");
                    return;
                }
                tracing::info!(
                    name = %adapter.name,
                    vendor_id = format_args!("{:04x}", adapter.vendor_id),
                    product_id = format_args!("{:04x}", adapter.product_id),
                    "Adapter attached"
                );
                self.adapter_attached.store(true, Ordering::SeqCst);
                // Outputs enumerate asynchronously after attach; wait
                // before trusting the enumeration.
                *settle_deadline = Some(Instant::now() + self.settle_delay);
            }
            HardwareSignal::AdapterDetached(adapter) => {
                if !(self.filter)(&adapter) {
                    tracing::debug!(name = %adapter.name, "Ignoring non-matching device detach");
                    return;
                }
                tracing::info!(name = %adapter.name, "Adapter detached");
                self.adapter_attached.store(false, Ordering::SeqCst);
                *settle_deadline = None;
                self.reevaluate().await;
            }
            HardwareSignal::OutputAdded(id) => {
                tracing::info!(%id, "Output added");
                self.reevaluate().await;
            }
            HardwareSignal::OutputRemoved(id) => {
                tracing::info!(%id, "Output removed");
                self.reevaluate().await;
            }
            HardwareSignal::OutputChanged(id) => {
                tracing::debug!(%id, "Output changed");
                self.reevaluate().await;
            }
        }
    }

    /// Gather facts, resolve session/output consistency, publish.
    /// Idempotent: with unchanged facts this publishes nothing.
    async fn reevaluate(&self) {
        let outputs = match self.host.visible_outputs() {
            Ok(outputs) => outputs,
            Err(e) => {
                tracing::error!(error = %e, "Failed to enumerate outputs");
                self.publisher
                    .post_error(ErrorKind::FactQuery, "Could not read the current display state");
                self.publisher.publish_status(ConnectionStatus::Error);
                return;
            }
        };

        // If the output backing the live session vanished, tear the session
        // down before publishing, so status and session liveness are never
        // observably inconsistent.
        if let Some(bound) = self.session.bound_output() {
            let still_present = outputs
                .iter()
                .any(|output| output.id == bound && output.is_external());
            if !still_present {
                tracing::warn!(output = %bound, "Output backing the live session disappeared");
                self.session.teardown(TeardownReason::OutputLost).await;
            }
        }

        let facts = ConnectionFacts {
            adapter_attached: self.adapter_attached.load(Ordering::SeqCst),
            outputs,
            session_live: self.session.is_live(),
        };
        let eval = evaluate(&facts);
        self.publisher.publish_modes(eval.modes);
        self.publisher.publish_status(eval.status);
    }
}
