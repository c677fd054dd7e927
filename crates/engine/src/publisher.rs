//! Observable status, mode list, and error events.
//!
//! Status and modes are last-value-wins `watch` state with change
//! suppression, so downstream observers never see redundant publishes.
//! Errors are advisory: a single overwrite slot where the newest event wins
//! if the observer is slow. Nothing here is a lossless queue by design.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Notify};

use mirrorlink_platform_core::Mode;

use crate::state::ConnectionStatus;

/// Classification of an advisory error event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A platform fact query failed.
    FactQuery,
    /// The user denied or cancelled the consent dialog.
    ConsentDenied,
    /// The external output disappeared before or during a session.
    OutputLost,
    /// Grant acquisition or output binding failed.
    BindFailed,
    /// The platform tore the session down.
    SessionStopped,
    /// Informational: a new mode selection needs a session restart.
    ModeChange,
}

/// A transient, dismissible error event.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub kind: ErrorKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Holds the current connection status and available modes, plus the
/// one-slot error feed.
pub struct StatusPublisher {
    status_tx: watch::Sender<ConnectionStatus>,
    modes_tx: watch::Sender<Vec<Mode>>,
    error_slot: Mutex<Option<ErrorEvent>>,
    error_notify: Notify,
}

impl StatusPublisher {
    pub(crate) fn new() -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        let (modes_tx, _) = watch::channel(Vec::new());
        Self {
            status_tx,
            modes_tx,
            error_slot: Mutex::new(None),
            error_notify: Notify::new(),
        }
    }

    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    /// Current mode list, most capable first.
    pub fn modes(&self) -> Vec<Mode> {
        self.modes_tx.borrow().clone()
    }

    /// Subscribe to status changes.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// Subscribe to mode-list changes.
    pub fn watch_modes(&self) -> watch::Receiver<Vec<Mode>> {
        self.modes_tx.subscribe()
    }

    /// Publish a status value, suppressing no-op updates.
    /// Returns true if the value actually changed.
    pub(crate) fn publish_status(&self, status: ConnectionStatus) -> bool {
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            tracing::info!(from = %current, to = %status, "Connection status changed");
            *current = status;
            true
        })
    }

    /// Publish a mode list, suppressing no-op updates.
    pub(crate) fn publish_modes(&self, modes: Vec<Mode>) -> bool {
        self.modes_tx.send_if_modified(|current| {
            if *current == modes {
                return false;
            }
            tracing::debug!(count = modes.len(), "Available modes changed");
            *current = modes;
            true
        })
    }

    /// Post an advisory error. Overwrites any unobserved previous event.
    pub(crate) fn post_error(&self, kind: ErrorKind, message: impl Into<String>) {
        let event = ErrorEvent {
            kind,
            message: message.into(),
            at: Utc::now(),
        };
        tracing::warn!(?kind, message = %event.message, "Error event");
        *self.error_slot.lock().expect("error slot poisoned") = Some(event);
        self.error_notify.notify_waiters();
    }

    /// Take the pending error event, if any.
    pub fn take_error(&self) -> Option<ErrorEvent> {
        self.error_slot.lock().expect("error slot poisoned").take()
    }

    /// Wait for and take the next error event.
    pub async fn next_error(&self) -> ErrorEvent {
        loop {
            let notified = self.error_notify.notified();
            if let Some(event) = self.take_error() {
                return event;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_publish_of_same_status_is_suppressed() {
        let publisher = StatusPublisher::new();
        assert!(publisher.publish_status(ConnectionStatus::AdapterConnected));
        assert!(!publisher.publish_status(ConnectionStatus::AdapterConnected));
        assert_eq!(publisher.status(), ConnectionStatus::AdapterConnected);
    }

    #[test]
    fn mode_publish_suppression_compares_full_list() {
        let publisher = StatusPublisher::new();
        let modes = vec![Mode::new(1920, 1080, 60)];
        assert!(publisher.publish_modes(modes.clone()));
        assert!(!publisher.publish_modes(modes));
        assert!(publisher.publish_modes(vec![]));
    }

    #[test]
    fn newest_error_overwrites_unobserved_older_one() {
        let publisher = StatusPublisher::new();
        publisher.post_error(ErrorKind::FactQuery, "first");
        publisher.post_error(ErrorKind::BindFailed, "second");

        let event = publisher.take_error().expect("event pending");
        assert_eq!(event.kind, ErrorKind::BindFailed);
        assert_eq!(event.message, "second");
        assert!(publisher.take_error().is_none());
    }

    #[tokio::test]
    async fn next_error_returns_already_buffered_event() {
        let publisher = StatusPublisher::new();
        publisher.post_error(ErrorKind::OutputLost, "gone");
        let event = publisher.next_error().await;
        assert_eq!(event.kind, ErrorKind::OutputLost);
    }

    #[test]
    fn watch_subscribers_observe_initial_state() {
        let publisher = StatusPublisher::new();
        let status_rx = publisher.watch_status();
        let modes_rx = publisher.watch_modes();
        assert_eq!(*status_rx.borrow(), ConnectionStatus::Disconnected);
        assert!(modes_rx.borrow().is_empty());
    }
}
