//! Channel-backed consent provider for UI integration.
//!
//! Real consent dialogs complete through a callback on the UI side. This
//! provider bridges that shape to the async [`ConsentProvider`] contract:
//! the engine awaits `request_consent`, and the UI completes it by calling
//! [`ChannelConsent::resolve`] (or the convenience
//! [`ChannelConsent::resolve_result`]) when the user answers.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use mirrorlink_platform_core::{ConsentOutcome, ConsentProvider, GrantToken};

#[derive(Default)]
pub struct ChannelConsent {
    pending: Mutex<Option<oneshot::Sender<ConsentOutcome>>>,
}

impl ChannelConsent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a consent request is currently outstanding.
    pub fn is_pending(&self) -> bool {
        self.pending.lock().expect("pending slot poisoned").is_some()
    }

    /// Complete the outstanding request. Returns false if none was pending
    /// (a late answer after the request was superseded or torn down).
    pub fn resolve(&self, outcome: ConsentOutcome) -> bool {
        let sender = self.pending.lock().expect("pending slot poisoned").take();
        match sender {
            Some(sender) => sender.send(outcome).is_ok(),
            None => {
                tracing::debug!("Consent result arrived with no pending request");
                false
            }
        }
    }

    /// UI-shaped completion: a granted flag plus an optional token.
    /// Granted without a token counts as denied.
    pub fn resolve_result(&self, granted: bool, token: Option<GrantToken>) -> bool {
        let outcome = match (granted, token) {
            (true, Some(token)) => ConsentOutcome::Granted(token),
            _ => ConsentOutcome::Denied,
        };
        self.resolve(outcome)
    }
}

#[async_trait]
impl ConsentProvider for ChannelConsent {
    async fn request_consent(&self) -> ConsentOutcome {
        let (tx, rx) = oneshot::channel();
        let previous = self
            .pending
            .lock()
            .expect("pending slot poisoned")
            .replace(tx);
        if let Some(previous) = previous {
            // The old waiter can only be an abandoned flow; let it settle.
            let _ = previous.send(ConsentOutcome::Cancelled);
        }
        // A dropped sender (provider torn down) reads as cancellation.
        rx.await.unwrap_or(ConsentOutcome::Cancelled)
    }
}
