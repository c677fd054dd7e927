//! Collaborator traits implemented by platform backends.
//!
//! The engine is written entirely against these seams; concrete backends
//! (and the in-memory simulator) live in separate crates.

use async_trait::async_trait;
use tokio::sync::mpsc;

use mirrorlink_common::error::MirrorResult;

use crate::mode::Mode;
use crate::types::{
    AdapterInfo, BindError, ConsentOutcome, ExternalStop, GrantToken, HardwareSignal, OutputId,
    OutputInfo,
};

/// Sender the platform uses to report externally triggered teardown.
pub type StopSender = mpsc::UnboundedSender<ExternalStop>;

/// Source of hardware facts and change notifications.
///
/// Fact queries are snapshots; change notifications arrive on the receiver
/// returned by [`DisplayHost::subscribe`]. Queries are fallible — a failing
/// platform call must surface as an error, not a panic.
pub trait DisplayHost: Send + Sync {
    /// Currently attached removable adapters.
    fn attached_adapters(&self) -> MirrorResult<Vec<AdapterInfo>>;

    /// Currently visible output surfaces, primary included.
    fn visible_outputs(&self) -> MirrorResult<Vec<OutputInfo>>;

    /// Subscribe to attach/detach and output add/remove/change signals.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<HardwareSignal>;
}

/// Asks the user for screen-capture consent.
///
/// The round-trip is unbounded in duration; callers must not block a
/// listener task on it.
#[async_trait]
pub trait ConsentProvider: Send + Sync {
    async fn request_consent(&self) -> ConsentOutcome;
}

/// Turns a granted consent into live capture resources.
#[async_trait]
pub trait SessionBinder: Send + Sync {
    /// Exchange a grant token for a capture grant. The platform may fire
    /// `revoked` with [`ExternalStop::GrantRevoked`] at any later time.
    async fn acquire(
        &self,
        token: GrantToken,
        revoked: StopSender,
    ) -> Result<Box<dyn CaptureGrant>, BindError>;
}

/// An acquired capture grant, releasable exactly once.
#[async_trait]
pub trait CaptureGrant: Send {
    /// Bind the grant to an output at a mode. The platform may fire
    /// `stopped` with [`ExternalStop::OutputStopped`] at any later time.
    async fn bind(
        &mut self,
        output: OutputId,
        mode: Mode,
        stopped: StopSender,
    ) -> Result<Box<dyn DisplayHandle>, BindError>;

    /// Release the grant. Must be safe to call after a platform-side stop;
    /// failures are the implementation's to log, never to propagate.
    fn release(&mut self);
}

/// A bound display handle, releasable exactly once.
pub trait DisplayHandle: Send {
    fn release(&mut self);
}

/// Persistent user settings. Every call is independently fallible and
/// advisory: the engine logs failures and carries on.
pub trait SettingsStore: Send + Sync {
    fn preferred_mode(&self) -> MirrorResult<Option<Mode>>;
    fn set_preferred_mode(&self, mode: Option<Mode>) -> MirrorResult<()>;
    fn last_active(&self) -> MirrorResult<bool>;
    fn set_last_active(&self, active: bool) -> MirrorResult<()>;
}
