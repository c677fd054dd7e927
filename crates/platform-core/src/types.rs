//! Identity and event types shared between the engine and platform backends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::mode::Mode;

/// Identifier of an output surface as enumerated by the platform.
///
/// The device's built-in screen is always [`OutputId::PRIMARY`]; anything
/// else is an external output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutputId(pub u32);

impl OutputId {
    /// The device's own primary screen.
    pub const PRIMARY: OutputId = OutputId(0);

    pub fn is_primary(&self) -> bool {
        *self == Self::PRIMARY
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "output-{}", self.0)
    }
}

/// A removable adapter as reported by attach/detach notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterInfo {
    /// Platform device path or name.
    pub name: String,
    pub vendor_id: u16,
    pub product_id: u16,
}

/// Predicate deciding whether an attached device counts as "the adapter".
///
/// The default accepts any device; deployments that want to restrict to a
/// specific vendor/product pair inject their own predicate.
pub type AdapterFilter = Arc<dyn Fn(&AdapterInfo) -> bool + Send + Sync>;

/// Filter that accepts any attached device.
pub fn any_adapter() -> AdapterFilter {
    Arc::new(|_| true)
}

/// Filter matching a single vendor/product pair.
pub fn adapter_with_ids(vendor_id: u16, product_id: u16) -> AdapterFilter {
    Arc::new(move |adapter| adapter.vendor_id == vendor_id && adapter.product_id == product_id)
}

/// Snapshot of a visible output surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputInfo {
    pub id: OutputId,
    pub name: String,
    /// Platforms keep invalid entries in the enumeration briefly around
    /// hotplug; those must not be treated as connected.
    pub valid: bool,
    pub current_mode: Mode,
    pub supported_modes: Vec<Mode>,
}

impl OutputInfo {
    /// Whether this is a connected external output.
    pub fn is_external(&self) -> bool {
        !self.id.is_primary() && self.valid
    }
}

/// Raw hardware notification, normalized from the platform's listener
/// callbacks into one tagged event type.
#[derive(Debug, Clone, PartialEq)]
pub enum HardwareSignal {
    AdapterAttached(AdapterInfo),
    AdapterDetached(AdapterInfo),
    OutputAdded(OutputId),
    OutputRemoved(OutputId),
    OutputChanged(OutputId),
}

/// Externally triggered session teardown, fired by the platform through the
/// stop senders handed to [`crate::SessionBinder::acquire`] and
/// [`crate::CaptureGrant::bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalStop {
    /// The platform revoked the capture grant.
    GrantRevoked,
    /// The bound display handle reported itself stopped.
    OutputStopped,
}

/// Opaque token proving the user granted capture consent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantToken(String);

impl GrantToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of a consent round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentOutcome {
    Granted(GrantToken),
    Denied,
    Cancelled,
}

/// Failure from grant acquisition or output binding.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BindError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Output unavailable: {0}")]
    OutputUnavailable(String),

    #[error("Platform bind failure: {0}")]
    Platform(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_output_is_never_external() {
        let output = OutputInfo {
            id: OutputId::PRIMARY,
            name: "built-in".to_string(),
            valid: true,
            current_mode: Mode::new(1080, 2400, 120),
            supported_modes: vec![],
        };
        assert!(!output.is_external());
    }

    #[test]
    fn invalid_output_is_not_external() {
        let output = OutputInfo {
            id: OutputId(2),
            name: "hdmi".to_string(),
            valid: false,
            current_mode: Mode::new(1920, 1080, 60),
            supported_modes: vec![],
        };
        assert!(!output.is_external());
    }

    #[test]
    fn adapter_id_filter_matches_only_configured_pair() {
        let filter = adapter_with_ids(0x0bda, 0x8153);
        let matching = AdapterInfo {
            name: "usb-1".to_string(),
            vendor_id: 0x0bda,
            product_id: 0x8153,
        };
        let other = AdapterInfo {
            name: "usb-2".to_string(),
            vendor_id: 0x046d,
            product_id: 0xc52b,
        };
        assert!(filter(&matching));
        assert!(!filter(&other));
        assert!(any_adapter()(&other));
    }
}
