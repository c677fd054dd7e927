//! MirrorLink Simulated Platform
//!
//! An in-memory implementation of the platform contracts with scriptable
//! plug/unplug, consent, bind-failure, and revocation controls. Drives the
//! engine in integration tests and the CLI demo; nothing here touches real
//! hardware.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use mirrorlink_common::error::{MirrorError, MirrorResult};
use mirrorlink_platform_core::{
    AdapterInfo, BindError, CaptureGrant, ConsentOutcome, ConsentProvider, DisplayHandle,
    DisplayHost, ExternalStop, GrantToken, HardwareSignal, Mode, OutputId, OutputInfo,
    SessionBinder, SettingsStore, StopSender,
};

/// Convenience: a plausible external output for scripts and tests.
pub fn hdmi_output(id: u32, modes: &[Mode]) -> OutputInfo {
    OutputInfo {
        id: OutputId(id),
        name: format!("HDMI-{id}"),
        valid: true,
        current_mode: modes.first().copied().unwrap_or(Mode::new(1920, 1080, 60)),
        supported_modes: modes.to_vec(),
    }
}

/// Convenience: a generic USB adapter.
pub fn usb_adapter(name: &str) -> AdapterInfo {
    AdapterInfo {
        name: name.to_string(),
        vendor_id: 0x0bda,
        product_id: 0x8153,
    }
}

// ---------------------------------------------------------------------------
// Display host
// ---------------------------------------------------------------------------

struct HostState {
    adapters: Vec<AdapterInfo>,
    outputs: Vec<OutputInfo>,
}

/// Simulated hardware facts provider with hotplug controls.
pub struct SimHost {
    state: Mutex<HostState>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<HardwareSignal>>>,
    fail_queries: AtomicBool,
}

impl SimHost {
    /// Host with only the primary screen visible.
    pub fn new() -> Arc<Self> {
        let primary = OutputInfo {
            id: OutputId::PRIMARY,
            name: "built-in".to_string(),
            valid: true,
            current_mode: Mode::new(1080, 2400, 120),
            supported_modes: vec![Mode::new(1080, 2400, 120)],
        };
        Arc::new(Self {
            state: Mutex::new(HostState {
                adapters: Vec::new(),
                outputs: vec![primary],
            }),
            subscribers: Mutex::new(Vec::new()),
            fail_queries: AtomicBool::new(false),
        })
    }

    fn broadcast(&self, signal: HardwareSignal) {
        let mut subscribers = self.subscribers.lock().expect("subscribers poisoned");
        subscribers.retain(|tx| tx.send(signal.clone()).is_ok());
    }

    /// Plug an adapter in and fire the attach signal.
    pub fn attach_adapter(&self, adapter: AdapterInfo) {
        self.state
            .lock()
            .expect("host state poisoned")
            .adapters
            .push(adapter.clone());
        self.broadcast(HardwareSignal::AdapterAttached(adapter));
    }

    /// Unplug an adapter by name and fire the detach signal.
    pub fn detach_adapter(&self, name: &str) {
        let removed = {
            let mut state = self.state.lock().expect("host state poisoned");
            let index = state.adapters.iter().position(|a| a.name == name);
            index.map(|i| state.adapters.remove(i))
        };
        if let Some(adapter) = removed {
            self.broadcast(HardwareSignal::AdapterDetached(adapter));
        }
    }

    /// Make an output visible and fire the added signal.
    pub fn connect_output(&self, output: OutputInfo) {
        let id = output.id;
        self.state
            .lock()
            .expect("host state poisoned")
            .outputs
            .push(output);
        self.broadcast(HardwareSignal::OutputAdded(id));
    }

    /// Make an output visible without any notification (the enumeration
    /// race after adapter attach: the output shows up silently and is only
    /// found by settle/poll re-evaluation).
    pub fn connect_output_silently(&self, output: OutputInfo) {
        self.state
            .lock()
            .expect("host state poisoned")
            .outputs
            .push(output);
    }

    /// Remove an output and fire the removed signal.
    pub fn disconnect_output(&self, id: OutputId) {
        let mut state = self.state.lock().expect("host state poisoned");
        state.outputs.retain(|o| o.id != id);
        drop(state);
        self.broadcast(HardwareSignal::OutputRemoved(id));
    }

    /// Replace an output's entry and fire the changed signal.
    pub fn change_output(&self, output: OutputInfo) {
        let id = output.id;
        {
            let mut state = self.state.lock().expect("host state poisoned");
            state.outputs.retain(|o| o.id != id);
            state.outputs.push(output);
        }
        self.broadcast(HardwareSignal::OutputChanged(id));
    }

    /// Force subsequent fact queries to fail (and heal again).
    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }
}

impl DisplayHost for SimHost {
    fn attached_adapters(&self) -> MirrorResult<Vec<AdapterInfo>> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(MirrorError::platform("simulated adapter query failure"));
        }
        Ok(self.state.lock().expect("host state poisoned").adapters.clone())
    }

    fn visible_outputs(&self) -> MirrorResult<Vec<OutputInfo>> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(MirrorError::platform("simulated output query failure"));
        }
        Ok(self.state.lock().expect("host state poisoned").outputs.clone())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<HardwareSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .expect("subscribers poisoned")
            .push(tx);
        rx
    }
}

// ---------------------------------------------------------------------------
// Consent provider
// ---------------------------------------------------------------------------

/// Consent provider answering immediately with a scripted outcome.
pub struct SimConsent {
    outcome: Mutex<ConsentOutcome>,
    requests: AtomicUsize,
}

impl SimConsent {
    pub fn granting() -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(ConsentOutcome::Granted(GrantToken::new("sim-grant"))),
            requests: AtomicUsize::new(0),
        })
    }

    pub fn denying() -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(ConsentOutcome::Denied),
            requests: AtomicUsize::new(0),
        })
    }

    pub fn set_outcome(&self, outcome: ConsentOutcome) {
        *self.outcome.lock().expect("outcome poisoned") = outcome;
    }

    /// How many consent round-trips have been requested.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsentProvider for SimConsent {
    async fn request_consent(&self) -> ConsentOutcome {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.outcome.lock().expect("outcome poisoned").clone()
    }
}

// ---------------------------------------------------------------------------
// Session binder
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BinderState {
    /// Chronological resource-event log: acquire / bind / release-display /
    /// release-grant. Tests assert ordering against this.
    events: Vec<String>,
    bind_calls: Vec<(OutputId, Mode)>,
    live_grants: usize,
    live_displays: usize,
    fail_acquire: Option<BindError>,
    fail_bind: Option<BindError>,
    revoke_tx: Option<StopSender>,
    stop_tx: Option<StopSender>,
}

/// Simulated session binder tracking resource balance and release order.
pub struct SimBinder {
    state: Arc<Mutex<BinderState>>,
}

impl SimBinder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(Mutex::new(BinderState::default())),
        })
    }

    pub fn set_fail_acquire(&self, error: Option<BindError>) {
        self.state.lock().expect("binder poisoned").fail_acquire = error;
    }

    pub fn set_fail_bind(&self, error: Option<BindError>) {
        self.state.lock().expect("binder poisoned").fail_bind = error;
    }

    /// Platform revokes the capture grant out from under the session.
    pub fn fire_grant_revoked(&self) {
        let tx = self.state.lock().expect("binder poisoned").revoke_tx.clone();
        if let Some(tx) = tx {
            let _ = tx.send(ExternalStop::GrantRevoked);
        }
    }

    /// The bound display handle reports itself stopped.
    pub fn fire_output_stopped(&self) {
        let tx = self.state.lock().expect("binder poisoned").stop_tx.clone();
        if let Some(tx) = tx {
            let _ = tx.send(ExternalStop::OutputStopped);
        }
    }

    pub fn live_grants(&self) -> usize {
        self.state.lock().expect("binder poisoned").live_grants
    }

    pub fn live_displays(&self) -> usize {
        self.state.lock().expect("binder poisoned").live_displays
    }

    pub fn bind_calls(&self) -> Vec<(OutputId, Mode)> {
        self.state.lock().expect("binder poisoned").bind_calls.clone()
    }

    pub fn event_log(&self) -> Vec<String> {
        self.state.lock().expect("binder poisoned").events.clone()
    }
}

#[async_trait]
impl SessionBinder for SimBinder {
    async fn acquire(
        &self,
        token: GrantToken,
        revoked: StopSender,
    ) -> Result<Box<dyn CaptureGrant>, BindError> {
        let mut state = self.state.lock().expect("binder poisoned");
        if let Some(error) = state.fail_acquire.clone() {
            return Err(error);
        }
        tracing::debug!(token = token.as_str(), "Simulated grant acquired");
        state.events.push("acquire".to_string());
        state.live_grants += 1;
        state.revoke_tx = Some(revoked);
        Ok(Box::new(SimGrant {
            state: Arc::clone(&self.state),
            released: false,
        }))
    }
}

struct SimGrant {
    state: Arc<Mutex<BinderState>>,
    released: bool,
}

#[async_trait]
impl CaptureGrant for SimGrant {
    async fn bind(
        &mut self,
        output: OutputId,
        mode: Mode,
        stopped: StopSender,
    ) -> Result<Box<dyn DisplayHandle>, BindError> {
        let mut state = self.state.lock().expect("binder poisoned");
        if let Some(error) = state.fail_bind.clone() {
            return Err(error);
        }
        tracing::debug!(%output, %mode, "Simulated display bound");
        state.events.push("bind".to_string());
        state.bind_calls.push((output, mode));
        state.live_displays += 1;
        state.stop_tx = Some(stopped);
        Ok(Box::new(SimDisplay {
            state: Arc::clone(&self.state),
            released: false,
        }))
    }

    fn release(&mut self) {
        if self.released {
            tracing::warn!("Simulated grant released twice");
            return;
        }
        self.released = true;
        let mut state = self.state.lock().expect("binder poisoned");
        state.events.push("release-grant".to_string());
        state.live_grants = state.live_grants.saturating_sub(1);
        state.revoke_tx = None;
    }
}

struct SimDisplay {
    state: Arc<Mutex<BinderState>>,
    released: bool,
}

impl DisplayHandle for SimDisplay {
    fn release(&mut self) {
        if self.released {
            tracing::warn!("Simulated display handle released twice");
            return;
        }
        self.released = true;
        let mut state = self.state.lock().expect("binder poisoned");
        state.events.push("release-display".to_string());
        state.live_displays = state.live_displays.saturating_sub(1);
        state.stop_tx = None;
    }
}

// ---------------------------------------------------------------------------
// Settings store
// ---------------------------------------------------------------------------

/// In-memory settings store, optionally failing writes on request.
#[derive(Default)]
pub struct MemorySettings {
    preferred: Mutex<Option<Mode>>,
    last_active: AtomicBool,
    fail_writes: AtomicBool,
    writes: Mutex<VecDeque<String>>,
}

impl MemorySettings {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_preferred(mode: Mode) -> Arc<Self> {
        let settings = Self::default();
        *settings.preferred.lock().expect("preferred poisoned") = Some(mode);
        Arc::new(settings)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Chronological write log ("preferred_mode", "last_active").
    pub fn write_log(&self) -> Vec<String> {
        self.writes
            .lock()
            .expect("writes poisoned")
            .iter()
            .cloned()
            .collect()
    }

    fn record(&self, entry: &str) -> MirrorResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(MirrorError::settings("simulated settings write failure"));
        }
        self.writes
            .lock()
            .expect("writes poisoned")
            .push_back(entry.to_string());
        Ok(())
    }
}

impl SettingsStore for MemorySettings {
    fn preferred_mode(&self) -> MirrorResult<Option<Mode>> {
        Ok(*self.preferred.lock().expect("preferred poisoned"))
    }

    fn set_preferred_mode(&self, mode: Option<Mode>) -> MirrorResult<()> {
        self.record("preferred_mode")?;
        *self.preferred.lock().expect("preferred poisoned") = mode;
        Ok(())
    }

    fn last_active(&self) -> MirrorResult<bool> {
        Ok(self.last_active.load(Ordering::SeqCst))
    }

    fn set_last_active(&self, active: bool) -> MirrorResult<()> {
        self.record("last_active")?;
        self.last_active.store(active, Ordering::SeqCst);
        Ok(())
    }
}
