//! The advertising bearer seam.
//!
//! The node drives connectable and non-connectable advertising through this
//! trait; the real GATT/HCI plumbing lives outside the crate. A bearer has a
//! single advertising slot, so starting one proxy mode replaces whatever was
//! advertised before.

use std::sync::{Arc, Mutex};

use tracing::debug;

/// The proxy advertising modes defined by the Mesh Profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMode {
    /// Network-id advertisement (identification type 0x00).
    NetworkId,
    /// Node-identity advertisement (identification type 0x01).
    NodeIdentity,
    /// Unprovisioned-device advertisement inviting PB-GATT provisioning.
    Unprovisioned,
}

/// Advertising operations the node needs from a bearer.
///
/// Payloads arrive fully built (see `bluemesh_core::advertising`); the bearer
/// only schedules them.
pub trait AdvBearer: Send {
    fn name(&self) -> &'static str;

    /// Start broadcasting the unprovisioned-device beacon payload.
    fn start_unprovisioned_beacon(&mut self, payload: Vec<u8>);

    fn stop_unprovisioned_beacon(&mut self);

    /// Start connectable proxy advertising. Replaces the current mode; the
    /// bearer has one advertising slot.
    fn start_proxy_advertising(&mut self, mode: ProxyMode, payload: Vec<u8>);

    fn stop_proxy_advertising(&mut self);

    /// Whether the unprovisioned-device beacon is broadcasting.
    fn beacon_active(&self) -> bool;

    /// The currently advertised proxy mode, if any.
    fn proxy_mode(&self) -> Option<ProxyMode>;
}

/// Bearer used when no radio is attached. Tracks state and logs at debug so
/// the lifecycle stays observable in the CLI demo.
#[derive(Debug, Default)]
pub struct NullBearer {
    beacon_active: bool,
    proxy: Option<ProxyMode>,
}

impl NullBearer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AdvBearer for NullBearer {
    fn name(&self) -> &'static str {
        "null"
    }

    fn start_unprovisioned_beacon(&mut self, payload: Vec<u8>) {
        debug!(len = payload.len(), "null bearer: unprovisioned beacon started");
        self.beacon_active = true;
    }

    fn stop_unprovisioned_beacon(&mut self) {
        debug!("null bearer: unprovisioned beacon stopped");
        self.beacon_active = false;
    }

    fn start_proxy_advertising(&mut self, mode: ProxyMode, payload: Vec<u8>) {
        debug!(?mode, len = payload.len(), "null bearer: proxy advertising started");
        self.proxy = Some(mode);
    }

    fn stop_proxy_advertising(&mut self) {
        debug!("null bearer: proxy advertising stopped");
        self.proxy = None;
    }

    fn beacon_active(&self) -> bool {
        self.beacon_active
    }

    fn proxy_mode(&self) -> Option<ProxyMode> {
        self.proxy
    }
}

/// One recorded bearer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BearerCall {
    BeaconStarted(Vec<u8>),
    BeaconStopped,
    ProxyStarted(ProxyMode, Vec<u8>),
    ProxyStopped,
}

#[derive(Debug, Default)]
struct RecordingState {
    calls: Vec<BearerCall>,
    beacon_active: bool,
    proxy: Option<ProxyMode>,
}

/// Test bearer recording every call. Clones share the recording, so tests
/// keep a handle while the node owns the bearer.
#[derive(Debug, Clone, Default)]
pub struct RecordingBearer {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingBearer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call recorded so far, in order.
    pub fn calls(&self) -> Vec<BearerCall> {
        self.state.lock().expect("recording mutex poisoned").calls.clone()
    }

    /// The most recent proxy advertising start, if any.
    pub fn last_proxy_start(&self) -> Option<(ProxyMode, Vec<u8>)> {
        self.state
            .lock()
            .expect("recording mutex poisoned")
            .calls
            .iter()
            .rev()
            .find_map(|call| match call {
                BearerCall::ProxyStarted(mode, payload) => Some((*mode, payload.clone())),
                _ => None,
            })
    }

    /// Forget recorded calls, keeping the advertising state.
    pub fn clear(&self) {
        self.state
            .lock()
            .expect("recording mutex poisoned")
            .calls
            .clear();
    }
}

impl AdvBearer for RecordingBearer {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn start_unprovisioned_beacon(&mut self, payload: Vec<u8>) {
        let mut state = self.state.lock().expect("recording mutex poisoned");
        state.beacon_active = true;
        state.calls.push(BearerCall::BeaconStarted(payload));
    }

    fn stop_unprovisioned_beacon(&mut self) {
        let mut state = self.state.lock().expect("recording mutex poisoned");
        state.beacon_active = false;
        state.calls.push(BearerCall::BeaconStopped);
    }

    fn start_proxy_advertising(&mut self, mode: ProxyMode, payload: Vec<u8>) {
        let mut state = self.state.lock().expect("recording mutex poisoned");
        state.proxy = Some(mode);
        state.calls.push(BearerCall::ProxyStarted(mode, payload));
    }

    fn stop_proxy_advertising(&mut self) {
        let mut state = self.state.lock().expect("recording mutex poisoned");
        state.proxy = None;
        state.calls.push(BearerCall::ProxyStopped);
    }

    fn beacon_active(&self) -> bool {
        self.state.lock().expect("recording mutex poisoned").beacon_active
    }

    fn proxy_mode(&self) -> Option<ProxyMode> {
        self.state.lock().expect("recording mutex poisoned").proxy
    }
}

/// Wraps the concrete bearer types, dispatching trait methods via match.
pub enum AnyBearer {
    Null(NullBearer),
    Recording(RecordingBearer),
}

/// Delegate a method to the active bearer variant.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            Self::Null(b) => b.$method($($arg),*),
            Self::Recording(b) => b.$method($($arg),*),
        }
    };
}

impl AnyBearer {
    pub fn name(&self) -> &'static str {
        delegate!(self, name)
    }

    pub fn start_unprovisioned_beacon(&mut self, payload: Vec<u8>) {
        delegate!(self, start_unprovisioned_beacon, payload)
    }

    pub fn stop_unprovisioned_beacon(&mut self) {
        delegate!(self, stop_unprovisioned_beacon)
    }

    pub fn start_proxy_advertising(&mut self, mode: ProxyMode, payload: Vec<u8>) {
        delegate!(self, start_proxy_advertising, mode, payload)
    }

    pub fn stop_proxy_advertising(&mut self) {
        delegate!(self, stop_proxy_advertising)
    }

    pub fn beacon_active(&self) -> bool {
        delegate!(self, beacon_active)
    }

    pub fn proxy_mode(&self) -> Option<ProxyMode> {
        delegate!(self, proxy_mode)
    }
}

impl std::fmt::Debug for AnyBearer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AnyBearer({})", self.name())
    }
}
