//! Pure decision functions for the node lifecycle.
//!
//! These functions extract the transition decisions from [`MeshNode`]
//! handlers into stateless classifiers. The actual state mutations, storage
//! writes, and bearer calls remain in `node.rs`; these functions only decide
//! *what* the next state or advertising mode is.
//!
//! [`MeshNode`]: crate::node::MeshNode

/// Connection-oriented lifecycle of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No provisioning record; advertising as an unprovisioned device.
    Unprovisioned,
    /// A provisioning link is open and the protocol is running.
    Provisioning,
    /// Provisioned with no active connection; proxy advertising runs.
    ProvisionedDisconnected,
    /// A central is connected. Also entered by an unprovisioned node whose
    /// advertising slot was consumed by an incoming connection.
    ProvisionedConnected,
}

/// State at power-up, decided by whether a node record was recovered.
pub fn initial_state(node_record_present: bool) -> LifecycleState {
    if node_record_present {
        LifecycleState::ProvisionedDisconnected
    } else {
        LifecycleState::Unprovisioned
    }
}

/// What to advertise once a connection drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeAction {
    /// Connectable network-id proxy advertising.
    NetworkIdProxy,
    /// Unprovisioned-device beacon plus connectable unprovisioned
    /// advertising.
    UnprovisionedDevice,
}

/// Decide which advertising to resume after a disconnect.
pub fn advertising_after_disconnect(provisioned: bool) -> ResumeAction {
    if provisioned {
        ResumeAction::NetworkIdProxy
    } else {
        ResumeAction::UnprovisionedDevice
    }
}

/// Classify a connection-established event. The connection consumes the
/// advertising slot; a running provisioning exchange is left undisturbed.
pub fn on_connection_established(state: LifecycleState) -> LifecycleState {
    match state {
        LifecycleState::Unprovisioned | LifecycleState::ProvisionedDisconnected => {
            LifecycleState::ProvisionedConnected
        }
        other => other,
    }
}

/// Classify a link-disconnected event. The node lands in the disconnected
/// state matching its provisioned flag; a running provisioning exchange is
/// resolved by its own link-closed event instead.
pub fn on_link_disconnected(state: LifecycleState, provisioned: bool) -> LifecycleState {
    match state {
        LifecycleState::Provisioning => LifecycleState::Provisioning,
        _ if provisioned => LifecycleState::ProvisionedDisconnected,
        _ => LifecycleState::Unprovisioned,
    }
}

/// Classify a provisioning link-open event.
pub fn on_provisioning_link_opened(state: LifecycleState) -> LifecycleState {
    match state {
        LifecycleState::Unprovisioned => LifecycleState::Provisioning,
        other => other,
    }
}

/// Provisioning completed: the node is provisioned and, once the
/// provisioning link winds down, disconnected.
pub fn on_provisioning_complete() -> LifecycleState {
    LifecycleState::ProvisionedDisconnected
}

/// Provisioning failed: back to square one.
pub fn on_provisioning_failed() -> LifecycleState {
    LifecycleState::Unprovisioned
}

/// Classify a provisioning link-close event. Arrives after either completion
/// or failure, so the landing state follows the provisioned flag.
pub fn on_provisioning_link_closed(provisioned: bool) -> LifecycleState {
    if provisioned {
        LifecycleState::ProvisionedDisconnected
    } else {
        LifecycleState::Unprovisioned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- initial_state tests --------------------------------------------------

    #[test]
    fn initial_state_with_node_record() {
        assert_eq!(initial_state(true), LifecycleState::ProvisionedDisconnected);
    }

    #[test]
    fn initial_state_without_node_record() {
        assert_eq!(initial_state(false), LifecycleState::Unprovisioned);
    }

    // -- advertising_after_disconnect tests -----------------------------------

    #[test]
    fn disconnect_resumes_network_id_when_provisioned() {
        assert_eq!(
            advertising_after_disconnect(true),
            ResumeAction::NetworkIdProxy,
        );
    }

    #[test]
    fn disconnect_resumes_unprovisioned_device_when_not() {
        assert_eq!(
            advertising_after_disconnect(false),
            ResumeAction::UnprovisionedDevice,
        );
    }

    // -- on_connection_established tests --------------------------------------

    #[test]
    fn connection_consumes_slot_when_unprovisioned() {
        assert_eq!(
            on_connection_established(LifecycleState::Unprovisioned),
            LifecycleState::ProvisionedConnected,
        );
    }

    #[test]
    fn connection_consumes_slot_when_provisioned() {
        assert_eq!(
            on_connection_established(LifecycleState::ProvisionedDisconnected),
            LifecycleState::ProvisionedConnected,
        );
    }

    #[test]
    fn connection_leaves_provisioning_undisturbed() {
        assert_eq!(
            on_connection_established(LifecycleState::Provisioning),
            LifecycleState::Provisioning,
        );
    }

    #[test]
    fn duplicate_connection_is_stable() {
        assert_eq!(
            on_connection_established(LifecycleState::ProvisionedConnected),
            LifecycleState::ProvisionedConnected,
        );
    }

    // -- on_link_disconnected tests -------------------------------------------

    #[test]
    fn disconnect_when_provisioned_lands_disconnected() {
        assert_eq!(
            on_link_disconnected(LifecycleState::ProvisionedConnected, true),
            LifecycleState::ProvisionedDisconnected,
        );
    }

    #[test]
    fn disconnect_when_unprovisioned_lands_unprovisioned() {
        assert_eq!(
            on_link_disconnected(LifecycleState::ProvisionedConnected, false),
            LifecycleState::Unprovisioned,
        );
    }

    #[test]
    fn disconnect_while_already_unprovisioned_is_stable() {
        assert_eq!(
            on_link_disconnected(LifecycleState::Unprovisioned, false),
            LifecycleState::Unprovisioned,
        );
    }

    #[test]
    fn disconnect_leaves_provisioning_undisturbed() {
        assert_eq!(
            on_link_disconnected(LifecycleState::Provisioning, false),
            LifecycleState::Provisioning,
        );
    }

    // -- provisioning transition tests ----------------------------------------

    #[test]
    fn provisioning_link_opens_from_unprovisioned() {
        assert_eq!(
            on_provisioning_link_opened(LifecycleState::Unprovisioned),
            LifecycleState::Provisioning,
        );
    }

    #[test]
    fn provisioning_link_open_ignored_when_provisioned() {
        assert_eq!(
            on_provisioning_link_opened(LifecycleState::ProvisionedDisconnected),
            LifecycleState::ProvisionedDisconnected,
        );
    }

    #[test]
    fn provisioning_complete_lands_provisioned_disconnected() {
        assert_eq!(
            on_provisioning_complete(),
            LifecycleState::ProvisionedDisconnected,
        );
    }

    #[test]
    fn provisioning_failure_returns_to_unprovisioned() {
        assert_eq!(on_provisioning_failed(), LifecycleState::Unprovisioned);
    }

    #[test]
    fn provisioning_link_close_follows_latch() {
        assert_eq!(
            on_provisioning_link_closed(true),
            LifecycleState::ProvisionedDisconnected,
        );
        assert_eq!(
            on_provisioning_link_closed(false),
            LifecycleState::Unprovisioned,
        );
    }
}
