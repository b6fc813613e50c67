//! Typed events consumed by the node's event loop.
//!
//! The controller and provisioning collaborators are external; their
//! callbacks feed these variants into the node's event channel, and tests
//! inject them directly through [`MeshNode::handle_event`].
//!
//! [`MeshNode::handle_event`]: crate::node::MeshNode::handle_event

use bluemesh_core::provisioning::ProvisioningData;
use bluemesh_core::types::DeviceUuid;

/// Connectivity and readiness events from the controller layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    /// The stack is powered and operational. Storage can now be resolved.
    StackOperational,
    /// A central connected to this node.
    ConnectionEstablished,
    /// The active connection dropped.
    LinkDisconnected,
}

/// Events emitted by the provisioning collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningEvent {
    /// A provisioning link opened over PB-ADV or PB-GATT.
    LinkOpened,
    /// The provisioning link closed.
    LinkClosed,
    /// Provisioning finished successfully with this session output.
    Complete(ProvisioningData),
    /// Provisioning aborted; `reason` is the protocol error code.
    Failed { reason: u8 },
}

/// Everything the node's event loop consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    Controller(ControllerEvent),
    Provisioning(ProvisioningEvent),
    /// Asynchronous device UUID generation finished.
    DeviceUuidReady(DeviceUuid),
}
