//! Provisioning identity of this node.

use bluemesh_core::record::NodeRecord;
use bluemesh_core::types::{DeviceUuid, UnicastAddress};

/// Who this node is: device UUID, primary unicast address, and the
/// provisioned latch.
///
/// The latch is one-way: provisioning completion or a restored node record
/// sets it, and only a node reset clears it.
#[derive(Debug, Default)]
pub struct NodeIdentity {
    provisioned: bool,
    device_uuid: Option<DeviceUuid>,
    primary_address: Option<UnicastAddress>,
}

impl NodeIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_provisioned(&self) -> bool {
        self.provisioned
    }

    pub fn device_uuid(&self) -> Option<&DeviceUuid> {
        self.device_uuid.as_ref()
    }

    pub fn set_device_uuid(&mut self, uuid: DeviceUuid) {
        self.device_uuid = Some(uuid);
    }

    pub fn primary_address(&self) -> Option<UnicastAddress> {
        self.primary_address
    }

    pub fn set_primary_address(&mut self, address: UnicastAddress) {
        self.primary_address = Some(address);
    }

    /// Latch the provisioned flag.
    pub fn mark_provisioned(&mut self) {
        self.provisioned = true;
    }

    /// Adopt a persisted node record: UUID, address, and the latch.
    pub fn restore(&mut self, record: &NodeRecord) {
        self.device_uuid = Some(record.device_uuid);
        self.primary_address = Some(record.unicast_address);
        self.provisioned = true;
    }

    /// Return to the unprovisioned state. The device UUID survives a reset.
    pub fn reset(&mut self) {
        self.provisioned = false;
        self.primary_address = None;
    }
}
