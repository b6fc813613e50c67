//! Bring-up sequencing for node startup.
//!
//! The step order is a real protocol: a step may rely on everything before
//! it and nothing after it. `bringup_sequence` computes the ordered plan
//! from the capability set; [`MeshNode::start`] executes it.
//!
//! [`MeshNode::start`]: crate::node::MeshNode::start

/// Which optional bearers and roles this build of the node supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Provisioning over the advertising bearer.
    pub pb_adv: bool,
    /// Provisioning over GATT.
    pub pb_gatt: bool,
    /// GATT proxy role (connectable network-id / node-identity advertising).
    pub proxy: bool,
}

impl Capabilities {
    /// Capabilities of this build, from the compiled cargo features.
    pub fn from_features() -> Self {
        Self {
            pb_adv: cfg!(feature = "pb-adv"),
            pb_gatt: cfg!(feature = "pb-gatt"),
            proxy: cfg!(feature = "proxy"),
        }
    }

    pub fn all() -> Self {
        Self {
            pb_adv: true,
            pb_gatt: true,
            proxy: true,
        }
    }

    pub fn none() -> Self {
        Self {
            pb_adv: false,
            pb_gatt: false,
            proxy: false,
        }
    }

    /// The GATT bearer carries both PB-GATT and the proxy service.
    pub fn needs_gatt_bearer(&self) -> bool {
        self.pb_gatt || self.proxy
    }
}

/// One step of the bring-up sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringUpStep {
    RegisterEventHandler,
    InitAdvBearer,
    InitGattBearer,
    InitBeacon,
    InitProvisioning,
    InitNodeIdentity,
    InitNetwork,
    InitLowerTransport,
    InitUpperTransport,
    InitAccess,
    RegisterDefaultModels,
}

/// Compute the ordered bring-up plan for a capability set.
///
/// The advertising bearer always initializes; the GATT bearer only when a
/// capability runs over it, and the unprovisioned beacon only with PB-ADV.
pub fn bringup_sequence(caps: Capabilities) -> Vec<BringUpStep> {
    let mut steps = vec![
        BringUpStep::RegisterEventHandler,
        BringUpStep::InitAdvBearer,
    ];
    if caps.needs_gatt_bearer() {
        steps.push(BringUpStep::InitGattBearer);
    }
    if caps.pb_adv {
        steps.push(BringUpStep::InitBeacon);
    }
    steps.extend([
        BringUpStep::InitProvisioning,
        BringUpStep::InitNodeIdentity,
        BringUpStep::InitNetwork,
        BringUpStep::InitLowerTransport,
        BringUpStep::InitUpperTransport,
        BringUpStep::InitAccess,
        BringUpStep::RegisterDefaultModels,
    ]);
    steps
}
