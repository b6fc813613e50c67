//! Stand-ins for the stack layers above the bearer.
//!
//! The full network, transport, and access implementations live outside this
//! crate; these types hold exactly the state the lifecycle core manages on
//! their behalf: the IV index, per-subnet beacon bookkeeping, the device key,
//! and the model composition of the primary element.

use bluemesh_core::types::{DeviceKey, IvIndex, NetKeyIndex};

/// IV index state shared by every subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IvState {
    pub index: IvIndex,
    pub update_active: bool,
}

impl Default for IvState {
    fn default() -> Self {
        Self {
            index: IvIndex::new(0),
            update_active: false,
        }
    }
}

/// One subnet, keyed by the global netkey index of its network key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subnet {
    pub netkey_index: NetKeyIndex,
    /// Whether secure network beacons are being sent for this subnet.
    pub beacon_active: bool,
}

/// Network layer state: IV index plus the subnet table.
#[derive(Debug, Default)]
pub struct NetworkLayer {
    iv: IvState,
    subnets: Vec<Subnet>,
}

impl NetworkLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt a persisted IV index, e.g. from the node record after restart.
    pub fn iv_recovered(&mut self, index: IvIndex, update_active: bool) {
        self.iv = IvState {
            index,
            update_active,
        };
    }

    pub fn iv_index(&self) -> IvIndex {
        self.iv.index
    }

    pub fn iv_update_active(&self) -> bool {
        self.iv.update_active
    }

    /// Register a subnet for a network key. Idempotent; beacons start
    /// separately.
    pub fn configure_subnet(&mut self, netkey_index: NetKeyIndex) {
        if self.subnet(netkey_index).is_none() {
            self.subnets.push(Subnet {
                netkey_index,
                beacon_active: false,
            });
        }
    }

    /// Drop the subnet for a network key, stopping its beacon with it.
    pub fn remove_subnet(&mut self, netkey_index: NetKeyIndex) {
        self.subnets.retain(|s| s.netkey_index != netkey_index);
    }

    pub fn subnet(&self, netkey_index: NetKeyIndex) -> Option<&Subnet> {
        self.subnets.iter().find(|s| s.netkey_index == netkey_index)
    }

    pub fn subnets(&self) -> impl Iterator<Item = &Subnet> {
        self.subnets.iter()
    }

    /// Mark the subnet's secure network beacon as running. Returns false when
    /// no subnet is configured for the index.
    pub fn start_beacon(&mut self, netkey_index: NetKeyIndex) -> bool {
        match self
            .subnets
            .iter_mut()
            .find(|s| s.netkey_index == netkey_index)
        {
            Some(subnet) => {
                subnet.beacon_active = true;
                true
            }
            None => false,
        }
    }

    /// Stop the subnet's secure network beacon. No-op for unknown subnets.
    pub fn stop_beacon(&mut self, netkey_index: NetKeyIndex) {
        if let Some(subnet) = self
            .subnets
            .iter_mut()
            .find(|s| s.netkey_index == netkey_index)
        {
            subnet.beacon_active = false;
        }
    }
}

/// Lower transport layer. Holds no lifecycle state; its construction order
/// relative to the upper transport is what matters here.
#[derive(Debug, Default)]
pub struct LowerTransport;

impl LowerTransport {
    pub fn new() -> Self {
        Self
    }
}

/// Upper transport layer. Owns the device key used for device-keyed
/// encryption once the node is provisioned.
#[derive(Debug, Default)]
pub struct UpperTransport {
    device_key: Option<DeviceKey>,
}

impl UpperTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_device_key(&mut self, key: DeviceKey) {
        self.device_key = Some(key);
    }

    pub fn clear_device_key(&mut self) {
        self.device_key = None;
    }

    pub fn device_key(&self) -> Option<&DeviceKey> {
        self.device_key.as_ref()
    }
}

/// Company id marking a Bluetooth SIG defined model.
pub const SIG_COMPANY_ID: u16 = 0xffff;

/// SIG model id of the mandatory Configuration Server.
pub const CONFIGURATION_SERVER_MODEL_ID: u16 = 0x0000;

/// SIG model id of the mandatory Health Server.
pub const HEALTH_SERVER_MODEL_ID: u16 = 0x0002;

/// A model identity: SIG models use company id 0xffff, vendor models their
/// assigned company id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelIdentifier {
    pub company_id: u16,
    pub model_id: u16,
}

impl ModelIdentifier {
    pub const fn sig(model_id: u16) -> Self {
        Self {
            company_id: SIG_COMPANY_ID,
            model_id,
        }
    }

    pub const fn vendor(company_id: u16, model_id: u16) -> Self {
        Self {
            company_id,
            model_id,
        }
    }

    pub const fn is_sig(&self) -> bool {
        self.company_id == SIG_COMPANY_ID
    }
}

/// One element of the node's composition.
#[derive(Debug, Default)]
pub struct Element {
    models: Vec<ModelIdentifier>,
}

impl Element {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a model to this element. Returns false if it was already present.
    pub fn add_model(&mut self, model: ModelIdentifier) -> bool {
        if self.has_model(model) {
            return false;
        }
        self.models.push(model);
        true
    }

    pub fn has_model(&self, model: ModelIdentifier) -> bool {
        self.models.contains(&model)
    }

    pub fn models(&self) -> &[ModelIdentifier] {
        &self.models
    }
}

/// Access layer composition. Every node has at least the primary element.
#[derive(Debug)]
pub struct AccessLayer {
    elements: Vec<Element>,
}

impl AccessLayer {
    pub fn new() -> Self {
        Self {
            elements: vec![Element::new()],
        }
    }

    pub fn primary_element(&self) -> &Element {
        &self.elements[0]
    }

    pub fn primary_element_mut(&mut self) -> &mut Element {
        &mut self.elements[0]
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }
}

impl Default for AccessLayer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn netkey(value: u16) -> NetKeyIndex {
        NetKeyIndex::new(value).unwrap()
    }

    #[test]
    fn test_iv_recovered_replaces_state() {
        let mut network = NetworkLayer::new();
        assert_eq!(network.iv_index(), IvIndex::new(0));
        assert!(!network.iv_update_active());

        network.iv_recovered(IvIndex::new(0x1234_5678), true);
        assert_eq!(network.iv_index(), IvIndex::new(0x1234_5678));
        assert!(network.iv_update_active());
    }

    #[test]
    fn test_configure_subnet_idempotent() {
        let mut network = NetworkLayer::new();
        network.configure_subnet(netkey(0));
        network.configure_subnet(netkey(0));

        assert_eq!(network.subnets().count(), 1);
    }

    #[test]
    fn test_beacon_flags_per_subnet() {
        let mut network = NetworkLayer::new();
        network.configure_subnet(netkey(0));
        network.configure_subnet(netkey(1));

        assert!(network.start_beacon(netkey(0)));
        assert!(network.subnet(netkey(0)).unwrap().beacon_active);
        assert!(!network.subnet(netkey(1)).unwrap().beacon_active);

        network.stop_beacon(netkey(0));
        assert!(!network.subnet(netkey(0)).unwrap().beacon_active);
    }

    #[test]
    fn test_start_beacon_unknown_subnet() {
        let mut network = NetworkLayer::new();
        assert!(!network.start_beacon(netkey(7)));
    }

    #[test]
    fn test_remove_subnet() {
        let mut network = NetworkLayer::new();
        network.configure_subnet(netkey(3));
        network.remove_subnet(netkey(3));

        assert!(network.subnet(netkey(3)).is_none());
    }

    #[test]
    fn test_upper_transport_device_key() {
        let mut upper = UpperTransport::new();
        assert!(upper.device_key().is_none());

        upper.set_device_key(DeviceKey::new([7u8; 16]));
        assert!(upper.device_key().is_some());

        upper.clear_device_key();
        assert!(upper.device_key().is_none());
    }

    #[test]
    fn test_element_add_model_dedupes() {
        let mut element = Element::new();
        let config_server = ModelIdentifier::sig(CONFIGURATION_SERVER_MODEL_ID);

        assert!(element.add_model(config_server));
        assert!(!element.add_model(config_server));
        assert_eq!(element.models().len(), 1);
    }

    #[test]
    fn test_model_identifier_kinds() {
        assert!(ModelIdentifier::sig(HEALTH_SERVER_MODEL_ID).is_sig());
        assert!(!ModelIdentifier::vendor(0x0059, 0x0001).is_sig());
    }

    #[test]
    fn test_access_layer_has_primary_element() {
        let access = AccessLayer::new();
        assert_eq!(access.elements().len(), 1);
        assert!(access.primary_element().models().is_empty());
    }
}
