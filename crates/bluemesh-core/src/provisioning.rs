//! Provisioning output delivered when a device joins a network.

use crate::types::{DeviceKey, IvIndex, KeyBytes, NetKeyIndex, UnicastAddress};

/// Flags bit 0: key refresh in progress on the primary subnet.
pub const FLAG_KEY_REFRESH: u8 = 0x01;

/// Flags bit 1: IV update in progress.
pub const FLAG_IV_UPDATE: u8 = 0x02;

/// Everything a provisioner hands a device at the end of provisioning.
///
/// The network key arrives as raw material; the receiving node derives the
/// full [`crate::keys::NetworkKey`] when it adds the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisioningData {
    pub unicast_address: UnicastAddress,
    pub device_key: DeviceKey,
    pub iv_index: IvIndex,
    /// Raw 2-bit flags octet from the provisioning PDU.
    pub flags: u8,
    pub netkey_index: NetKeyIndex,
    pub net_key: KeyBytes,
}

impl ProvisioningData {
    pub fn key_refresh_in_progress(&self) -> bool {
        self.flags & FLAG_KEY_REFRESH != 0
    }

    pub fn iv_update_active(&self) -> bool {
        self.flags & FLAG_IV_UPDATE != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_data(flags: u8) -> ProvisioningData {
        ProvisioningData {
            unicast_address: UnicastAddress::new(0x0042).unwrap(),
            device_key: DeviceKey::new([0x11; 16]),
            iv_index: IvIndex::new(7),
            flags,
            netkey_index: NetKeyIndex::new(0).unwrap(),
            net_key: KeyBytes::new([0x22; 16]),
        }
    }

    #[test]
    fn test_flag_decoding() {
        assert!(!make_data(0x00).iv_update_active());
        assert!(!make_data(0x00).key_refresh_in_progress());

        assert!(make_data(FLAG_IV_UPDATE).iv_update_active());
        assert!(!make_data(FLAG_IV_UPDATE).key_refresh_in_progress());

        assert!(make_data(FLAG_KEY_REFRESH).key_refresh_in_progress());
        assert!(make_data(0x03).iv_update_active());
    }
}
