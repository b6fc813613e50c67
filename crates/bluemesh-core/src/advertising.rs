//! Advertising payload construction for proxy and provisioning bearers.
//!
//! Builders here produce the full advertising-data byte sequences a bearer
//! broadcasts; nothing is stateful, so callers can precompute and cache them.
//! Service UUIDs inside AD structures are little-endian, while the OOB field
//! in beacons is big-endian, per their respective wire conventions.
//!
//! # Payload layouts
//!
//! Proxy advertisement with network ID (20 bytes):
//! ```text
//! flags(3) + uuid_list(4, 0x1828) + service_data(13: 0x00 + network_id(8))
//! ```
//!
//! Proxy advertisement with node identity (28 bytes):
//! ```text
//! flags(3) + uuid_list(4, 0x1828) + service_data(21: 0x01 + hash(8) + random(8))
//! ```
//!
//! Connectable advertisement of an unprovisioned device (29 bytes):
//! ```text
//! flags(3) + uuid_list(4, 0x1827) + service_data(22: uuid(16) + oob(2))
//! ```
//!
//! Unprovisioned device beacon payload (19 bytes, no AD framing; the beacon
//! bearer wraps it):
//! ```text
//! beacon_type(1, 0x00) + uuid(16) + oob(2)
//! ```

use crate::types::{DeviceUuid, NetworkId};

/// 16-bit UUID of the Mesh Proxy service.
pub const MESH_PROXY_SERVICE: u16 = 0x1828;

/// 16-bit UUID of the Mesh Provisioning service.
pub const MESH_PROVISIONING_SERVICE: u16 = 0x1827;

/// Proxy service data identification type for a network ID payload.
pub const IDENTIFICATION_NETWORK_ID: u8 = 0x00;

/// Proxy service data identification type for a node identity payload.
pub const IDENTIFICATION_NODE_IDENTITY: u8 = 0x01;

/// Mesh beacon type of the unprovisioned device beacon.
pub const BEACON_UNPROVISIONED_DEVICE: u8 = 0x00;

pub const NETWORK_ID_ADV_LEN: usize = 20;
pub const NODE_IDENTITY_ADV_LEN: usize = 28;
pub const UNPROVISIONED_ADV_LEN: usize = 29;
pub const UNPROVISIONED_BEACON_LEN: usize = 19;

/// Write the flags AD and the complete 16-bit service UUID list.
fn write_preamble(out: &mut [u8], service: u16) {
    // Flags: LE general discoverable, BR/EDR not supported.
    out[0] = 0x02;
    out[1] = 0x01;
    out[2] = 0x06;
    // Complete list of 16-bit service UUIDs.
    out[3] = 0x03;
    out[4] = 0x03;
    out[5..7].copy_from_slice(&service.to_le_bytes());
}

/// Proxy advertisement identifying a subnet by its network ID.
#[must_use]
pub fn network_id_advertisement(network_id: &NetworkId) -> [u8; NETWORK_ID_ADV_LEN] {
    let mut out = [0u8; NETWORK_ID_ADV_LEN];
    write_preamble(&mut out, MESH_PROXY_SERVICE);
    // Service data: 0x16, proxy service UUID, identification type, network ID.
    out[7] = 0x0c;
    out[8] = 0x16;
    out[9..11].copy_from_slice(&MESH_PROXY_SERVICE.to_le_bytes());
    out[11] = IDENTIFICATION_NETWORK_ID;
    out[12..20].copy_from_slice(network_id.as_ref());
    out
}

/// Proxy advertisement identifying this node by a keyed hash.
///
/// `hash` comes from [`bluemesh_crypto::derive::node_identity_hash`] over the
/// subnet's identity key, `random` and the node's unicast address.
#[must_use]
pub fn node_identity_advertisement(hash: &[u8; 8], random: &[u8; 8]) -> [u8; NODE_IDENTITY_ADV_LEN] {
    let mut out = [0u8; NODE_IDENTITY_ADV_LEN];
    write_preamble(&mut out, MESH_PROXY_SERVICE);
    out[7] = 0x14;
    out[8] = 0x16;
    out[9..11].copy_from_slice(&MESH_PROXY_SERVICE.to_le_bytes());
    out[11] = IDENTIFICATION_NODE_IDENTITY;
    out[12..20].copy_from_slice(hash);
    out[20..28].copy_from_slice(random);
    out
}

/// Connectable advertisement of an unprovisioned device (PB-GATT).
#[must_use]
pub fn unprovisioned_device_advertisement(
    uuid: &DeviceUuid,
    oob_info: u16,
) -> [u8; UNPROVISIONED_ADV_LEN] {
    let mut out = [0u8; UNPROVISIONED_ADV_LEN];
    write_preamble(&mut out, MESH_PROVISIONING_SERVICE);
    out[7] = 0x15;
    out[8] = 0x16;
    out[9..11].copy_from_slice(&MESH_PROVISIONING_SERVICE.to_le_bytes());
    out[11..27].copy_from_slice(uuid.as_ref());
    out[27..29].copy_from_slice(&oob_info.to_be_bytes());
    out
}

/// Unprovisioned device beacon payload (PB-ADV).
#[must_use]
pub fn unprovisioned_device_beacon(
    uuid: &DeviceUuid,
    oob_info: u16,
) -> [u8; UNPROVISIONED_BEACON_LEN] {
    let mut out = [0u8; UNPROVISIONED_BEACON_LEN];
    out[0] = BEACON_UNPROVISIONED_DEVICE;
    out[1..17].copy_from_slice(uuid.as_ref());
    out[17..19].copy_from_slice(&oob_info.to_be_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_uuid() -> DeviceUuid {
        DeviceUuid::new(core::array::from_fn(|i| 0xa0 + i as u8))
    }

    #[test]
    fn test_network_id_advertisement_layout() {
        let id = NetworkId::new([0xff, 0x04, 0x69, 0x58, 0x23, 0x3d, 0xb0, 0x14]);
        let adv = network_id_advertisement(&id);

        assert_eq!(&adv[0..3], &[0x02, 0x01, 0x06]);
        assert_eq!(&adv[3..7], &[0x03, 0x03, 0x28, 0x18], "proxy UUID little-endian");
        assert_eq!(adv[7], 0x0c, "service data AD length");
        assert_eq!(&adv[8..12], &[0x16, 0x28, 0x18, IDENTIFICATION_NETWORK_ID]);
        assert_eq!(&adv[12..20], id.as_ref());
    }

    #[test]
    fn test_node_identity_advertisement_layout() {
        let hash = [0x11; 8];
        let random = [0x22; 8];
        let adv = node_identity_advertisement(&hash, &random);

        assert_eq!(adv.len(), NODE_IDENTITY_ADV_LEN);
        assert_eq!(adv[7], 0x14);
        assert_eq!(adv[11], IDENTIFICATION_NODE_IDENTITY);
        assert_eq!(&adv[12..20], &hash);
        assert_eq!(&adv[20..28], &random);
    }

    #[test]
    fn test_unprovisioned_advertisement_layout() {
        let uuid = make_uuid();
        let adv = unprovisioned_device_advertisement(&uuid, 0x1234);

        assert_eq!(&adv[3..7], &[0x03, 0x03, 0x27, 0x18], "provisioning UUID little-endian");
        assert_eq!(adv[7], 0x15);
        assert_eq!(&adv[8..11], &[0x16, 0x27, 0x18]);
        assert_eq!(&adv[11..27], uuid.as_ref());
        assert_eq!(&adv[27..29], &[0x12, 0x34], "oob info big-endian");
    }

    #[test]
    fn test_unprovisioned_beacon_layout() {
        let uuid = make_uuid();
        let beacon = unprovisioned_device_beacon(&uuid, 0x0040);

        assert_eq!(beacon[0], BEACON_UNPROVISIONED_DEVICE);
        assert_eq!(&beacon[1..17], uuid.as_ref());
        assert_eq!(&beacon[17..19], &[0x00, 0x40]);
    }

    #[test]
    fn test_advertisements_fit_31_bytes() {
        assert!(NETWORK_ID_ADV_LEN <= 31);
        assert!(NODE_IDENTITY_ADV_LEN <= 31);
        assert!(UNPROVISIONED_ADV_LEN <= 31);
    }
}
