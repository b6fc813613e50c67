//! Fixed-layout persistence records for keys and node state.
//!
//! Records are the exact byte images written to the tag store. Layout and
//! field order are stable across versions; integers are little-endian.
//! Decoding demands the exact record length and rejects out-of-range field
//! values, so a corrupted slot surfaces as a [`RecordError`] the caller can
//! skip.
//!
//! # Record layouts
//!
//! Network key record (92 bytes):
//! ```text
//! netkey_index(2) + version(1) + net_key(16) + identity_key(16) + beacon_key(16)
//!     + network_id(8) + nid(1) + encryption_key(16) + privacy_key(16)
//! ```
//!
//! Application key record (22 bytes):
//! ```text
//! netkey_index(2) + appkey_index(2) + aid(1) + version(1) + key(16)
//! ```
//!
//! Node record (41 bytes):
//! ```text
//! device_uuid(16) + unicast_address(2) + device_key(16) + iv_index(4)
//!     + flags(1) + netkey_index(2)
//! ```

use crate::error::RecordError;
use crate::keys::{ApplicationKey, NetworkKey};
use crate::types::{
    Aid, AppKeyIndex, DeviceKey, DeviceUuid, IvIndex, KeyBytes, NetKeyIndex, NetworkId, Nid,
    UnicastAddress,
};

/// Size of an encoded network key record.
pub const NETWORK_KEY_RECORD_LEN: usize = 92;

/// Size of an encoded application key record.
pub const APP_KEY_RECORD_LEN: usize = 22;

/// Size of an encoded node record.
pub const NODE_RECORD_LEN: usize = 41;

/// Encode a network key into its persisted form.
#[must_use]
pub fn encode_network_key(key: &NetworkKey) -> [u8; NETWORK_KEY_RECORD_LEN] {
    let mut out = [0u8; NETWORK_KEY_RECORD_LEN];
    out[0..2].copy_from_slice(&key.netkey_index.value().to_le_bytes());
    out[2] = key.version;
    out[3..19].copy_from_slice(key.net_key.as_bytes());
    out[19..35].copy_from_slice(key.identity_key.as_bytes());
    out[35..51].copy_from_slice(key.beacon_key.as_bytes());
    out[51..59].copy_from_slice(key.network_id.as_ref());
    out[59] = key.nid.value();
    out[60..76].copy_from_slice(key.encryption_key.as_bytes());
    out[76..92].copy_from_slice(key.privacy_key.as_bytes());
    out
}

/// Decode a network key record.
///
/// The persisted derived fields are taken verbatim; nothing is re-derived.
pub fn decode_network_key(bytes: &[u8]) -> Result<NetworkKey, RecordError> {
    if bytes.len() != NETWORK_KEY_RECORD_LEN {
        return Err(RecordError::WrongLength {
            expected: NETWORK_KEY_RECORD_LEN,
            actual: bytes.len(),
        });
    }

    let netkey_index = NetKeyIndex::new(u16::from_le_bytes([bytes[0], bytes[1]]))?;
    let nid = Nid::new(bytes[59])?;

    let mut net_key = [0u8; 16];
    net_key.copy_from_slice(&bytes[3..19]);
    let mut identity_key = [0u8; 16];
    identity_key.copy_from_slice(&bytes[19..35]);
    let mut beacon_key = [0u8; 16];
    beacon_key.copy_from_slice(&bytes[35..51]);
    let mut network_id = [0u8; 8];
    network_id.copy_from_slice(&bytes[51..59]);
    let mut encryption_key = [0u8; 16];
    encryption_key.copy_from_slice(&bytes[60..76]);
    let mut privacy_key = [0u8; 16];
    privacy_key.copy_from_slice(&bytes[76..92]);

    Ok(NetworkKey {
        netkey_index,
        version: bytes[2],
        net_key: KeyBytes::new(net_key),
        identity_key: KeyBytes::new(identity_key),
        beacon_key: KeyBytes::new(beacon_key),
        network_id: NetworkId::new(network_id),
        nid,
        encryption_key: KeyBytes::new(encryption_key),
        privacy_key: KeyBytes::new(privacy_key),
    })
}

/// Encode an application key into its persisted form.
#[must_use]
pub fn encode_app_key(key: &ApplicationKey) -> [u8; APP_KEY_RECORD_LEN] {
    let mut out = [0u8; APP_KEY_RECORD_LEN];
    out[0..2].copy_from_slice(&key.netkey_index.value().to_le_bytes());
    out[2..4].copy_from_slice(&key.appkey_index.value().to_le_bytes());
    out[4] = key.aid.value();
    out[5] = key.version;
    out[6..22].copy_from_slice(key.key.as_bytes());
    out
}

/// Decode an application key record.
pub fn decode_app_key(bytes: &[u8]) -> Result<ApplicationKey, RecordError> {
    if bytes.len() != APP_KEY_RECORD_LEN {
        return Err(RecordError::WrongLength {
            expected: APP_KEY_RECORD_LEN,
            actual: bytes.len(),
        });
    }

    let netkey_index = NetKeyIndex::new(u16::from_le_bytes([bytes[0], bytes[1]]))?;
    let appkey_index = AppKeyIndex::new(u16::from_le_bytes([bytes[2], bytes[3]]))?;
    let aid = Aid::new(bytes[4])?;

    let mut key = [0u8; 16];
    key.copy_from_slice(&bytes[6..22]);

    Ok(ApplicationKey {
        netkey_index,
        appkey_index,
        aid,
        version: bytes[5],
        key: KeyBytes::new(key),
    })
}

/// Persisted identity of a provisioned node.
///
/// The presence of this record in the store is what makes a node provisioned
/// across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRecord {
    pub device_uuid: DeviceUuid,
    pub unicast_address: UnicastAddress,
    pub device_key: DeviceKey,
    pub iv_index: IvIndex,
    /// Raw provisioning flags (bit 0 key refresh, bit 1 IV update).
    pub flags: u8,
    /// Index of the network key received during provisioning.
    pub netkey_index: NetKeyIndex,
}

/// Encode a node record into its persisted form.
#[must_use]
pub fn encode_node_record(record: &NodeRecord) -> [u8; NODE_RECORD_LEN] {
    let mut out = [0u8; NODE_RECORD_LEN];
    out[0..16].copy_from_slice(record.device_uuid.as_ref());
    out[16..18].copy_from_slice(&record.unicast_address.value().to_le_bytes());
    out[18..34].copy_from_slice(record.device_key.as_ref());
    out[34..38].copy_from_slice(&record.iv_index.value().to_le_bytes());
    out[38] = record.flags;
    out[39..41].copy_from_slice(&record.netkey_index.value().to_le_bytes());
    out
}

/// Decode a node record.
pub fn decode_node_record(bytes: &[u8]) -> Result<NodeRecord, RecordError> {
    if bytes.len() != NODE_RECORD_LEN {
        return Err(RecordError::WrongLength {
            expected: NODE_RECORD_LEN,
            actual: bytes.len(),
        });
    }

    let unicast_address = UnicastAddress::new(u16::from_le_bytes([bytes[16], bytes[17]]))?;
    let netkey_index = NetKeyIndex::new(u16::from_le_bytes([bytes[39], bytes[40]]))?;

    let mut device_uuid = [0u8; 16];
    device_uuid.copy_from_slice(&bytes[0..16]);
    let mut device_key = [0u8; 16];
    device_key.copy_from_slice(&bytes[18..34]);

    Ok(NodeRecord {
        device_uuid: DeviceUuid::new(device_uuid),
        unicast_address,
        device_key: DeviceKey::new(device_key),
        iv_index: IvIndex::new(u32::from_le_bytes([
            bytes[34], bytes[35], bytes[36], bytes[37],
        ])),
        flags: bytes[38],
        netkey_index,
    })
}
