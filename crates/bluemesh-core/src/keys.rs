//! Network and application key entities.
//!
//! A [`NetworkKey`] carries its raw key plus every secret derived from it.
//! Derivation happens once, in [`NetworkKey::derive`], and the results travel
//! with the key from then on, including through persistence; records loaded
//! from storage are trusted verbatim and never re-derived. An
//! [`ApplicationKey`] is bound to the network key it was distributed under
//! and carries the 6-bit AID derived from its raw key.

use bluemesh_crypto::derive;

use crate::types::{Aid, AppKeyIndex, KeyBytes, NetKeyIndex, NetworkId, Nid};

/// A network key and all material derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkKey {
    pub netkey_index: NetKeyIndex,
    /// Key-refresh generation of this key.
    pub version: u8,
    pub net_key: KeyBytes,
    pub identity_key: KeyBytes,
    pub beacon_key: KeyBytes,
    pub network_id: NetworkId,
    pub nid: Nid,
    pub encryption_key: KeyBytes,
    pub privacy_key: KeyBytes,
}

impl NetworkKey {
    /// Build a network key from raw key material, deriving the identity key,
    /// beacon key, network ID, NID, encryption key and privacy key.
    pub fn derive(netkey_index: NetKeyIndex, net_key: KeyBytes) -> Self {
        let material = derive::k2(net_key.as_bytes(), &[0x00]);
        Self {
            netkey_index,
            version: 0,
            net_key,
            identity_key: KeyBytes::new(derive::identity_key(net_key.as_bytes())),
            beacon_key: KeyBytes::new(derive::beacon_key(net_key.as_bytes())),
            network_id: NetworkId::new(derive::k3(net_key.as_bytes())),
            nid: Nid(material.nid),
            encryption_key: KeyBytes::new(material.encryption_key),
            privacy_key: KeyBytes::new(material.privacy_key),
        }
    }
}

/// An application key bound to one network key.
///
/// Any traffic secured with an application key implies the application key
/// flag; the device key is the only other upper-transport key and is kept on
/// the node itself, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationKey {
    pub netkey_index: NetKeyIndex,
    pub appkey_index: AppKeyIndex,
    pub aid: Aid,
    /// Key-refresh generation of this key.
    pub version: u8,
    pub key: KeyBytes,
}

impl ApplicationKey {
    /// Build an application key from raw key material, deriving the AID.
    pub fn derive(netkey_index: NetKeyIndex, appkey_index: AppKeyIndex, key: KeyBytes) -> Self {
        Self {
            netkey_index,
            appkey_index,
            aid: Aid(derive::k4(key.as_bytes())),
            version: 0,
            key,
        }
    }
}
