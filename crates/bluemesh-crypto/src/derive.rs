//! The `s1`/`k1`/`k2`/`k3`/`k4` derivation functions.
//!
//! Every piece of derived mesh security material comes out of these five
//! functions:
//!
//! - `k2` yields the NID, encryption key and privacy key for network-layer
//!   obfuscation and encryption.
//! - `k3` yields the 64-bit network ID advertised by proxy servers.
//! - `k4` yields the 6-bit application key identifier (AID).
//! - `k1` with the salts `s1("nkik")` / `s1("nkbk")` yields the identity and
//!   beacon keys.
//!
//! Multi-octet values fed to the block cipher are big-endian throughout.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;

use crate::cmac::{aes_cmac, aes_cmac_parts};

/// Info string for 128-bit `k1` derivations ("id128" || 0x01).
const ID128: &[u8] = b"id128\x01";

/// Output of [`k2`]: the triple that secures one network key's traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct K2Material {
    /// 7-bit network identifier carried in obfuscated packet headers.
    pub nid: u8,
    pub encryption_key: [u8; 16],
    pub privacy_key: [u8; 16],
}

/// s1 salt generation: AES-CMAC of `m` under the all-zero key.
pub fn s1(m: &[u8]) -> [u8; 16] {
    aes_cmac(&[0u8; 16], m)
}

/// k1 derivation: `AES-CMAC(AES-CMAC(salt, n), p)`.
pub fn k1(n: &[u8], salt: &[u8; 16], p: &[u8]) -> [u8; 16] {
    let t = aes_cmac(salt, n);
    aes_cmac(&t, p)
}

/// k2 network derivation from a network key `n` and bearer parameter `p`
/// (a single 0x00 octet for master security material).
pub fn k2(n: &[u8; 16], p: &[u8]) -> K2Material {
    let t = aes_cmac(&s1(b"smk2"), n);
    let t1 = aes_cmac_parts(&t, &[p, &[0x01]]);
    let t2 = aes_cmac_parts(&t, &[&t1, p, &[0x02]]);
    let t3 = aes_cmac_parts(&t, &[&t2, p, &[0x03]]);
    K2Material {
        nid: t1[15] & 0x7f,
        encryption_key: t2,
        privacy_key: t3,
    }
}

/// k3 derivation: the 64-bit network ID of a network key.
pub fn k3(n: &[u8; 16]) -> [u8; 8] {
    let t = aes_cmac(&s1(b"smk3"), n);
    let full = aes_cmac_parts(&t, &[b"id64", &[0x01]]);
    let mut out = [0u8; 8];
    out.copy_from_slice(&full[8..]);
    out
}

/// k4 derivation: the 6-bit application key identifier (AID).
pub fn k4(n: &[u8; 16]) -> u8 {
    let t = aes_cmac(&s1(b"smk4"), n);
    let full = aes_cmac_parts(&t, &[b"id6", &[0x01]]);
    full[15] & 0x3f
}

/// Identity key of a network key: `k1(n, s1("nkik"), "id128" || 0x01)`.
pub fn identity_key(n: &[u8; 16]) -> [u8; 16] {
    k1(n, &s1(b"nkik"), ID128)
}

/// Beacon key of a network key: `k1(n, s1("nkbk"), "id128" || 0x01)`.
pub fn beacon_key(n: &[u8; 16]) -> [u8; 16] {
    k1(n, &s1(b"nkbk"), ID128)
}

/// Hash for node identity advertising: the low 8 bytes of
/// `AES-128(identity_key, 0^6 || random || address)`.
pub fn node_identity_hash(identity_key: &[u8; 16], random: &[u8; 8], address: u16) -> [u8; 8] {
    let mut block = [0u8; 16];
    block[6..14].copy_from_slice(random);
    block[14..16].copy_from_slice(&address.to_be_bytes());

    let cipher = Aes128::new_from_slice(identity_key).expect("AES-128 accepts 16-byte keys");
    let mut state = GenericArray::from(block);
    cipher.encrypt_block(&mut state);

    let mut out = [0u8; 8];
    out.copy_from_slice(&state[8..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex16(s: &str) -> [u8; 16] {
        hex::decode(s)
            .expect("invalid hex")
            .try_into()
            .expect("must be 16 bytes")
    }

    fn hex8(s: &str) -> [u8; 8] {
        hex::decode(s)
            .expect("invalid hex")
            .try_into()
            .expect("must be 8 bytes")
    }

    // Mesh Profile section 8.1 sample data.

    #[test]
    fn test_s1_sample() {
        assert_eq!(s1(b"test"), hex16("b73cefbd641ef2ea598c2b6efb62f79c"));
    }

    #[test]
    fn test_k1_sample() {
        let n = hex::decode("3216d1509884b533248541792b877f98").expect("invalid hex");
        let salt = hex16("2ba14ffa0df84a2831938d57d276cab4");
        let p = hex::decode("5a09d60797eeb4478aada59db3352a0d").expect("invalid hex");
        assert_eq!(k1(&n, &salt, &p), hex16("f6ed15a8934afbe7d83e8dcb57fcf5d7"));
    }

    #[test]
    fn test_k2_master_sample() {
        let material = k2(&hex16("f7a2a44f8e8a8029064f173ddc1e2b00"), &[0x00]);
        assert_eq!(material.nid, 0x7f);
        assert_eq!(
            material.encryption_key,
            hex16("9f589181a0f50de73c8070c7a6d27f46")
        );
        assert_eq!(
            material.privacy_key,
            hex16("4c715bd4a64b938f99b453351653124f")
        );
    }

    #[test]
    fn test_k3_sample() {
        let n = hex16("f7a2a44f8e8a8029064f173ddc1e2b00");
        assert_eq!(k3(&n), hex8("ff046958233db014"));
    }

    #[test]
    fn test_k4_stays_within_6_bits() {
        for seed in 0..32u8 {
            let n = [seed; 16];
            assert!(k4(&n) <= 0x3f, "AID must fit in 6 bits for key {seed:02x}");
        }
    }

    #[test]
    fn test_identity_and_beacon_keys_differ() {
        let n = hex16("f7a2a44f8e8a8029064f173ddc1e2b00");
        assert_ne!(
            identity_key(&n),
            beacon_key(&n),
            "different salts must yield different derived keys"
        );
    }

    #[test]
    fn test_node_identity_hash_varies_with_inputs() {
        let key = identity_key(&hex16("f7a2a44f8e8a8029064f173ddc1e2b00"));
        let random = hex8("34ae608fbbc1f2c6");
        let base = node_identity_hash(&key, &random, 0x1201);
        assert_ne!(base, node_identity_hash(&key, &random, 0x1202));
        assert_ne!(base, node_identity_hash(&key, &hex8("34ae608fbbc1f2c7"), 0x1201));
    }
}
