//! AES-CMAC message authentication.
//!
//! Thin wrapper over the `cmac` crate with `aes::Aes128`. Every derivation in
//! [`crate::derive`] reduces to chains of this one primitive.

use aes::Aes128;
use cmac::{Cmac, Mac};

type AesCmac = Cmac<Aes128>;

/// Compute the AES-CMAC of `data` under the 128-bit `key`.
pub fn aes_cmac(key: &[u8; 16], data: &[u8]) -> [u8; 16] {
    let mut mac = AesCmac::new_from_slice(key).expect("AES-CMAC accepts 16-byte keys");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Compute the AES-CMAC of the concatenation of `parts` under `key`,
/// without materializing the concatenation.
pub fn aes_cmac_parts(key: &[u8; 16], parts: &[&[u8]]) -> [u8; 16] {
    let mut mac = AesCmac::new_from_slice(key).expect("AES-CMAC accepts 16-byte keys");
    for part in parts {
        mac.update(part);
    }
    mac.finalize().into_bytes().into()
}
