//! Newtype wrappers for mesh protocol fields.
//!
//! These types keep the many 16-byte secrets and small bounded integers of
//! the mesh security model from being mixed up. Key material deliberately has
//! no `Display` impl and a redacted `Debug`, so raw keys never reach logs.

use core::fmt;
use core::ops::Deref;

/// Helper to write lowercase hex without the `hex` crate.
fn fmt_hex(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for byte in bytes {
        write!(f, "{:02x}", byte)?;
    }
    Ok(())
}

/// 16 bytes of raw key material.
#[derive(Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct KeyBytes(pub(crate) [u8; 16]);

impl KeyBytes {
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl AsRef<[u8]> for KeyBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for KeyBytes {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| InvalidLength {
            expected: 16,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyBytes(..)")
    }
}

/// The device key assigned during provisioning.
#[derive(Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct DeviceKey(pub(crate) KeyBytes);

impl DeviceKey {
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(KeyBytes(bytes))
    }
}

impl Deref for DeviceKey {
    type Target = KeyBytes;
    fn deref(&self) -> &KeyBytes {
        &self.0
    }
}

impl AsRef<[u8]> for DeviceKey {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl TryFrom<&[u8]> for DeviceKey {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(KeyBytes::try_from(bytes)?))
    }
}

impl fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceKey(..)")
    }
}

/// The 16-byte device UUID advertised while unprovisioned.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct DeviceUuid(pub(crate) [u8; 16]);

impl DeviceUuid {
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for DeviceUuid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for DeviceUuid {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| InvalidLength {
            expected: 16,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for DeviceUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_hex(&self.0, f)
    }
}

impl fmt::Debug for DeviceUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceUuid(")?;
        fmt_hex(&self.0[..4], f)?;
        write!(f, "..)")
    }
}

/// The 8-byte network ID derived from a network key (k3).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct NetworkId(pub(crate) [u8; 8]);

impl NetworkId {
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for NetworkId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for NetworkId {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 8] = bytes.try_into().map_err(|_| InvalidLength {
            expected: 8,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_hex(&self.0, f)
    }
}

impl fmt::Debug for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NetworkId(")?;
        fmt_hex(&self.0[..4], f)?;
        write!(f, "..)")
    }
}

/// 13-bit index identifying a network key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct NetKeyIndex(pub(crate) u16);

impl NetKeyIndex {
    pub const MAX: u16 = 0x1fff;

    pub fn new(value: u16) -> Result<Self, ValueOutOfRange> {
        if value > Self::MAX {
            return Err(ValueOutOfRange {
                what: "netkey index",
                value: value as u32,
            });
        }
        Ok(Self(value))
    }

    pub const fn value(self) -> u16 {
        self.0
    }
}

impl fmt::Display for NetKeyIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// 13-bit index identifying an application key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct AppKeyIndex(pub(crate) u16);

impl AppKeyIndex {
    pub const MAX: u16 = 0x1fff;

    pub fn new(value: u16) -> Result<Self, ValueOutOfRange> {
        if value > Self::MAX {
            return Err(ValueOutOfRange {
                what: "appkey index",
                value: value as u32,
            });
        }
        Ok(Self(value))
    }

    pub const fn value(self) -> u16 {
        self.0
    }
}

impl fmt::Display for AppKeyIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// A 15-bit non-zero unicast element address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct UnicastAddress(pub(crate) u16);

impl UnicastAddress {
    pub const MAX: u16 = 0x7fff;

    pub fn new(value: u16) -> Result<Self, ValueOutOfRange> {
        if value == 0 || value > Self::MAX {
            return Err(ValueOutOfRange {
                what: "unicast address",
                value: value as u32,
            });
        }
        Ok(Self(value))
    }

    pub const fn value(self) -> u16 {
        self.0
    }
}

impl fmt::Display for UnicastAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// The 32-bit IV index shared by the whole network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct IvIndex(pub(crate) u32);

impl IvIndex {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for IvIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// 7-bit network identifier derived from a network key (k2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct Nid(pub(crate) u8);

impl Nid {
    pub const MAX: u8 = 0x7f;

    pub fn new(value: u8) -> Result<Self, ValueOutOfRange> {
        if value > Self::MAX {
            return Err(ValueOutOfRange {
                what: "nid",
                value: value as u32,
            });
        }
        Ok(Self(value))
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Nid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// 6-bit application key identifier derived from an application key (k4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct Aid(pub(crate) u8);

impl Aid {
    pub const MAX: u8 = 0x3f;

    pub fn new(value: u8) -> Result<Self, ValueOutOfRange> {
        if value > Self::MAX {
            return Err(ValueOutOfRange {
                what: "aid",
                value: value as u32,
            });
        }
        Ok(Self(value))
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// Error returned when a byte slice has the wrong length for a newtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLength {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for InvalidLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid length: expected {} bytes, got {}",
            self.expected, self.actual
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidLength {}

/// Error returned when a bounded field value falls outside its legal range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueOutOfRange {
    pub what: &'static str,
    pub value: u32,
}

impl fmt::Display for ValueOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {:#x}", self.what, self.value)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ValueOutOfRange {}
