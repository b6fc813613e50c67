//! Tag addressing for persisted records.
//!
//! A tag is the 32-bit key a record is stored under: two type bytes in the
//! high half and a 16-bit slot index in the low half. Each record kind gets
//! its own type-byte pair, so tag spaces are disjoint across kinds and slot
//! lookup is a constant-time composition:
//!
//! ```text
//! tag = (type_byte_1 << 24) | (type_byte_2 << 16) | internal_index
//! ```
//!
//! The pairs `MN` (network keys) and `MA` (application keys) are load-bearing
//! for cross-version compatibility and must never change. `MP` holds the
//! single node record at index 0.

use core::fmt;

/// Slot index within one record kind's tag space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct InternalIndex(pub u16);

impl fmt::Display for InternalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kinds of record this store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    NetworkKey,
    ApplicationKey,
    Node,
}

impl RecordKind {
    const fn type_bytes(self) -> (u8, u8) {
        match self {
            RecordKind::NetworkKey => (b'M', b'N'),
            RecordKind::ApplicationKey => (b'M', b'A'),
            RecordKind::Node => (b'M', b'P'),
        }
    }
}

/// A 32-bit storage tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct Tag(u32);

impl Tag {
    pub const fn new(kind: RecordKind, index: InternalIndex) -> Self {
        let (b0, b1) = kind.type_bytes();
        Self(((b0 as u32) << 24) | ((b1 as u32) << 16) | index.0 as u32)
    }

    /// Tag of the single node record.
    pub const fn node_record() -> Self {
        Self::new(RecordKind::Node, InternalIndex(0))
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_composition() {
        let tag = Tag::new(RecordKind::NetworkKey, InternalIndex(3));
        assert_eq!(tag.value(), 0x4d4e_0003);

        let tag = Tag::new(RecordKind::ApplicationKey, InternalIndex(0x0102));
        assert_eq!(tag.value(), 0x4d41_0102);

        assert_eq!(Tag::node_record().value(), 0x4d50_0000);
    }

    #[test]
    fn test_tag_spaces_are_disjoint() {
        for index in [0u16, 1, 7, 0xffff] {
            let net = Tag::new(RecordKind::NetworkKey, InternalIndex(index));
            let app = Tag::new(RecordKind::ApplicationKey, InternalIndex(index));
            assert_ne!(net, app, "kinds must never collide at index {index}");
            assert_ne!(net, Tag::node_record());
            assert_ne!(app, Tag::node_record());
        }
    }

    #[test]
    fn test_distinct_indices_distinct_tags() {
        let a = Tag::new(RecordKind::NetworkKey, InternalIndex(0));
        let b = Tag::new(RecordKind::NetworkKey, InternalIndex(1));
        assert_ne!(a, b);
    }

    #[test]
    fn test_tag_display() {
        let tag = Tag::new(RecordKind::NetworkKey, InternalIndex(0x12));
        assert_eq!(format!("{tag}"), "4d4e0012");
    }
}
