//! Header fields that must stay in sync with a zone.

use super::value::{Endianness, HeaderValue};

/// What a header field measures about its zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderKind {
    /// Number of items (frames, chunks, atoms) in the container.
    ///
    /// Incremented when a zone gains real data, decremented when it loses
    /// it.
    Counter,
    /// Byte size of a structure enclosing the zone.
    Size,
    /// Absolute file offset of the zone.
    AbsoluteIndex,
    /// Offset of the zone relative to the header field itself.
    RelativeIndex,
}

impl HeaderKind {
    /// Returns `true` for the two index kinds.
    pub fn is_index(self) -> bool {
        matches!(self, Self::AbsoluteIndex | Self::RelativeIndex)
    }
}

/// A counter, size or index field located elsewhere in the file.
///
/// `position` is the field's offset in the file as it was when the current
/// pass started. It is never updated during a pass; the registry's
/// correction table maps it to the field's current location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// What the field measures.
    pub kind: HeaderKind,
    /// Pre-edit byte offset of the field.
    pub position: u64,
    /// Current value, with width and signedness fixed.
    pub value: HeaderValue,
    /// Byte order of the field on disk.
    pub endianness: Endianness,
}

impl Header {
    /// Creates a header.
    pub fn new(kind: HeaderKind, position: u64, value: HeaderValue, endianness: Endianness) -> Self {
        Self {
            kind,
            position,
            value,
            endianness,
        }
    }

    /// Returns the offset one past the last byte of the field.
    ///
    /// Saturates at `u64::MAX` for a field that would wrap.
    pub fn end(&self) -> u64 {
        self.position.saturating_add(self.value.width() as u64)
    }
}
