//! Zones: the byte ranges that hold tag data.

use crate::{Error, Result};

use super::header::{Header, HeaderKind};

/// Name of the zone registered when parsing finds nothing.
pub const DEFAULT_ZONE_NAME: &str = "default";

/// A named, contiguous byte range holding one tag's physical bytes.
///
/// A zone is never shrunk below its core signature: when it holds no tag
/// data, the signature bytes are written in its place so the container
/// stays structurally valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// Unique name within one pass.
    pub name: String,
    /// Pre-edit absolute offset of the first byte.
    pub offset: u64,
    /// Size in bytes.
    pub size: u64,
    /// Placeholder bytes written when the zone holds no tag data.
    pub core_signature: Vec<u8>,
    /// Fields elsewhere in the file that describe this zone.
    pub headers: Vec<Header>,
    /// Whether removing the tag may collapse this zone to its signature.
    ///
    /// Non-deletable zones are rewritten with an empty field set instead.
    pub deletable: bool,
}

impl Zone {
    /// Creates a deletable zone with no headers and an empty signature.
    pub fn new(name: impl Into<String>, offset: u64, size: u64) -> Self {
        Self {
            name: name.into(),
            offset,
            size,
            core_signature: Vec::new(),
            headers: Vec::new(),
            deletable: true,
        }
    }

    /// Sets the placeholder signature.
    pub fn with_core_signature(mut self, signature: impl Into<Vec<u8>>) -> Self {
        self.core_signature = signature.into();
        self
    }

    /// Marks the zone as non-deletable.
    pub fn non_deletable(mut self) -> Self {
        self.deletable = false;
        self
    }

    /// Returns the pre-edit offset one past the last byte.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptStructure`] if the end does not fit in a
    /// `u64` or the size is too large to be spliced as one signed delta.
    pub fn end(&self) -> Result<u64> {
        if i64::try_from(self.size).is_err() {
            return Err(self.corrupt("size"));
        }
        self.offset
            .checked_add(self.size)
            .ok_or_else(|| self.corrupt("end offset"))
    }

    fn corrupt(&self, what: &str) -> Error {
        Error::CorruptStructure {
            offset: self.offset,
            reason: format!("zone '{}' {} out of range ({} bytes)", self.name, what, self.size),
        }
    }

    /// Returns the placeholder size in bytes.
    pub fn core_len(&self) -> u64 {
        self.core_signature.len() as u64
    }

    /// Returns `true` if the zone holds more than its placeholder.
    pub fn has_data(&self) -> bool {
        self.size > self.core_len()
    }

    /// Returns `true` if any header of the zone is an index.
    pub fn has_index_headers(&self) -> bool {
        self.headers.iter().any(|h| h.kind.is_index())
    }

    /// Returns the headers of a given kind.
    pub fn headers_of(&self, kind: HeaderKind) -> impl Iterator<Item = &Header> {
        self.headers.iter().filter(move |h| h.kind == kind)
    }
}
