//! The format driver seam.
//!
//! A [`FormatDriver`] knows one container format: where its tag zones are,
//! which fields elsewhere in the file describe them, and how to turn a set
//! of [`TagFields`] into zone bytes. The engine knows none of this; it only
//! moves bytes and patches headers.

use crate::Result;
use crate::stream::ReadSeek;
use crate::structure::{Endianness, Zone, ZoneRegistry};

use super::fields::TagFields;

/// Where a format places a tag that does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    /// Appended after the last byte of the file.
    #[default]
    EndOfFile,
    /// Inserted before the first byte of the file.
    BeginningOfFile,
    /// At the offset the driver registered for the zone.
    BuiltinOffset,
}

/// What a driver found while parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTag {
    /// Whether the file currently carries a tag of this format.
    pub exists: bool,
    /// Every field the tag holds, including ones the caller never asked
    /// about.
    pub fields: TagFields,
}

impl ParsedTag {
    /// A parse result for a file without a tag.
    pub fn absent() -> Self {
        Self::default()
    }

    /// A parse result for a file with a tag.
    pub fn present(fields: TagFields) -> Self {
        Self {
            exists: true,
            fields,
        }
    }
}

/// Parses and serializes one tag format.
pub trait FormatDriver {
    /// Parses the tag starting at `base_offset`, registering every zone and
    /// header it finds.
    ///
    /// `base_offset` is non-zero only when the tag is embedded inside
    /// another container.
    ///
    /// # Errors
    ///
    /// Drivers report out-of-range offsets and sizes as
    /// [`Error::CorruptStructure`](crate::Error::CorruptStructure) and
    /// foreign files as [`Error::InvalidFormat`](crate::Error::InvalidFormat).
    fn parse(
        &self,
        stream: &mut dyn ReadSeek,
        base_offset: u64,
        registry: &mut ZoneRegistry,
    ) -> Result<ParsedTag>;

    /// Serializes the fields that belong to `zone` into `out`.
    ///
    /// Returns `Ok(false)` when there is nothing to write, in which case the
    /// zone is reduced to its core signature.
    fn serialize(&self, zone: &Zone, fields: &TagFields, out: &mut Vec<u8>) -> Result<bool>;

    /// Where a brand-new tag goes.
    fn default_anchor(&self) -> Anchor {
        Anchor::EndOfFile
    }

    /// Default byte order of the format's structure headers.
    fn endianness(&self) -> Endianness {
        Endianness::Little
    }

    /// Whether the format keeps its own counters, sizes or indexes that
    /// must be patched after a zone is resized.
    fn has_structure_headers(&self) -> bool {
        false
    }

    /// The fixed length of every field code, if the format has one.
    fn field_code_width(&self) -> Option<usize> {
        None
    }

    /// Whether this tag format can be hosted inside another container.
    fn supports_embedding(&self) -> bool {
        false
    }
}

impl<D: FormatDriver + ?Sized> FormatDriver for Box<D> {
    fn parse(
        &self,
        stream: &mut dyn ReadSeek,
        base_offset: u64,
        registry: &mut ZoneRegistry,
    ) -> Result<ParsedTag> {
        (**self).parse(stream, base_offset, registry)
    }

    fn serialize(&self, zone: &Zone, fields: &TagFields, out: &mut Vec<u8>) -> Result<bool> {
        (**self).serialize(zone, fields, out)
    }

    fn default_anchor(&self) -> Anchor {
        (**self).default_anchor()
    }

    fn endianness(&self) -> Endianness {
        (**self).endianness()
    }

    fn has_structure_headers(&self) -> bool {
        (**self).has_structure_headers()
    }

    fn field_code_width(&self) -> Option<usize> {
        (**self).field_code_width()
    }

    fn supports_embedding(&self) -> bool {
        (**self).supports_embedding()
    }
}
