//! Hosting one tag format inside another container.
//!
//! Some containers carry a foreign tag inside one of their own structures,
//! e.g. an ID3v2 tag stored in an `id3 ` chunk of a RIFF or AIFF file. The
//! host container owns the chunk header and the sizes that enclose it; the
//! [`Embedder`] hands those to the engine so the embedded tag can be
//! rewritten without the tag's own driver knowing about the host.

use crate::Result;
use crate::structure::Zone;

/// Supplies the host container's view of an embedded tag.
pub trait Embedder {
    /// Offset of the embedded tag's own first byte, if the host already
    /// carries one.
    fn embedded_tag_offset(&self) -> Option<u64>;

    /// The zone covering the host structure (chunk header included), with
    /// the host's size and index headers registered on it.
    ///
    /// When no tag is embedded yet, the zone has size zero and its offset
    /// is where a new one is inserted.
    fn zone(&self) -> Zone;

    /// Bytes the host prepends to the serialized tag.
    fn header_overhead(&self) -> u64;

    /// Writes the host structure header for a tag of `payload_len` bytes.
    ///
    /// Must write exactly [`header_overhead`](Self::header_overhead) bytes.
    fn write_embedding_header(&self, out: &mut Vec<u8>, payload_len: u64) -> Result<()>;
}
