//! In-place grow, shrink and move operations on a single stream.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::config::DEFAULT_BUFFER_SIZE;
use crate::{Error, Result};

use super::{ResizableStream, stream_len};

/// Grows, shrinks and moves byte ranges inside one seekable stream.
///
/// Every operation costs time proportional to the distance between the edit
/// point and the end of the stream, and memory bounded by the block size.
/// The stream must be held exclusively for the duration of a call.
///
/// # Example
///
/// ```rust
/// use std::io::Cursor;
/// use tagsplice::stream::StreamSurgeon;
///
/// let mut stream = Cursor::new(b"headtail".to_vec());
/// let surgeon = StreamSurgeon::new(4);
///
/// // Open a 3-byte gap at offset 4
/// surgeon.lengthen(&mut stream, 4, 3, true).unwrap();
/// assert_eq!(stream.get_ref().as_slice(), b"head\0\0\0tail");
///
/// // Close it again
/// surgeon.shorten(&mut stream, 7, 3).unwrap();
/// assert_eq!(stream.get_ref().as_slice(), b"headtail");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StreamSurgeon {
    buffer_size: usize,
}

impl Default for StreamSurgeon {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

impl StreamSurgeon {
    /// Creates a surgeon that moves data in blocks of `buffer_size` bytes.
    ///
    /// A size of zero is clamped to one byte.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }

    /// Returns the block size.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Grows the stream by `delta` bytes at `insertion_offset`.
    ///
    /// The bytes originally at `[insertion_offset, old_len)` end up at
    /// `[insertion_offset + delta, old_len + delta)`. The opened gap keeps
    /// stale bytes unless `zero_fill` is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OffsetOutOfRange`] if `insertion_offset` is past
    /// the end of the stream.
    pub fn lengthen<S: ResizableStream + ?Sized>(
        &self,
        stream: &mut S,
        insertion_offset: u64,
        delta: u64,
        zero_fill: bool,
    ) -> Result<()> {
        let old_len = stream_len(stream)?;
        if insertion_offset > old_len {
            return Err(Error::OffsetOutOfRange {
                offset: insertion_offset,
                length: old_len,
            });
        }
        if delta == 0 {
            return Ok(());
        }

        log::trace!(
            "lengthen: {} bytes at {:#x} (stream {} -> {})",
            delta,
            insertion_offset,
            old_len,
            old_len + delta
        );

        stream.resize(old_len + delta)?;
        self.move_within_stream(
            stream,
            insertion_offset,
            insertion_offset + delta,
            old_len - insertion_offset,
        )?;

        if zero_fill {
            self.fill_zeros(stream, insertion_offset, delta)?;
        }
        Ok(())
    }

    /// Removes the `delta` bytes that end at `end_offset`.
    ///
    /// The bytes at `[end_offset, old_len)` are moved down to
    /// `[end_offset - delta, old_len - delta)` and the stream is truncated
    /// to `old_len - delta`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OffsetOutOfRange`] if `end_offset` is past the end
    /// of the stream or `delta` exceeds `end_offset`.
    pub fn shorten<S: ResizableStream + ?Sized>(
        &self,
        stream: &mut S,
        end_offset: u64,
        delta: u64,
    ) -> Result<()> {
        let old_len = stream_len(stream)?;
        if end_offset > old_len || delta > end_offset {
            return Err(Error::OffsetOutOfRange {
                offset: end_offset,
                length: old_len,
            });
        }
        if delta == 0 {
            return Ok(());
        }

        log::trace!(
            "shorten: {} bytes ending at {:#x} (stream {} -> {})",
            delta,
            end_offset,
            old_len,
            old_len - delta
        );

        self.move_within_stream(stream, end_offset, end_offset - delta, old_len - end_offset)?;
        stream.resize(old_len - delta)?;
        Ok(())
    }

    /// Copies `length` bytes from `from` to `to` inside the stream.
    ///
    /// Overlapping ranges are handled: blocks are traversed from the tail
    /// when moving towards higher offsets and from the head otherwise, so
    /// no source byte is overwritten before it has been read.
    pub fn move_within_stream<S: Read + Write + Seek + ?Sized>(
        &self,
        stream: &mut S,
        from: u64,
        to: u64,
        length: u64,
    ) -> Result<()> {
        if length == 0 || from == to {
            return Ok(());
        }

        let block = (self.buffer_size as u64).min(length) as usize;
        let mut buf = vec![0u8; block];

        if to < from {
            let mut done = 0u64;
            while done < length {
                let n = (length - done).min(block as u64) as usize;
                stream.seek(SeekFrom::Start(from + done))?;
                stream.read_exact(&mut buf[..n])?;
                stream.seek(SeekFrom::Start(to + done))?;
                stream.write_all(&buf[..n])?;
                done += n as u64;
            }
        } else {
            let mut remaining = length;
            while remaining > 0 {
                let n = remaining.min(block as u64) as usize;
                remaining -= n as u64;
                stream.seek(SeekFrom::Start(from + remaining))?;
                stream.read_exact(&mut buf[..n])?;
                stream.seek(SeekFrom::Start(to + remaining))?;
                stream.write_all(&buf[..n])?;
            }
        }
        Ok(())
    }

    fn fill_zeros<S: Write + Seek + ?Sized>(
        &self,
        stream: &mut S,
        offset: u64,
        length: u64,
    ) -> Result<()> {
        let zeros = vec![0u8; (self.buffer_size as u64).min(length) as usize];
        stream.seek(SeekFrom::Start(offset))?;
        let mut remaining = length;
        while remaining > 0 {
            let n = remaining.min(zeros.len() as u64) as usize;
            stream.write_all(&zeros[..n])?;
            remaining -= n as u64;
        }
        Ok(())
    }
}
