//! Seekable stream abstractions and in-place resize primitives.
//!
//! Tag editing never rewrites a whole file. Instead, the bytes after an
//! edit point are shifted in place with [`StreamSurgeon`], which only needs
//! a stream that can read, write, seek and change its length.

mod surgeon;

pub use surgeon::StreamSurgeon;

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

/// A readable, seekable stream.
///
/// Blanket-implemented for every `Read + Seek` type so format drivers can
/// take `&mut dyn ReadSeek`.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// A stream whose length can be changed in place.
///
/// Implemented for [`File`], in-memory cursors and mutable references to
/// any implementor.
pub trait ResizableStream: Read + Write + Seek {
    /// Truncates or extends the stream to exactly `len` bytes.
    ///
    /// Extension fills with zeros. The stream position is unspecified
    /// afterwards.
    fn resize(&mut self, len: u64) -> io::Result<()>;
}

impl ResizableStream for File {
    fn resize(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }
}

impl ResizableStream for Cursor<Vec<u8>> {
    fn resize(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::OutOfMemory, "stream too large"))?;
        self.get_mut().resize(len, 0);
        Ok(())
    }
}

impl ResizableStream for Cursor<&mut Vec<u8>> {
    fn resize(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::OutOfMemory, "stream too large"))?;
        self.get_mut().resize(len, 0);
        Ok(())
    }
}

impl<T: ResizableStream + ?Sized> ResizableStream for &mut T {
    fn resize(&mut self, len: u64) -> io::Result<()> {
        (**self).resize(len)
    }
}

/// Returns the total length of a seekable stream.
///
/// The stream position is left at the end of the stream.
pub fn stream_len<S: Seek + ?Sized>(stream: &mut S) -> io::Result<u64> {
    stream.seek(SeekFrom::End(0))
}
