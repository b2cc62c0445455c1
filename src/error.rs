//! Error types for in-place tag editing.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when parsing a container's structure or splicing new tag
//! data into it, along with a convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! All fallible operations in this crate return `Result<T, Error>`. The most
//! important distinction for callers is between a broken file and a broken
//! environment:
//!
//! ```rust
//! use tagsplice::Error;
//!
//! fn describe(error: &Error) -> &'static str {
//!     if error.is_corruption() {
//!         "the file structure is damaged"
//!     } else if matches!(error, Error::Io(_)) {
//!         "the file could not be read or written"
//!     } else {
//!         "the edit was rejected"
//!     }
//! }
//! ```
//!
//! # Partial Writes
//!
//! Errors raised *before* the splice loop starts (field-code validation,
//! parsing, layout validation) leave the stream untouched. Errors raised
//! from inside the splice loop leave the stream partially edited: there is
//! no undo log.

use std::io;

/// The main error type for tag editing operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | I/O | [`Io`][Self::Io] | File system operations |
/// | Corruption | [`CorruptStructure`][Self::CorruptStructure], [`InvalidFormat`][Self::InvalidFormat] | Damaged or foreign file |
/// | Validation | [`InvalidFieldCode`][Self::InvalidFieldCode], [`UnsupportedWidth`][Self::UnsupportedWidth] | Caller or driver input |
/// | Rewrite | [`HeaderOverflow`][Self::HeaderOverflow], [`OffsetOutOfRange`][Self::OffsetOutOfRange] | Edit exceeds what the file can express |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while reading or writing the stream.
    ///
    /// A stream that cannot seek reports its seek failure through this
    /// variant.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream is not a file of the format the driver handles.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// An offset or size discovered while parsing points outside the file.
    ///
    /// The offset is the position of the field that carried the bad value
    /// (or the zone start for zone-level problems).
    #[error("Corrupt structure at offset {offset:#x}: {reason}")]
    CorruptStructure {
        /// The byte offset where corruption was detected.
        offset: u64,
        /// A description of the corruption.
        reason: String,
    },

    /// A header value was declared with a numeric width this crate cannot
    /// represent.
    ///
    /// Supported widths are 1, 2, 4 and 8 bytes, signed or unsigned.
    #[error("Unsupported numeric width: {width} bytes ({})", if *signed { "signed" } else { "unsigned" })]
    UnsupportedWidth {
        /// The width in bytes.
        width: usize,
        /// Whether the value was declared signed.
        signed: bool,
    },

    /// A field code does not have the fixed length the format requires.
    ///
    /// Raised before any byte of the stream is modified.
    #[error("Invalid field code '{code}': expected exactly {expected} characters")]
    InvalidFieldCode {
        /// The offending field code.
        code: String,
        /// The fixed code length of the format.
        expected: usize,
    },

    /// A rewritten header value does not fit the header's width.
    #[error("Header at offset {position:#x} cannot hold value {value}")]
    HeaderOverflow {
        /// Pre-edit position of the header.
        position: u64,
        /// The value that did not fit.
        value: i128,
    },

    /// A stream edit was requested outside the stream bounds.
    #[error("Offset {offset:#x} is out of range for a stream of {length} bytes")]
    OffsetOutOfRange {
        /// The requested offset.
        offset: u64,
        /// The stream length at the time of the request.
        length: u64,
    },

    /// A zone required by the operation is not registered.
    #[error("Zone not found: {name}")]
    ZoneNotFound {
        /// The zone name.
        name: String,
    },

    /// The format driver failed to serialize a zone.
    #[error("Failed to serialize zone '{zone}': {reason}")]
    Serialization {
        /// The zone being serialized.
        zone: String,
        /// The driver's description of the failure.
        reason: String,
    },
}

impl Error {
    /// Returns `true` if this error means the file itself is damaged or of
    /// the wrong format, as opposed to an environment or input problem.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tagsplice::Error;
    ///
    /// let err = Error::CorruptStructure { offset: 4, reason: "size past end".into() };
    /// assert!(err.is_corruption());
    /// ```
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::CorruptStructure { .. } | Error::InvalidFormat(_)
        )
    }

    /// Returns `true` if this error might go away on retry.
    ///
    /// Only transient I/O kinds (`WouldBlock`, `Interrupted`, `TimedOut`)
    /// are recoverable. Note that a write that failed mid-splice has
    /// already modified the stream; retrying it operates on the modified
    /// file.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

/// A specialized Result type for tag editing operations.
pub type Result<T> = std::result::Result<T, Error>;
