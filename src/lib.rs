//! # tagsplice
//!
//! In-place editing of metadata tags inside media container files.
//!
//! Rewriting a tag usually changes its size. Rather than writing a fresh
//! copy of a multi-gigabyte file, this crate shifts the bytes after the tag
//! in place and then patches every field elsewhere in the file that counts,
//! sizes or points at the data that moved: chunk sizes, atom counts, offset
//! tables.
//!
//! The crate knows nothing about any concrete format. Each format is a
//! [`FormatDriver`] that registers its zones and headers while parsing and
//! serializes fields back into bytes; the engine does the rest.
//!
//! ## Quick Start
//!
//! ### Shifting Bytes In Place
//!
//! ```rust
//! use std::io::Cursor;
//! use tagsplice::stream::StreamSurgeon;
//!
//! fn main() -> tagsplice::Result<()> {
//!     let mut stream = Cursor::new(b"HEADTAIL".to_vec());
//!     let surgeon = StreamSurgeon::default();
//!
//!     // Open a 3-byte gap before "TAIL".
//!     surgeon.lengthen(&mut stream, 4, 3, true)?;
//!     assert_eq!(stream.get_ref().as_slice(), b"HEAD\0\0\0TAIL");
//!
//!     // And close it again.
//!     surgeon.shorten(&mut stream, 7, 3)?;
//!     assert_eq!(stream.get_ref().as_slice(), b"HEADTAIL");
//!     Ok(())
//! }
//! ```
//!
//! ### Editing a Tag
//!
//! ```rust,ignore
//! use tagsplice::{EditConfig, TagEditEngine, TagFields, Result};
//!
//! fn main() -> Result<()> {
//!     let mut engine = TagEditEngine::new(MyDriver)
//!         .with_config(EditConfig::low_memory());
//!
//!     let update: TagFields = [("TIT2", "Title"), ("TALB", "")].into_iter().collect();
//!     let report = engine.write_path("song.bin", &update)?;
//!     println!("{} zones resized, {} headers patched",
//!         report.zones_resized(),
//!         report.headers_rewritten);
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade: one
//! `debug` line per zone and per pass, `trace` lines for every byte move and
//! header write, and `warn` for recoverable problems such as a failed
//! best-effort read.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod edit;
pub mod error;
pub mod stream;
pub mod structure;

pub use config::EditConfig;
pub use error::{Error, Result};

// Re-export edit API at crate root for convenience
pub use edit::{
    Anchor, EditReport, Embedder, EngineState, FormatDriver, ParsedTag, TagEditEngine, TagFields,
    ZoneAction, ZoneOutcome,
};

// Re-export structure API
pub use stream::{ReadSeek, ResizableStream, StreamSurgeon};
pub use structure::{
    Endianness, Header, HeaderKind, HeaderValue, NumericType, RewriteAction, Zone, ZoneRegistry,
};
