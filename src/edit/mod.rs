//! In-place tag editing.
//!
//! This module ties a [`FormatDriver`] to the stream primitives and the
//! zone registry:
//! - [`TagEditEngine`] runs read, write and remove passes
//! - [`TagFields`] holds the semantic fields and their merge rules
//! - [`Embedder`] hosts one tag format inside another container
//! - [`EditReport`] describes what a pass did
//!
//! # Example
//!
//! ```rust,ignore
//! use tagsplice::edit::{TagEditEngine, TagFields};
//! use tagsplice::EditConfig;
//!
//! let mut engine = TagEditEngine::new(MyDriver)
//!     .with_config(EditConfig::new().preserve_modified_time(true));
//!
//! // Only TIT2 changes; every other field already in the file is kept.
//! let update: TagFields = [("TIT2", "New title")].into_iter().collect();
//! let report = engine.write_path("song.bin", &update)?;
//!
//! for zone in &report.zones {
//!     println!("{}: {} -> {} bytes", zone.name, zone.old_size, zone.new_size);
//! }
//! ```
//!
//! # Implementation Notes
//!
//! A pass works by:
//! 1. Re-parsing the stream so the registry matches what is on disk
//! 2. Merging the requested fields onto the parsed ones
//! 3. Visiting zones in ascending pre-edit offset order
//! 4. Resizing the stream in place around each zone and splicing its bytes in
//! 5. Patching every counter, size and index header that depends on the zone
//!
//! There is no rollback: a failure in steps 4 or 5 leaves the stream
//! partially edited.

mod driver;
mod embed;
mod engine;
mod fields;
mod report;

pub use driver::{Anchor, FormatDriver, ParsedTag};
pub use embed::Embedder;
pub use engine::{EngineState, TagEditEngine};
pub use fields::TagFields;
pub use report::{EditReport, ZoneAction, ZoneOutcome};
