//! The write/remove pass that splices new tag data into a stream.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::config::EditConfig;
use crate::stream::{ResizableStream, StreamSurgeon, stream_len};
use crate::structure::{DEFAULT_ZONE_NAME, RewriteAction, Zone, ZoneRegistry};
use crate::{Error, Result};

use super::driver::{Anchor, FormatDriver, ParsedTag};
use super::embed::Embedder;
use super::fields::TagFields;
use super::report::{EditReport, ZoneAction, ZoneOutcome};

/// Lifecycle of a [`TagEditEngine`].
///
/// ```text
/// Unparsed --read/write/remove--> Parsed --splice--> Writing { zone } --+--> Committed
///                                                                      +--> Failed
/// ```
///
/// `Failed` after `Writing` means the stream may already be partially
/// edited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EngineState {
    /// No parse has succeeded yet.
    #[default]
    Unparsed,
    /// The stream was parsed and the registry reflects it.
    Parsed,
    /// The splice loop is processing the named zone.
    Writing {
        /// Zone being processed.
        zone: String,
    },
    /// The last pass completed and its fields were committed.
    Committed,
    /// The last pass failed.
    Failed,
}

/// What a pass does with the zones it visits.
#[derive(Clone, Copy)]
enum Pass<'a> {
    Write(&'a TagFields),
    Remove,
}

/// New content decided for one zone.
enum ZoneContent {
    /// Leave the zone's bytes alone.
    Keep,
    /// Replace the zone with its core signature.
    Placeholder,
    /// Replace the zone with serialized tag bytes.
    Bytes(Vec<u8>),
}

/// A zone scheduled for the splice loop, in pre-edit coordinates.
#[derive(Debug, Clone)]
struct PlannedZone {
    name: String,
    begin: u64,
    old_size: u64,
    core_signature: Vec<u8>,
    deletable: bool,
    has_data: bool,
    has_index_headers: bool,
}

/// Edits one tag format inside a stream without rewriting the whole
/// stream.
///
/// Each [`write`](Self::write) or [`remove`](Self::remove) call:
///
/// 1. re-parses the stream through the driver, rebuilding the zone
///    registry from what is on disk;
/// 2. substitutes the embedder's zone when the tag is hosted inside
///    another container;
/// 3. merges the new fields onto the parsed ones;
/// 4. visits every zone in ascending offset order, resizing the stream in
///    place, splicing the new bytes in, and patching the headers that
///    count, size or index the zone.
///
/// A failure during step 4 leaves the stream partially edited.
///
/// # Example
///
/// ```rust,ignore
/// use std::io::Cursor;
/// use tagsplice::edit::{TagEditEngine, TagFields};
///
/// let mut engine = TagEditEngine::new(MyDriver);
/// let mut stream = Cursor::new(std::fs::read("song.bin")?);
///
/// let fields: TagFields = [("TIT2", "New title")].into_iter().collect();
/// let report = engine.write(&mut stream, &fields)?;
/// println!("stream grew by {} bytes", report.total_delta);
/// ```
pub struct TagEditEngine<D: FormatDriver> {
    driver: D,
    embedder: Option<Box<dyn Embedder>>,
    config: EditConfig,
    registry: ZoneRegistry,
    fields: TagFields,
    tag_exists: bool,
    state: EngineState,
}

impl<D: FormatDriver> TagEditEngine<D> {
    /// Creates an engine for the given driver with default configuration.
    pub fn new(driver: D) -> Self {
        let registry = ZoneRegistry::new(driver.endianness());
        Self {
            driver,
            embedder: None,
            config: EditConfig::default(),
            registry,
            fields: TagFields::new(),
            tag_exists: false,
            state: EngineState::Unparsed,
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: EditConfig) -> Self {
        self.config = config;
        self
    }

    /// Hosts the tag inside another container through `embedder`.
    ///
    /// Only takes effect for drivers that
    /// [support embedding](FormatDriver::supports_embedding).
    pub fn with_embedder(mut self, embedder: impl Embedder + 'static) -> Self {
        self.embedder = Some(Box::new(embedder));
        self
    }

    /// Returns the driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EditConfig {
        &self.config
    }

    /// Returns the registry built by the last parse.
    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    /// Returns the fields of the last successful read or committed write.
    pub fn fields(&self) -> &TagFields {
        &self.fields
    }

    /// Returns `true` if the stream carried a tag after the last pass.
    pub fn tag_exists(&self) -> bool {
        self.tag_exists
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Parses the stream and returns its fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptStructure`] when a zone or header lies
    /// outside the stream (if layout validation is enabled), and whatever
    /// the driver reports.
    pub fn read<S: Read + Seek>(&mut self, stream: &mut S) -> Result<&TagFields> {
        let embedded = self.is_embedded();
        self.parse(stream)?;
        if embedded {
            self.substitute_embedded_zone();
        }
        self.validate_layout(stream)?;
        Ok(&self.fields)
    }

    /// Parses the stream, logging any failure instead of returning it.
    ///
    /// Returns `true` on success.
    pub fn try_read<S: Read + Seek>(&mut self, stream: &mut S) -> bool {
        match self.read(stream) {
            Ok(_) => true,
            Err(e) if e.is_corruption() => {
                log::warn!("Tag structure is corrupt, skipping: {}", e);
                false
            }
            Err(e) => {
                log::warn!("Failed to read tag: {}", e);
                false
            }
        }
    }

    /// Writes `new_fields` into the stream, keeping every parsed field that
    /// `new_fields` does not mention. An empty value deletes a field.
    ///
    /// # Errors
    ///
    /// Field-code, parse and layout errors are returned before the stream
    /// is modified. Errors raised while splicing leave the stream partially
    /// edited and the engine in [`EngineState::Failed`].
    pub fn write<S: ResizableStream>(
        &mut self,
        stream: &mut S,
        new_fields: &TagFields,
    ) -> Result<EditReport> {
        if let Some(width) = self.driver.field_code_width() {
            new_fields.validate_codes(width)?;
        }

        let parsed = self.prepare(stream)?;

        let mut merged = parsed.fields;
        merged.integrate(new_fields);
        merged.cleanup();

        let report = self.run(stream, Pass::Write(&merged))?;

        self.tag_exists = report
            .zones
            .iter()
            .any(|z| z.new_size > self.zone_core_len(&z.name));
        self.fields = merged;
        self.state = EngineState::Committed;
        Ok(report)
    }

    /// Removes the tag, reducing every zone that holds data to its core
    /// signature.
    ///
    /// Non-deletable zones are rewritten with an empty field set instead.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn remove<S: ResizableStream>(&mut self, stream: &mut S) -> Result<EditReport> {
        self.prepare(stream)?;

        let report = self.run(stream, Pass::Remove)?;

        self.tag_exists = false;
        self.fields = TagFields::new();
        self.state = EngineState::Committed;
        Ok(report)
    }

    /// Opens `path` for reading and writing and runs [`write`](Self::write)
    /// on it.
    pub fn write_path(
        &mut self,
        path: impl AsRef<Path>,
        new_fields: &TagFields,
    ) -> Result<EditReport> {
        self.with_file(path.as_ref(), |engine, file| engine.write(file, new_fields))
    }

    /// Opens `path` for reading and writing and runs
    /// [`remove`](Self::remove) on it.
    pub fn remove_path(&mut self, path: impl AsRef<Path>) -> Result<EditReport> {
        self.with_file(path.as_ref(), |engine, file| engine.remove(file))
    }

    fn with_file<T>(
        &mut self,
        path: &Path,
        op: impl FnOnce(&mut Self, &mut File) -> Result<T>,
    ) -> Result<T> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let mtime = if self.config.preserve_modified_time {
            Some(filetime::FileTime::from_last_modification_time(
                &file.metadata()?,
            ))
        } else {
            None
        };

        let result = op(self, &mut file);
        drop(file);

        if let Some(mtime) = mtime {
            if let Err(e) = filetime::set_file_mtime(path, mtime) {
                log::warn!(
                    "Failed to restore modification time on '{}': {}",
                    path.display(),
                    e
                );
            }
        }
        result
    }

    /// Re-parses the stream and readies the registry for a pass.
    fn prepare<S: Read + Seek>(&mut self, stream: &mut S) -> Result<ParsedTag> {
        let embedded = self.is_embedded();
        let parsed = self.parse(stream)?;

        if embedded {
            self.substitute_embedded_zone();
        }
        if !parsed.exists && self.registry.is_empty() {
            self.registry.add_zone(Zone::new(DEFAULT_ZONE_NAME, 0, 0));
        }

        self.validate_layout(stream)?;
        Ok(parsed)
    }

    fn parse<S: Read + Seek>(&mut self, stream: &mut S) -> Result<ParsedTag> {
        self.registry = ZoneRegistry::new(self.driver.endianness());
        let base_offset = if self.is_embedded() {
            self.embedder
                .as_ref()
                .and_then(|e| e.embedded_tag_offset())
                .unwrap_or(0)
        } else {
            0
        };

        match self.driver.parse(stream, base_offset, &mut self.registry) {
            Ok(parsed) => {
                self.fields = parsed.fields.clone();
                self.tag_exists = parsed.exists;
                self.state = EngineState::Parsed;
                Ok(parsed)
            }
            Err(e) => {
                self.registry.clear();
                self.state = EngineState::Unparsed;
                Err(e)
            }
        }
    }

    fn is_embedded(&self) -> bool {
        self.embedder.is_some() && self.driver.supports_embedding()
    }

    /// Replaces the driver-discovered zones with the host container's view
    /// of the embedded tag.
    fn substitute_embedded_zone(&mut self) {
        if let Some(embedder) = &self.embedder {
            self.registry.clear();
            self.registry.add_zone(embedder.zone());
        }
    }

    fn validate_layout<S: Seek>(&mut self, stream: &mut S) -> Result<()> {
        if !self.config.validate_layout {
            return Ok(());
        }
        let len = stream_len(stream)?;
        if let Err(e) = self.registry.check_layout(len) {
            self.state = EngineState::Unparsed;
            return Err(e);
        }
        Ok(())
    }

    fn zone_core_len(&self, name: &str) -> u64 {
        self.registry.zone(name).map(Zone::core_len).unwrap_or(0)
    }

    /// Schedules every registered zone, resolving brand-new zones to their
    /// anchor.
    ///
    /// A zone with bytes on disk (tag data or placeholder) stays where it
    /// is. A zero-size zone goes where the format's anchor puts it; an
    /// embedded zone always uses the host's insertion point.
    fn plan(&mut self, original_len: u64) -> Result<Vec<PlannedZone>> {
        let anchor = self.driver.default_anchor();
        let embedded = self.is_embedded();

        let mut planned = Vec::with_capacity(self.registry.len());
        for zone in self.registry.zones() {
            // Rejects sizes no splice could express before anything moves.
            zone.end()?;
            let begin = if zone.size > 0 || embedded {
                zone.offset
            } else {
                match anchor {
                    Anchor::EndOfFile => original_len,
                    Anchor::BeginningOfFile => 0,
                    Anchor::BuiltinOffset => zone.offset,
                }
            };
            planned.push(PlannedZone {
                name: zone.name.clone(),
                begin,
                old_size: zone.size,
                core_signature: zone.core_signature.clone(),
                deletable: zone.deletable,
                has_data: self.tag_exists && zone.has_data(),
                has_index_headers: zone.has_index_headers(),
            });
        }

        for p in &planned {
            self.registry.relocate_zone(&p.name, p.begin)?;
        }

        // Anchors are resolved first so that new zones sort by where they
        // will actually be inserted.
        if self.config.sort_zones {
            planned.sort_by_key(|p| p.begin);
        }
        Ok(planned)
    }

    fn run<S: ResizableStream>(&mut self, stream: &mut S, pass: Pass<'_>) -> Result<EditReport> {
        let original_len = stream_len(stream)?;
        let plan = self.plan(original_len)?;

        match self.splice(stream, &plan, pass) {
            Ok(report) => {
                stream.flush()?;
                log::debug!(
                    "{} pass complete: {} zones, {} resized, stream {} -> {} bytes",
                    match pass {
                        Pass::Write(_) => "write",
                        Pass::Remove => "remove",
                    },
                    report.zones.len(),
                    report.zones_resized(),
                    original_len,
                    original_len as i64 + report.total_delta
                );
                Ok(report)
            }
            Err(e) => {
                log::debug!("splice failed in state {:?}: {}", self.state, e);
                self.state = EngineState::Failed;
                Err(e)
            }
        }
    }

    fn content_for(&self, planned: &PlannedZone, pass: Pass<'_>) -> Result<ZoneContent> {
        let empty = TagFields::new();
        let fields = match pass {
            Pass::Write(fields) => fields,
            Pass::Remove if !planned.has_data => return Ok(ZoneContent::Keep),
            Pass::Remove if planned.deletable => return Ok(ZoneContent::Placeholder),
            Pass::Remove => &empty,
        };

        let zone = self
            .registry
            .zone(&planned.name)
            .ok_or_else(|| Error::ZoneNotFound {
                name: planned.name.clone(),
            })?;

        let mut scratch = Vec::new();
        if !self.driver.serialize(zone, fields, &mut scratch)? {
            return Ok(ZoneContent::Placeholder);
        }

        match (&self.embedder, self.is_embedded()) {
            (Some(embedder), true) => {
                let mut framed =
                    Vec::with_capacity(embedder.header_overhead() as usize + scratch.len());
                embedder.write_embedding_header(&mut framed, scratch.len() as u64)?;
                if framed.len() as u64 != embedder.header_overhead() {
                    return Err(Error::Serialization {
                        zone: planned.name.clone(),
                        reason: format!(
                            "embedding header is {} bytes, expected {}",
                            framed.len(),
                            embedder.header_overhead()
                        ),
                    });
                }
                framed.extend_from_slice(&scratch);
                Ok(ZoneContent::Bytes(framed))
            }
            _ => Ok(ZoneContent::Bytes(scratch)),
        }
    }

    fn splice<S: ResizableStream>(
        &mut self,
        stream: &mut S,
        plan: &[PlannedZone],
        pass: Pass<'_>,
    ) -> Result<EditReport> {
        let surgeon = StreamSurgeon::new(self.config.buffer_size);
        let patch_headers = self.is_embedded() || self.driver.has_structure_headers();
        let mut report = EditReport::default();
        let mut cumulative_delta: i64 = 0;

        for planned in plan {
            self.state = EngineState::Writing {
                zone: planned.name.clone(),
            };

            let content = self.content_for(planned, pass)?;
            let core_len = planned.core_signature.len() as u64;
            let old_size = planned.old_size;
            let Some(begin) = planned.begin.checked_add_signed(cumulative_delta) else {
                return Err(Error::OffsetOutOfRange {
                    offset: planned.begin,
                    length: stream_len(stream)?,
                });
            };

            let (new_size, written) = match &content {
                ZoneContent::Keep => (old_size, planned.has_data),
                ZoneContent::Placeholder => (core_len, false),
                ZoneContent::Bytes(bytes) => (bytes.len() as u64, true),
            };
            let (Ok(new_signed), Ok(old_signed)) =
                (i64::try_from(new_size), i64::try_from(old_size))
            else {
                return Err(Error::OffsetOutOfRange {
                    offset: begin,
                    length: stream_len(stream)?,
                });
            };
            let delta = new_signed - old_signed;

            if !matches!(content, ZoneContent::Keep) {
                let Some(end) = begin.checked_add(old_size) else {
                    return Err(Error::OffsetOutOfRange {
                        offset: begin,
                        length: stream_len(stream)?,
                    });
                };
                if delta > 0 {
                    surgeon.lengthen(stream, end, delta as u64, self.config.zero_fill)?;
                } else if delta < 0 {
                    surgeon.shorten(stream, end, delta.unsigned_abs())?;
                }

                stream.seek(SeekFrom::Start(begin))?;
                match &content {
                    ZoneContent::Bytes(bytes) => stream.write_all(bytes)?,
                    _ => stream.write_all(&planned.core_signature)?,
                }
            }

            let cumulative_before = cumulative_delta;
            cumulative_delta += delta;

            // Counters follow tag presence, not byte counts.
            let had_data = old_size > core_len;
            let action = if !had_data && written {
                RewriteAction::Add
            } else if had_data && !written {
                RewriteAction::Delete
            } else {
                RewriteAction::Edit
            };

            if delta != 0 {
                let Some(old_end) = planned.begin.checked_add(old_size) else {
                    return Err(Error::OffsetOutOfRange {
                        offset: planned.begin,
                        length: stream_len(stream)?,
                    });
                };
                self.registry.record_correction(&planned.name, old_end, delta);
            }

            if patch_headers {
                if delta != 0 {
                    report.headers_rewritten +=
                        self.registry
                            .rewrite_headers(stream, delta, action, &planned.name)?;
                } else if cumulative_before != 0 && planned.has_index_headers && new_size > 0 {
                    // The zone kept its size but moved; its indexes must follow.
                    report.headers_rewritten += self.registry.rewrite_headers(
                        stream,
                        0,
                        RewriteAction::Edit,
                        &planned.name,
                    )?;
                }
            }

            let zone_action = match content {
                ZoneContent::Keep => ZoneAction::Untouched,
                _ => ZoneAction::from_rewrite(action),
            };
            log::debug!(
                "zone '{}' at {:#x}: {} -> {} bytes ({:?})",
                planned.name,
                begin,
                old_size,
                new_size,
                zone_action
            );

            report.zones.push(ZoneOutcome {
                name: planned.name.clone(),
                offset: begin,
                old_size,
                new_size,
                action: zone_action,
            });
        }

        report.total_delta = cumulative_delta;
        Ok(report)
    }
}

impl<D: FormatDriver + std::fmt::Debug> std::fmt::Debug for TagEditEngine<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagEditEngine")
            .field("driver", &self.driver)
            .field("embedded", &self.embedder.is_some())
            .field("config", &self.config)
            .field("zones", &self.registry.len())
            .field("state", &self.state)
            .finish()
    }
}
