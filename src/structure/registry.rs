//! Zone and header catalog for one file, and the header rewrite algorithm.

use std::collections::HashMap;
use std::io::{Seek, SeekFrom, Write};

use crate::{Error, Result};

use super::header::{Header, HeaderKind};
use super::value::{Endianness, HeaderValue};
use super::zone::Zone;

/// How a zone's presence changed during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteAction {
    /// The zone went from placeholder to real data.
    Add,
    /// The zone went from real data to placeholder.
    Delete,
    /// The zone changed size but kept (or still lacks) real data.
    Edit,
}

/// A recorded resize: every byte at or after `threshold` (pre-edit
/// coordinates) has moved by `delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correction {
    /// Pre-edit end offset of the resized zone.
    pub threshold: u64,
    /// Size change of the zone in bytes.
    pub delta: i64,
}

/// Location of one header inside the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeaderRef {
    zone: usize,
    header: usize,
}

/// Catalog of the zones and headers discovered while parsing one file.
///
/// A registry is rebuilt from scratch at the start of every pass and
/// discarded at its end. All offsets it stores are pre-edit offsets; the
/// correction table translates them into current offsets as zones are
/// resized.
///
/// # Example
///
/// ```rust
/// use std::io::Cursor;
/// use tagsplice::structure::{HeaderValue, RewriteAction, Zone, ZoneRegistry};
///
/// let mut registry = ZoneRegistry::default();
/// registry.add_zone(Zone::new("tag", 8, 4));
/// registry.add_size(0, HeaderValue::U32(4), "tag");
///
/// let mut stream = Cursor::new(vec![4, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3, 4]);
/// registry.rewrite_headers(&mut stream, 6, RewriteAction::Edit, "tag").unwrap();
/// assert_eq!(&stream.get_ref()[..4], &[10, 0, 0, 0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    endianness: Endianness,
    zones: Vec<Zone>,
    names: HashMap<String, usize>,
    aliases: HashMap<u64, Vec<HeaderRef>>,
    corrections: HashMap<String, Correction>,
}

impl ZoneRegistry {
    /// Creates an empty registry whose convenience registration methods use
    /// the given byte order.
    pub fn new(endianness: Endianness) -> Self {
        Self {
            endianness,
            ..Self::default()
        }
    }

    /// Returns the default byte order of registered headers.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Registers a zone.
    ///
    /// If a zone with the same name already exists (for example a
    /// placeholder created when one of its headers was discovered first),
    /// its location, signature and deletability are replaced and its
    /// headers are kept. Headers carried by `zone` are appended.
    pub fn add_zone(&mut self, mut zone: Zone) {
        let headers = std::mem::take(&mut zone.headers);
        let name = zone.name.clone();

        match self.names.get(&name) {
            Some(&idx) => {
                let existing = &mut self.zones[idx];
                existing.offset = zone.offset;
                existing.size = zone.size;
                existing.core_signature = zone.core_signature;
                existing.deletable = zone.deletable;
            }
            None => {
                self.names.insert(name.clone(), self.zones.len());
                self.zones.push(zone);
            }
        }

        for header in headers {
            self.add_header(&name, header);
        }
    }

    /// Returns the zone with the given name.
    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.names.get(name).map(|&idx| &self.zones[idx])
    }

    /// Returns all zones in registration order.
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Returns the zone names sorted by ascending offset.
    ///
    /// The sort is stable, so zones sharing an offset keep their
    /// registration order.
    pub fn names_by_offset(&self) -> Vec<String> {
        let mut zones: Vec<&Zone> = self.zones.iter().collect();
        zones.sort_by_key(|z| z.offset);
        zones.into_iter().map(|z| z.name.clone()).collect()
    }

    /// Returns the number of zones.
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Returns `true` if no zone is registered.
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Removes a zone and its headers.
    pub fn remove_zone(&mut self, name: &str) -> Option<Zone> {
        let idx = self.names.remove(name)?;
        let zone = self.zones.remove(idx);
        for (i, z) in self.zones.iter().enumerate().skip(idx) {
            self.names.insert(z.name.clone(), i);
        }
        self.corrections.remove(name);
        self.rebuild_aliases();
        Some(zone)
    }

    /// Moves a zone to a new pre-edit offset.
    ///
    /// Used to pin a brand-new zone to the location its format places it.
    pub fn relocate_zone(&mut self, name: &str, offset: u64) -> Result<()> {
        let idx = self.index_of(name)?;
        self.zones[idx].offset = offset;
        Ok(())
    }

    /// Removes every zone, header and correction.
    pub fn clear(&mut self) {
        self.zones.clear();
        self.names.clear();
        self.aliases.clear();
        self.corrections.clear();
    }

    /// Registers a counter header for `zone`.
    pub fn add_counter(&mut self, position: u64, value: HeaderValue, zone: &str) {
        let header = Header::new(HeaderKind::Counter, position, value, self.endianness);
        self.add_header(zone, header);
    }

    /// Registers a size header for `zone`.
    pub fn add_size(&mut self, position: u64, value: HeaderValue, zone: &str) {
        let header = Header::new(HeaderKind::Size, position, value, self.endianness);
        self.add_header(zone, header);
    }

    /// Registers an index header for `zone`, absolute or relative to the
    /// header's own position.
    pub fn add_index(&mut self, position: u64, value: HeaderValue, zone: &str, relative: bool) {
        let kind = if relative {
            HeaderKind::RelativeIndex
        } else {
            HeaderKind::AbsoluteIndex
        };
        let header = Header::new(kind, position, value, self.endianness);
        self.add_header(zone, header);
    }

    /// Registers a header for `zone`.
    ///
    /// Headers may be discovered before the zone they describe; in that case
    /// a zero-size placeholder zone is created and filled in later by
    /// [`add_zone`](Self::add_zone).
    pub fn add_header(&mut self, zone: &str, header: Header) {
        let zone_idx = match self.names.get(zone) {
            Some(&idx) => idx,
            None => {
                self.names.insert(zone.to_string(), self.zones.len());
                self.zones.push(Zone::new(zone, 0, 0));
                self.zones.len() - 1
            }
        };

        let header_idx = self.zones[zone_idx].headers.len();
        self.aliases
            .entry(header.position)
            .or_default()
            .push(HeaderRef {
                zone: zone_idx,
                header: header_idx,
            });
        self.zones[zone_idx].headers.push(header);
    }

    /// Returns every header registered at `position`, across all zones.
    pub fn headers_at(&self, position: u64) -> impl Iterator<Item = &Header> {
        self.aliases
            .get(&position)
            .into_iter()
            .flatten()
            .map(|r| &self.zones[r.zone].headers[r.header])
    }

    /// Sets the value of every header registered at `position`.
    ///
    /// Each alias keeps its own numeric type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HeaderOverflow`] if the value does not fit one of
    /// the aliases. No alias is changed in that case.
    pub fn update_all_headers_at_position(
        &mut self,
        position: u64,
        value: HeaderValue,
    ) -> Result<()> {
        let Some(refs) = self.aliases.get(&position) else {
            return Ok(());
        };
        let raw = value.get();
        let mut updated = Vec::with_capacity(refs.len());
        for r in refs {
            let current = self.zones[r.zone].headers[r.header].value;
            let converted = current.with_value(raw).ok_or(Error::HeaderOverflow {
                position,
                value: raw,
            })?;
            updated.push((*r, converted));
        }
        for (r, converted) in updated {
            self.zones[r.zone].headers[r.header].value = converted;
        }
        Ok(())
    }

    /// Returns the correction table.
    pub fn corrections(&self) -> &HashMap<String, Correction> {
        &self.corrections
    }

    /// Records that `zone`, ending at pre-edit offset `threshold`, changed
    /// size by `delta`.
    ///
    /// Only the first record per zone is kept.
    pub fn record_correction(&mut self, zone: &str, threshold: u64, delta: i64) {
        if delta == 0 {
            return;
        }
        self.corrections
            .entry(zone.to_string())
            .or_insert(Correction { threshold, delta });
    }

    /// Returns how far the byte at pre-edit `position` has moved so far.
    pub fn offset_correction(&self, position: u64) -> i64 {
        self.corrections
            .values()
            .filter(|c| c.threshold <= position)
            .map(|c| c.delta)
            .sum()
    }

    /// Returns how far the start of `zone` has moved so far, ignoring the
    /// zone's own resize.
    pub fn zone_correction(&self, zone: &str) -> Result<i64> {
        let offset = self.zones[self.index_of(zone)?].offset;
        Ok(self
            .corrections
            .iter()
            .filter(|(name, c)| name.as_str() != zone && c.threshold <= offset)
            .map(|(_, c)| c.delta)
            .sum())
    }

    /// Rewrites every header of `zone` after the zone changed size by
    /// `delta_size`.
    ///
    /// - Counters move by one on [`Add`](RewriteAction::Add) and
    ///   [`Delete`](RewriteAction::Delete) and are left alone on
    ///   [`Edit`](RewriteAction::Edit).
    /// - Sizes move by `delta_size` and record a correction so that headers
    ///   located after the zone are found at their shifted position.
    /// - Indexes are recomputed from the zone's current offset (minus the
    ///   header's current position when relative), or zeroed on delete.
    ///
    /// Every header sharing the rewritten field's position is updated to
    /// the same value. Returns the number of fields written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HeaderOverflow`] when a new value does not fit its
    /// field; nothing is written for that header, and headers already
    /// written are kept.
    pub fn rewrite_headers<W: Write + Seek + ?Sized>(
        &mut self,
        stream: &mut W,
        delta_size: i64,
        action: RewriteAction,
        zone: &str,
    ) -> Result<usize> {
        let zone_idx = self.index_of(zone)?;
        let zone_end = self.zones[zone_idx].end()?;
        let zone_start =
            self.zones[zone_idx].offset as i128 + self.zone_correction(zone)? as i128;
        let mut written = 0;

        for i in 0..self.zones[zone_idx].headers.len() {
            let header = self.zones[zone_idx].headers[i].clone();
            let current_position = header.position as i128
                + self.offset_correction(header.position) as i128;
            let old = header.value.get();

            let new_value = match header.kind {
                HeaderKind::Counter => match action {
                    RewriteAction::Add => old + 1,
                    RewriteAction::Delete => old - 1,
                    RewriteAction::Edit => continue,
                },
                HeaderKind::Size => {
                    self.record_correction(zone, zone_end, delta_size);
                    if delta_size == 0 {
                        continue;
                    }
                    old + delta_size as i128
                }
                HeaderKind::AbsoluteIndex if action == RewriteAction::Delete => 0,
                HeaderKind::AbsoluteIndex => zone_start,
                HeaderKind::RelativeIndex if action == RewriteAction::Delete => 0,
                HeaderKind::RelativeIndex => zone_start - current_position,
            };

            let value = header
                .value
                .with_value(new_value)
                .ok_or(Error::HeaderOverflow {
                    position: header.position,
                    value: new_value,
                })?;
            let target = u64::try_from(current_position).map_err(|_| Error::CorruptStructure {
                offset: header.position,
                reason: "header moved before start of stream".into(),
            })?;

            log::trace!(
                "rewrite {:?} header of '{}' at {:#x}: {} -> {}",
                header.kind,
                zone,
                target,
                header.value,
                value
            );

            self.update_all_headers_at_position(header.position, value)?;
            stream.seek(SeekFrom::Start(target))?;
            stream.write_all(&value.encode(header.endianness))?;
            written += 1;
        }

        Ok(written)
    }

    /// Checks every zone and header against the stream length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptStructure`] for the first zone or header that
    /// extends past `stream_len`.
    pub fn check_layout(&self, stream_len: u64) -> Result<()> {
        for zone in &self.zones {
            if zone.end()? > stream_len {
                return Err(Error::CorruptStructure {
                    offset: zone.offset,
                    reason: format!(
                        "zone '{}' ({} bytes) ends past end of stream ({} bytes)",
                        zone.name, zone.size, stream_len
                    ),
                });
            }
            for header in &zone.headers {
                if header.end() > stream_len {
                    return Err(Error::CorruptStructure {
                        offset: header.position,
                        reason: format!(
                            "{:?} header of zone '{}' lies past end of stream",
                            header.kind, zone.name
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| Error::ZoneNotFound {
                name: name.to_string(),
            })
    }

    fn rebuild_aliases(&mut self) {
        self.aliases.clear();
        for (zone, z) in self.zones.iter().enumerate() {
            for (header, h) in z.headers.iter().enumerate() {
                self.aliases
                    .entry(h.position)
                    .or_default()
                    .push(HeaderRef { zone, header });
            }
        }
    }
}
