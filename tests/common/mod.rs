//! Shared test utilities for integration tests.
//!
//! This module provides toy format drivers used across multiple test files:
//! - [`MiniDriver`]: a small chunked container with a body size, a chunk
//!   counter, and absolute and relative chunk pointers
//! - [`ScriptedDriver`]: registers exactly the zones and headers it is given
//! - [`HostEmbedder`] / [`KvDriver`]: a tag hosted inside a chunk of another
//!   container
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, SeekFrom};

use tagsplice::structure::{HeaderKind, HeaderValue, Zone, ZoneRegistry};
use tagsplice::{
    Anchor, Embedder, Error, FormatDriver, ParsedTag, ReadSeek, Result, TagFields,
};

// ============================================================================
// MINI container
// ============================================================================
//
// offset  size  field
// 0       4     "MINI"
// 4       4     body size (u32 LE) = file length - 8
// 8       2     chunk count (u16 LE)
// 10      4     absolute offset of the META chunk, 0 if absent (u32 LE)
// 14      4     offset of the INFO chunk relative to byte 14, 0 if absent
// 18      ...   chunks: id(4) size(u32 LE) payload
//
// Tag payloads are a run of entries: code(4) len(u8) value.

/// Size of the fixed MINI header.
pub const MINI_HEADER_LEN: usize = 18;

/// Position of the body size field.
pub const BODY_SIZE_POS: u64 = 4;
/// Position of the chunk counter.
pub const COUNT_POS: u64 = 8;
/// Position of the absolute META pointer.
pub const META_PTR_POS: u64 = 10;
/// Position of the relative INFO pointer.
pub const INFO_PTR_POS: u64 = 14;

/// Encodes tag entries as a MINI tag payload.
pub fn tag_payload(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (code, value) in entries {
        out.extend_from_slice(code.as_bytes());
        out.push(value.len() as u8);
        out.extend_from_slice(value.as_bytes());
    }
    out
}

/// Builds a consistent MINI file from `(id, payload)` chunks.
pub fn mini_file(chunks: &[(&[u8; 4], Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    let mut meta_ptr = 0u32;
    let mut info_ptr = 0u32;
    for (id, payload) in chunks {
        let offset = (MINI_HEADER_LEN + body.len()) as u32;
        match *id {
            b"META" => meta_ptr = offset,
            b"INFO" => info_ptr = offset - INFO_PTR_POS as u32,
            _ => {}
        }
        body.extend_from_slice(*id);
        body.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        body.extend_from_slice(payload);
    }

    let mut file = Vec::with_capacity(MINI_HEADER_LEN + body.len());
    file.extend_from_slice(b"MINI");
    file.extend_from_slice(&((MINI_HEADER_LEN - 8 + body.len()) as u32).to_le_bytes());
    file.extend_from_slice(&(chunks.len() as u16).to_le_bytes());
    file.extend_from_slice(&meta_ptr.to_le_bytes());
    file.extend_from_slice(&info_ptr.to_le_bytes());
    file.extend_from_slice(&body);
    file
}

/// A decoded MINI file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiniLayout {
    pub body_size: u32,
    pub count: u16,
    pub meta_ptr: u32,
    pub info_ptr: u32,
    /// `(offset, id, payload)` for every chunk.
    pub chunks: Vec<(usize, [u8; 4], Vec<u8>)>,
}

impl MiniLayout {
    pub fn chunk(&self, id: &[u8; 4]) -> Option<&(usize, [u8; 4], Vec<u8>)> {
        self.chunks.iter().find(|(_, cid, _)| cid == id)
    }
}

fn u32_at(bytes: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap())
}

/// Decodes a MINI file, panicking on malformed input.
pub fn decode_mini(bytes: &[u8]) -> MiniLayout {
    assert_eq!(&bytes[..4], b"MINI");
    let mut chunks = Vec::new();
    let mut pos = MINI_HEADER_LEN;
    while pos < bytes.len() {
        let id: [u8; 4] = bytes[pos..pos + 4].try_into().unwrap();
        let len = u32_at(bytes, pos + 4) as usize;
        chunks.push((pos, id, bytes[pos + 8..pos + 8 + len].to_vec()));
        pos += 8 + len;
    }
    assert_eq!(pos, bytes.len(), "trailing bytes after last chunk");

    MiniLayout {
        body_size: u32_at(bytes, 4),
        count: u16::from_le_bytes([bytes[8], bytes[9]]),
        meta_ptr: u32_at(bytes, 10),
        info_ptr: u32_at(bytes, 14),
        chunks,
    }
}

/// Asserts that every structure field of a MINI file agrees with its
/// chunks.
pub fn assert_mini_consistent(bytes: &[u8]) -> MiniLayout {
    let layout = decode_mini(bytes);
    assert_eq!(layout.body_size as usize, bytes.len() - 8, "body size");
    assert_eq!(layout.count as usize, layout.chunks.len(), "chunk count");
    match layout.chunk(b"META") {
        Some((offset, _, _)) => assert_eq!(layout.meta_ptr as usize, *offset, "META pointer"),
        None => assert_eq!(layout.meta_ptr, 0, "META pointer"),
    }
    match layout.chunk(b"INFO") {
        Some((offset, _, _)) => assert_eq!(
            layout.info_ptr as usize,
            offset - INFO_PTR_POS as usize,
            "INFO pointer"
        ),
        None => assert_eq!(layout.info_ptr, 0, "INFO pointer"),
    }
    layout
}

/// Driver for the MINI container.
///
/// Field codes are 4 characters; codes starting with `I` live in the INFO
/// chunk, every other code in META.
#[derive(Debug, Default)]
pub struct MiniDriver;

impl MiniDriver {
    fn zone_for(code: &str) -> &'static str {
        if code.starts_with('I') { "INFO" } else { "META" }
    }

    fn read_entries(payload: &[u8], offset: u64, fields: &mut TagFields) -> Result<()> {
        let mut pos = 0;
        while pos < payload.len() {
            if pos + 5 > payload.len() {
                return Err(Error::CorruptStructure {
                    offset: offset + pos as u64,
                    reason: "truncated tag entry".into(),
                });
            }
            let code = String::from_utf8_lossy(&payload[pos..pos + 4]).into_owned();
            let len = payload[pos + 4] as usize;
            let start = pos + 5;
            if start + len > payload.len() {
                return Err(Error::CorruptStructure {
                    offset: offset + pos as u64,
                    reason: "tag value runs past chunk".into(),
                });
            }
            let value = String::from_utf8_lossy(&payload[start..start + len]).into_owned();
            fields.insert(code, value);
            pos = start + len;
        }
        Ok(())
    }
}

impl FormatDriver for MiniDriver {
    fn parse(
        &self,
        stream: &mut dyn ReadSeek,
        _base_offset: u64,
        registry: &mut ZoneRegistry,
    ) -> Result<ParsedTag> {
        stream.seek(SeekFrom::Start(0))?;
        let mut header = [0u8; MINI_HEADER_LEN];
        stream
            .read_exact(&mut header)
            .map_err(|_| Error::InvalidFormat("file too short for MINI header".into()))?;
        if &header[..4] != b"MINI" {
            return Err(Error::InvalidFormat("missing MINI signature".into()));
        }

        let body_size = u32_at(&header, 4);
        let count = u16::from_le_bytes([header[8], header[9]]);
        let meta_ptr = u32_at(&header, 10);
        let info_ptr = u32_at(&header, 14);
        let file_end = 8 + body_size as u64;

        let mut fields = TagFields::new();
        let mut found = false;
        let mut pos = MINI_HEADER_LEN as u64;
        while pos < file_end {
            let mut chunk_header = [0u8; 8];
            stream.seek(SeekFrom::Start(pos))?;
            stream.read_exact(&mut chunk_header)?;
            let len = u32_at(&chunk_header, 4) as u64;
            let chunk_end = pos + 8 + len;
            if chunk_end > file_end {
                return Err(Error::CorruptStructure {
                    offset: pos + 4,
                    reason: format!("chunk of {} bytes runs past end of body", len),
                });
            }

            let name = match &chunk_header[..4] {
                b"META" => Some("META"),
                b"INFO" => Some("INFO"),
                _ => None,
            };
            if let Some(name) = name {
                let mut payload = vec![0u8; len as usize];
                stream.read_exact(&mut payload)?;
                Self::read_entries(&payload, pos + 8, &mut fields)?;
                registry.add_zone(Zone::new(name, pos, 8 + len));
                found = true;
            }
            pos = chunk_end;
        }

        for name in ["META", "INFO"] {
            if registry.zone(name).is_none() {
                registry.add_zone(Zone::new(name, 0, 0));
            }
            registry.add_size(BODY_SIZE_POS, HeaderValue::U32(body_size), name);
            registry.add_counter(COUNT_POS, HeaderValue::U16(count), name);
        }
        registry.add_index(META_PTR_POS, HeaderValue::U32(meta_ptr), "META", false);
        registry.add_index(INFO_PTR_POS, HeaderValue::U32(info_ptr), "INFO", true);

        Ok(if found {
            ParsedTag::present(fields)
        } else {
            ParsedTag::absent()
        })
    }

    fn serialize(&self, zone: &Zone, fields: &TagFields, out: &mut Vec<u8>) -> Result<bool> {
        let mut payload = Vec::new();
        for (code, value) in fields.iter() {
            if Self::zone_for(code) != zone.name {
                continue;
            }
            if value.len() > u8::MAX as usize {
                return Err(Error::Serialization {
                    zone: zone.name.clone(),
                    reason: format!("value of {} is {} bytes", code, value.len()),
                });
            }
            payload.extend_from_slice(code.as_bytes());
            payload.push(value.len() as u8);
            payload.extend_from_slice(value.as_bytes());
        }
        if payload.is_empty() {
            return Ok(false);
        }

        out.extend_from_slice(zone.name.as_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&payload);
        Ok(true)
    }

    fn has_structure_headers(&self) -> bool {
        true
    }

    fn field_code_width(&self) -> Option<usize> {
        Some(4)
    }
}

// ============================================================================
// Scripted driver
// ============================================================================

/// A zone description for [`ScriptedDriver`].
#[derive(Debug, Clone)]
pub struct ScriptedZone {
    pub zone: Zone,
    pub headers: Vec<(HeaderKind, u64, HeaderValue)>,
    /// Bytes returned by `serialize`; `None` asks for a placeholder.
    pub output: Option<Vec<u8>>,
    /// Makes `serialize` fail for this zone.
    pub fail: bool,
}

impl ScriptedZone {
    pub fn new(name: &str, offset: u64, size: u64) -> Self {
        Self {
            zone: Zone::new(name, offset, size),
            headers: Vec::new(),
            output: None,
            fail: false,
        }
    }

    pub fn core(mut self, signature: &[u8]) -> Self {
        self.zone = self.zone.with_core_signature(signature.to_vec());
        self
    }

    pub fn header(mut self, kind: HeaderKind, position: u64, value: HeaderValue) -> Self {
        self.headers.push((kind, position, value));
        self
    }

    pub fn output(mut self, bytes: &[u8]) -> Self {
        self.output = Some(bytes.to_vec());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

/// Registers a fixed set of zones and serializes canned bytes.
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    pub zones: Vec<ScriptedZone>,
    pub exists: bool,
    pub fields: TagFields,
    pub anchor: Anchor,
}

impl ScriptedDriver {
    pub fn new(zones: Vec<ScriptedZone>) -> Self {
        Self {
            zones,
            exists: true,
            fields: [("code", "value")].into_iter().collect(),
            anchor: Anchor::EndOfFile,
        }
    }

    pub fn absent(mut self) -> Self {
        self.exists = false;
        self.fields = TagFields::new();
        self
    }

    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    fn script(&self, name: &str) -> Option<&ScriptedZone> {
        self.zones.iter().find(|z| z.zone.name == name)
    }
}

impl FormatDriver for ScriptedDriver {
    fn parse(
        &self,
        _stream: &mut dyn ReadSeek,
        _base_offset: u64,
        registry: &mut ZoneRegistry,
    ) -> Result<ParsedTag> {
        for scripted in &self.zones {
            registry.add_zone(scripted.zone.clone());
            for (kind, position, value) in &scripted.headers {
                match kind {
                    HeaderKind::Counter => registry.add_counter(*position, *value, &scripted.zone.name),
                    HeaderKind::Size => registry.add_size(*position, *value, &scripted.zone.name),
                    HeaderKind::AbsoluteIndex => {
                        registry.add_index(*position, *value, &scripted.zone.name, false)
                    }
                    HeaderKind::RelativeIndex => {
                        registry.add_index(*position, *value, &scripted.zone.name, true)
                    }
                }
            }
        }
        Ok(ParsedTag {
            exists: self.exists,
            fields: self.fields.clone(),
        })
    }

    fn serialize(&self, zone: &Zone, _fields: &TagFields, out: &mut Vec<u8>) -> Result<bool> {
        let Some(scripted) = self.script(&zone.name) else {
            return Ok(false);
        };
        if scripted.fail {
            return Err(Error::Serialization {
                zone: zone.name.clone(),
                reason: "scripted failure".into(),
            });
        }
        match &scripted.output {
            Some(bytes) => {
                out.extend_from_slice(bytes);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn default_anchor(&self) -> Anchor {
        self.anchor
    }

    fn has_structure_headers(&self) -> bool {
        true
    }
}

/// A stream of `len` bytes where byte `i` is `i % 251`, so shifted ranges
/// are easy to recognise.
pub fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

// ============================================================================
// Embedded tags
// ============================================================================
//
// Host container: "HOST" size(u32 LE) then chunks id(4) size(u32 LE) payload.
// The embedded tag lives in an "id3 " chunk and is "KV" len(u16 LE)
// followed by `key=value;` pairs.

/// Builds a host file from `(id, payload)` chunks.
pub fn host_file(chunks: &[(&[u8; 4], Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (id, payload) in chunks {
        body.extend_from_slice(*id);
        body.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        body.extend_from_slice(payload);
    }
    let mut file = b"HOST".to_vec();
    file.extend_from_slice(&(body.len() as u32).to_le_bytes());
    file.extend_from_slice(&body);
    file
}

/// Encodes a KV tag.
pub fn kv_tag(pairs: &[(&str, &str)]) -> Vec<u8> {
    let body: String = pairs.iter().map(|(k, v)| format!("{k}={v};")).collect();
    let mut out = b"KV".to_vec();
    out.extend_from_slice(&(body.len() as u16).to_le_bytes());
    out.extend_from_slice(body.as_bytes());
    out
}

/// Decodes the chunks of a host file.
pub fn host_chunks(bytes: &[u8]) -> Vec<([u8; 4], Vec<u8>)> {
    assert_eq!(&bytes[..4], b"HOST");
    assert_eq!(u32_at(bytes, 4) as usize, bytes.len() - 8, "host size");
    let mut chunks = Vec::new();
    let mut pos = 8;
    while pos < bytes.len() {
        let id: [u8; 4] = bytes[pos..pos + 4].try_into().unwrap();
        let len = u32_at(bytes, pos + 4) as usize;
        chunks.push((id, bytes[pos + 8..pos + 8 + len].to_vec()));
        pos += 8 + len;
    }
    chunks
}

/// Locates the `id3 ` chunk of a host file as `(offset, payload_len)`.
pub fn find_id3_chunk(bytes: &[u8]) -> Option<(u64, u64)> {
    let mut pos = 8;
    while pos + 8 <= bytes.len() {
        let len = u32_at(bytes, pos + 4) as usize;
        if &bytes[pos..pos + 4] == b"id3 " {
            return Some((pos as u64, len as u64));
        }
        pos += 8 + len;
    }
    None
}

/// Hosts a KV tag inside the `id3 ` chunk of a host file.
#[derive(Debug, Clone)]
pub struct HostEmbedder {
    /// `(chunk offset, payload length)` of an existing chunk.
    pub existing: Option<(u64, u64)>,
    /// Where a new chunk is inserted.
    pub insertion_offset: u64,
    /// Host size field value.
    pub host_size: u32,
}

impl HostEmbedder {
    pub fn for_file(bytes: &[u8]) -> Self {
        Self {
            existing: find_id3_chunk(bytes),
            insertion_offset: bytes.len() as u64,
            host_size: u32_at(bytes, 4),
        }
    }
}

impl Embedder for HostEmbedder {
    fn embedded_tag_offset(&self) -> Option<u64> {
        self.existing.map(|(offset, _)| offset + 8)
    }

    fn zone(&self) -> Zone {
        let mut zone = match self.existing {
            Some((offset, len)) => Zone::new("id3 ", offset, 8 + len),
            None => Zone::new("id3 ", self.insertion_offset, 0),
        };
        zone.headers.push(tagsplice::Header::new(
            HeaderKind::Size,
            4,
            HeaderValue::U32(self.host_size),
            tagsplice::Endianness::Little,
        ));
        zone
    }

    fn header_overhead(&self) -> u64 {
        8
    }

    fn write_embedding_header(&self, out: &mut Vec<u8>, payload_len: u64) -> Result<()> {
        out.extend_from_slice(b"id3 ");
        out.extend_from_slice(&(payload_len as u32).to_le_bytes());
        Ok(())
    }
}

/// Driver for the KV tag.
#[derive(Debug, Default)]
pub struct KvDriver;

impl FormatDriver for KvDriver {
    fn parse(
        &self,
        stream: &mut dyn ReadSeek,
        base_offset: u64,
        registry: &mut ZoneRegistry,
    ) -> Result<ParsedTag> {
        stream.seek(SeekFrom::Start(base_offset))?;
        let mut head = [0u8; 4];
        if stream.read_exact(&mut head).is_err() || &head[..2] != b"KV" {
            return Ok(ParsedTag::absent());
        }
        let len = u16::from_le_bytes([head[2], head[3]]) as usize;
        let mut body = vec![0u8; len];
        stream.read_exact(&mut body)?;
        registry.add_zone(Zone::new("kv", base_offset, 4 + len as u64));

        let text = String::from_utf8_lossy(&body);
        let fields = text
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .collect();
        Ok(ParsedTag::present(fields))
    }

    fn serialize(&self, _zone: &Zone, fields: &TagFields, out: &mut Vec<u8>) -> Result<bool> {
        if fields.is_empty() {
            return Ok(false);
        }
        let pairs: Vec<(&str, &str)> = fields.iter().collect();
        out.extend_from_slice(&kv_tag(&pairs));
        Ok(true)
    }

    fn supports_embedding(&self) -> bool {
        true
    }
}

/// Counts occurrences of each chunk id, for quick assertions.
pub fn chunk_ids(layout: &MiniLayout) -> HashMap<[u8; 4], usize> {
    let mut ids = HashMap::new();
    for (_, id, _) in &layout.chunks {
        *ids.entry(*id).or_insert(0) += 1;
    }
    ids
}
