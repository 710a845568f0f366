//! Block format — fixed 80-byte header, 16-byte data-layout descriptor,
//! and an `id_section || value_section` payload.
//!
//! # On-disk layout (96 bytes of framing + payload, all fields little-endian)
//!
//! ```text
//! BlockHeader (80 bytes):
//!   min_id u64, max_id u64,
//!   min_value i64, max_value i64, sum i64,
//!   count u32, encoding_type u32, compression_type u32,
//!   uncompressed_size u32, compressed_size u32,
//!   checksum u64, reserved[12]
//! DataLayout (16 bytes):
//!   id_section_offset u32, id_section_size u32,
//!   value_section_offset u32, value_section_size u32
//! Payload: id_section || value_section
//! ```
//!
//! `checksum` is CRC-64 (ISO 3309 polynomial, reflected, init/xorout all-ones
//! — the same construction Go's `hash/crc64` package calls `ISO`) computed
//! over the concatenated payload bytes after encoding. `DataLayout` offsets
//! are relative to the start of the payload; writers place the ID section
//! first (`id_section_offset = 0`, `value_section_offset = id_section_size`)
//! but readers must honor the descriptor rather than assume adjacency.
//!
//! Self-describing framing and mandatory-checksum decode are the same shape
//! as other block-structured container formats; here the block stats
//! additionally pull double duty as the footer's index
//! entries, so `min_id`/`max_id`/`min_value`/`max_value`/`sum`/`count` are
//! computed once here and never recomputed by the footer.

use byteorder::{ByteOrder, LittleEndian};
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::varint;

pub const BLOCK_HEADER_SIZE: usize = 80;
pub const DATA_LAYOUT_SIZE: usize = 16;

// ── Encoding / compression tags ─────────────────────────────────────────────

/// Closed tagged-variant set: two bits of meaning packed into one `u32` on
/// disk (bit 0 = IDs are varint-encoded, bit 1 = values are varint-encoded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[repr(u32)]
pub enum EncodingType {
    Raw = 0,
    VarintIds = 1,
    VarintValues = 2,
    VarintBoth = 3,
}

impl EncodingType {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(EncodingType::Raw),
            1 => Some(EncodingType::VarintIds),
            2 => Some(EncodingType::VarintValues),
            3 => Some(EncodingType::VarintBoth),
            _ => None,
        }
    }

    #[inline]
    pub fn ids_are_varint(self) -> bool {
        matches!(self, EncodingType::VarintIds | EncodingType::VarintBoth)
    }

    #[inline]
    pub fn values_are_varint(self) -> bool {
        matches!(self, EncodingType::VarintValues | EncodingType::VarintBoth)
    }
}

/// `compression_type`: the core defines only `None`; other codepoints are
/// reserved and must be rejected rather than silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CompressionType {
    None = 0,
}

impl CompressionType {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(CompressionType::None),
            _ => None,
        }
    }
}

// ── CRC-64 (ISO 3309, reflected) ─────────────────────────────────────────────

/// Reflected ISO polynomial, already bit-reversed for the standard
/// table-driven reflected-CRC algorithm (same constant as Go's
/// `crc64.ISO`).
const CRC64_ISO_POLY: u64 = 0xD800_0000_0000_0000;

fn crc64_table() -> &'static [u64; 256] {
    static TABLE: OnceLock<[u64; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u64; 256];
        let mut i = 0usize;
        while i < 256 {
            let mut crc = i as u64;
            let mut j = 0;
            while j < 8 {
                if crc & 1 == 1 {
                    crc = (crc >> 1) ^ CRC64_ISO_POLY;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    })
}

pub fn crc64(data: &[u8]) -> u64 {
    let table = crc64_table();
    let mut crc = u64::MAX;
    for &byte in data {
        let idx = ((crc ^ byte as u64) & 0xff) as usize;
        crc = table[idx] ^ (crc >> 8);
    }
    !crc
}

// ── BlockHeader ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub min_id: u64,
    pub max_id: u64,
    pub min_value: i64,
    pub max_value: i64,
    pub sum: i64,
    pub count: u32,
    pub encoding_type: EncodingType,
    pub compression_type: CompressionType,
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    pub checksum: u64,
}

impl BlockHeader {
    pub fn write(&self, out: &mut Vec<u8>) {
        let mut buf = [0u8; BLOCK_HEADER_SIZE];
        LittleEndian::write_u64(&mut buf[0..8], self.min_id);
        LittleEndian::write_u64(&mut buf[8..16], self.max_id);
        LittleEndian::write_i64(&mut buf[16..24], self.min_value);
        LittleEndian::write_i64(&mut buf[24..32], self.max_value);
        LittleEndian::write_i64(&mut buf[32..40], self.sum);
        LittleEndian::write_u32(&mut buf[40..44], self.count);
        LittleEndian::write_u32(&mut buf[44..48], self.encoding_type as u32);
        LittleEndian::write_u32(&mut buf[48..52], self.compression_type as u32);
        LittleEndian::write_u32(&mut buf[52..56], self.uncompressed_size);
        LittleEndian::write_u32(&mut buf[56..60], self.compressed_size);
        LittleEndian::write_u64(&mut buf[60..68], self.checksum);
        // buf[68..80] stays zeroed — reserved.
        out.extend_from_slice(&buf);
    }

    pub fn read(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < BLOCK_HEADER_SIZE {
            return Err(Error::InvalidFormat("block header truncated".into()));
        }
        let encoding_type = EncodingType::from_u32(LittleEndian::read_u32(&bytes[44..48]))
            .ok_or_else(|| Error::InvalidFormat("unknown block encoding_type".into()))?;
        let compression_type = CompressionType::from_u32(LittleEndian::read_u32(&bytes[48..52]))
            .ok_or_else(|| Error::InvalidFormat("unknown block compression_type".into()))?;
        Ok(Self {
            min_id: LittleEndian::read_u64(&bytes[0..8]),
            max_id: LittleEndian::read_u64(&bytes[8..16]),
            min_value: LittleEndian::read_i64(&bytes[16..24]),
            max_value: LittleEndian::read_i64(&bytes[24..32]),
            sum: LittleEndian::read_i64(&bytes[32..40]),
            count: LittleEndian::read_u32(&bytes[40..44]),
            encoding_type,
            compression_type,
            uncompressed_size: LittleEndian::read_u32(&bytes[52..56]),
            compressed_size: LittleEndian::read_u32(&bytes[56..60]),
            checksum: LittleEndian::read_u64(&bytes[60..68]),
        })
    }
}

// ── DataLayout ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataLayout {
    pub id_section_offset: u32,
    pub id_section_size: u32,
    pub value_section_offset: u32,
    pub value_section_size: u32,
}

impl DataLayout {
    pub fn write(&self, out: &mut Vec<u8>) {
        let mut buf = [0u8; DATA_LAYOUT_SIZE];
        LittleEndian::write_u32(&mut buf[0..4], self.id_section_offset);
        LittleEndian::write_u32(&mut buf[4..8], self.id_section_size);
        LittleEndian::write_u32(&mut buf[8..12], self.value_section_offset);
        LittleEndian::write_u32(&mut buf[12..16], self.value_section_size);
        out.extend_from_slice(&buf);
    }

    pub fn read(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < DATA_LAYOUT_SIZE {
            return Err(Error::InvalidFormat("data layout truncated".into()));
        }
        Ok(Self {
            id_section_offset: LittleEndian::read_u32(&bytes[0..4]),
            id_section_size: LittleEndian::read_u32(&bytes[4..8]),
            value_section_offset: LittleEndian::read_u32(&bytes[8..12]),
            value_section_size: LittleEndian::read_u32(&bytes[12..16]),
        })
    }
}

// ── encode_block / decode_block ─────────────────────────────────────────────

/// Compute block statistics and encode `(ids, values)` into a complete
/// on-disk block (header + layout + payload), per `encoding`.
///
/// Both slices must have equal length >= 1.
pub fn encode_block(
    ids: &[u64],
    values: &[i64],
    encoding: EncodingType,
) -> Result<(BlockHeader, DataLayout, Vec<u8>)> {
    if ids.len() != values.len() {
        return Err(Error::InvalidArgument(format!(
            "id/value length mismatch: {} ids, {} values",
            ids.len(),
            values.len()
        )));
    }
    if ids.is_empty() {
        return Err(Error::InvalidArgument("block must contain at least one pair".into()));
    }

    let mut min_id = ids[0];
    let mut max_id = ids[0];
    let mut min_value = values[0];
    let mut max_value = values[0];
    let mut sum: i64 = 0;
    for (&id, &value) in ids.iter().zip(values.iter()) {
        min_id = min_id.min(id);
        max_id = max_id.max(id);
        min_value = min_value.min(value);
        max_value = max_value.max(value);
        sum = sum.wrapping_add(value);
    }

    let mut id_section = Vec::new();
    if encoding.ids_are_varint() {
        varint::encode_varint_u64(ids, &mut id_section);
    } else {
        varint::encode_raw_u64(ids, &mut id_section);
    }

    let mut value_section = Vec::new();
    if encoding.values_are_varint() {
        varint::encode_varint_i64(values, &mut value_section);
    } else {
        varint::encode_raw_i64(values, &mut value_section);
    }

    let id_section_size = id_section.len() as u32;
    let value_section_size = value_section.len() as u32;

    let mut payload = Vec::with_capacity(id_section.len() + value_section.len());
    payload.extend_from_slice(&id_section);
    payload.extend_from_slice(&value_section);

    let checksum = crc64(&payload);
    // No compression codepoint exists yet, so the two sizes are always equal.
    let compressed_size = payload.len() as u32;
    let uncompressed_size = compressed_size;

    let header = BlockHeader {
        min_id,
        max_id,
        min_value,
        max_value,
        sum,
        count: ids.len() as u32,
        encoding_type: encoding,
        compression_type: CompressionType::None,
        uncompressed_size,
        compressed_size,
        checksum,
    };
    let layout = DataLayout {
        id_section_offset: 0,
        id_section_size,
        value_section_offset: id_section_size,
        value_section_size,
    };

    Ok((header, layout, payload))
}

/// Verify the checksum and decode a block payload into `(ids, values)` of
/// length `header.count`.
///
/// Fails with `Corrupt` if the CRC mismatches, if either section overruns
/// `compressed_size`, or if the decoded count disagrees with the header.
pub fn decode_block(
    header: &BlockHeader,
    layout: &DataLayout,
    payload: &[u8],
) -> Result<(Vec<u64>, Vec<i64>)> {
    if payload.len() != header.compressed_size as usize {
        return Err(Error::Corrupt(format!(
            "payload length {} does not match header compressed_size {}",
            payload.len(),
            header.compressed_size
        )));
    }
    if crc64(payload) != header.checksum {
        return Err(Error::Corrupt("block payload CRC-64 mismatch".into()));
    }

    let id_start = layout.id_section_offset as usize;
    let id_end = id_start
        .checked_add(layout.id_section_size as usize)
        .ok_or_else(|| Error::Corrupt("id section size overflow".into()))?;
    let value_start = layout.value_section_offset as usize;
    let value_end = value_start
        .checked_add(layout.value_section_size as usize)
        .ok_or_else(|| Error::Corrupt("value section size overflow".into()))?;
    if id_end > payload.len() || value_end > payload.len() {
        return Err(Error::Corrupt("data layout section overruns compressed payload".into()));
    }

    let id_bytes = &payload[id_start..id_end];
    let value_bytes = &payload[value_start..value_end];
    let count = header.count as usize;

    let mut ids = Vec::with_capacity(count);
    if header.encoding_type.ids_are_varint() {
        varint::decode_varint_u64(id_bytes, count, &mut ids)?;
    } else {
        varint::decode_raw_u64(id_bytes, count, &mut ids)?;
    }

    let mut values = Vec::with_capacity(count);
    if header.encoding_type.values_are_varint() {
        varint::decode_varint_i64(value_bytes, count, &mut values)?;
    } else {
        varint::decode_raw_i64(value_bytes, count, &mut values)?;
    }

    if ids.len() != count || values.len() != count {
        return Err(Error::Corrupt("decoded pair count disagrees with block header".into()));
    }

    Ok((ids, values))
}
