//! File format reader — opens a file written by `writer::FileWriter`,
//! validates its framing, and serves block-index-driven access without ever
//! scanning blocks linearly to find one.
//!
//! Same "read the footer/trailer first, then seek directly to whatever is
//! asked for" shape as other trailer-indexed container formats, retargeted
//! from chunk-compression framing to block-index framing.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::OnceLock;

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};

use crate::bitmap::GlobalIdBitmap;
use crate::block::{crc64, decode_block, BlockHeader, DataLayout, EncodingType, BLOCK_HEADER_SIZE, DATA_LAYOUT_SIZE};
use crate::error::{Error, Result};
use crate::file_header::{FileHeader, FILE_HEADER_SIZE};
use crate::footer::{Footer, FooterEntry};

/// Bytes after the footer: `footer_size`(8) + `file_crc64`(8) + trailing
/// magic(8).
const TRAILER_SIZE: u64 = 24;

pub struct FileReader<R: Read + Seek> {
    source: R,
    header: FileHeader,
    footer: Footer,
    global_bitmap: OnceLock<GlobalIdBitmap>,
}

impl FileReader<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> FileReader<R> {
    /// Opening sequence: read the file header, seek to the end to locate
    /// the trailing magic / file CRC / footer_size, then seek backward to
    /// parse the footer itself.
    pub fn new(mut source: R) -> Result<Self> {
        let mut header_buf = [0u8; FILE_HEADER_SIZE];
        source.read_exact(&mut header_buf)?;
        let header = FileHeader::read(&header_buf)?;

        let file_len = source.seek(SeekFrom::End(0))?;
        if file_len < FILE_HEADER_SIZE as u64 + TRAILER_SIZE {
            return Err(Error::InvalidFormat("file shorter than minimum framing".into()));
        }

        source.seek(SeekFrom::Start(file_len - 8))?;
        let mut magic_buf = [0u8; 8];
        source.read_exact(&mut magic_buf)?;
        let trailing_magic = LittleEndian::read_u64(&magic_buf);
        if trailing_magic != crate::file_header::MAGIC {
            return Err(Error::InvalidFormat("bad trailing magic".into()));
        }

        source.seek(SeekFrom::Start(file_len - 16))?;
        let mut crc_buf = [0u8; 8];
        source.read_exact(&mut crc_buf)?;
        let file_crc = LittleEndian::read_u64(&crc_buf);

        source.seek(SeekFrom::Start(file_len - 24))?;
        let mut footer_size_buf = [0u8; 8];
        source.read_exact(&mut footer_size_buf)?;
        let footer_size = LittleEndian::read_u64(&footer_size_buf);

        let footer_end = file_len - TRAILER_SIZE; // end of footer, start of footer_size field
        let footer_start = footer_end
            .checked_sub(footer_size)
            .ok_or_else(|| Error::InvalidFormat("footer_size larger than file".into()))?;
        if footer_start < FILE_HEADER_SIZE as u64 {
            return Err(Error::InvalidFormat("footer_size overruns file header".into()));
        }

        source.seek(SeekFrom::Start(footer_start))?;
        let mut footer_buf = vec![0u8; footer_size as usize];
        source.read_exact(&mut footer_buf)?;
        let footer = Footer::read(&footer_buf)?;

        if footer.entries.len() as u64 != header.block_count {
            return Err(Error::InvalidFormat(format!(
                "footer entry count {} disagrees with header block_count {}",
                footer.entries.len(),
                header.block_count
            )));
        }

        debug!(
            "opened file reader: {} block(s), file_crc64={file_crc:#x}",
            footer.entries.len()
        );

        Ok(Self { source, header, footer, global_bitmap: OnceLock::new() })
    }

    pub fn version(&self) -> u32 {
        self.header.version
    }

    pub fn encoding_type(&self) -> EncodingType {
        self.header.encoding_type
    }

    pub fn block_count(&self) -> usize {
        self.footer.entries.len()
    }

    pub fn footer_entries(&self) -> &[FooterEntry] {
        &self.footer.entries
    }

    /// Verify the file-wide CRC-64 by re-reading every byte from offset 0
    /// through the end of the footer (not including the `footer_size`,
    /// `file_crc64`, or trailing-magic fields). Not run automatically on
    /// open since callers that only need metadata-path aggregation never
    /// touch block payloads and shouldn't pay for a full-file read.
    pub fn verify_file_checksum(&mut self) -> Result<()> {
        let file_len = self.source.seek(SeekFrom::End(0))?;
        let check_len = file_len - TRAILER_SIZE; // up to end of footer, excluding the trailer
        self.source.seek(SeekFrom::Start(file_len - 16))?;
        let mut crc_buf = [0u8; 8];
        self.source.read_exact(&mut crc_buf)?;
        let expected = LittleEndian::read_u64(&crc_buf);

        self.source.seek(SeekFrom::Start(0))?;
        let mut body = vec![0u8; check_len as usize];
        self.source.read_exact(&mut body)?;
        let actual = crc64(&body);
        if actual != expected {
            return Err(Error::Corrupt("file-wide CRC-64 mismatch".into()));
        }
        Ok(())
    }

    /// Decode the full `(ids, values)` pair list for one block, identified
    /// by its position in the footer (not its file offset).
    pub fn get_pairs(&mut self, block_index: usize) -> Result<(Vec<u64>, Vec<i64>)> {
        let entry = self
            .footer
            .entries
            .get(block_index)
            .ok_or_else(|| Error::InvalidArgument(format!("block index {block_index} out of range")))?
            .clone();

        self.source.seek(SeekFrom::Start(entry.block_offset))?;
        let mut framed = vec![0u8; entry.block_size as usize];
        self.source.read_exact(&mut framed)?;

        if framed.len() < BLOCK_HEADER_SIZE + DATA_LAYOUT_SIZE {
            return Err(Error::Corrupt("block shorter than its own framing".into()));
        }
        let header = BlockHeader::read(&framed[..BLOCK_HEADER_SIZE])?;
        let layout = DataLayout::read(&framed[BLOCK_HEADER_SIZE..BLOCK_HEADER_SIZE + DATA_LAYOUT_SIZE])?;
        let payload = &framed[BLOCK_HEADER_SIZE + DATA_LAYOUT_SIZE..];

        decode_block(&header, &layout, payload)
    }

    /// Read one block's raw framed bytes (header + layout + payload) without
    /// decoding, so callers that want to defer decoding (e.g. a parallel
    /// scan) can drain the sequential reader first.
    pub fn read_raw_block(&mut self, block_offset: u64, block_size: u32) -> Result<Vec<u8>> {
        self.source.seek(SeekFrom::Start(block_offset))?;
        let mut framed = vec![0u8; block_size as usize];
        self.source.read_exact(&mut framed)?;
        Ok(framed)
    }

    /// The set of every ID present in the file, built by decoding every
    /// block's ID section once and cached for the lifetime of the reader.
    pub fn get_global_id_bitmap(&mut self) -> Result<&GlobalIdBitmap> {
        if self.global_bitmap.get().is_some() {
            return Ok(self.global_bitmap.get().unwrap());
        }
        let mut bitmap = GlobalIdBitmap::new();
        for i in 0..self.footer.entries.len() {
            match self.get_pairs(i) {
                Ok((ids, _)) => {
                    for id in ids {
                        bitmap.insert(id);
                    }
                }
                Err(e) => {
                    warn!("skipping corrupt block {i} while building global id bitmap: {e}");
                    return Err(e);
                }
            }
        }
        let _ = self.global_bitmap.set(bitmap);
        Ok(self.global_bitmap.get().unwrap())
    }
}
