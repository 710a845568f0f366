//! File format writer — produces a valid file: file header, a sequence of
//! blocks, footer index, footer_size, file-wide CRC-64, trailing magic.
//!
//! Same shape as other streaming container writers: reserve the header
//! region up front, append sequentially, backpatch at the end. Here the
//! writer accumulates encoded blocks behind a file header patched at
//! `finalize_and_close()`. The whole file is assembled in memory
//! before one final write, which sidesteps needing the underlying sink to
//! support seeking or reading back what was already written.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use chrono::Utc;
use log::debug;

use crate::block::{encode_block, crc64, CompressionType, EncodingType};
use crate::error::{Error, Result};
use crate::file_header::{ColumnType, FileHeader, FILE_HEADER_SIZE};
use crate::footer::{Footer, FooterEntry};

pub const TRAILING_MAGIC: u64 = crate::file_header::MAGIC;

#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub block_size_target: u32,
    pub encoding_type: EncodingType,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self { block_size_target: 10_000, encoding_type: EncodingType::Raw }
    }
}

/// Accumulates a complete file body in memory and writes it in one shot on
/// `finalize_and_close`. Blocks are appended one at a time via `write_block`
/// so callers never need to hold all pairs for the whole file at once.
pub struct FileWriter<W: Write> {
    sink: W,
    options: WriterOptions,
    footer: Footer,
    body: Vec<u8>,
    finalized: bool,
}

impl FileWriter<File> {
    pub fn create<P: AsRef<Path>>(path: P, options: WriterOptions) -> Result<Self> {
        Self::new(File::create(path)?, options)
    }
}

impl<W: Write> FileWriter<W> {
    pub fn new(sink: W, options: WriterOptions) -> Result<Self> {
        debug!(
            "opened file writer: block_size_target={} encoding={:?}",
            options.block_size_target, options.encoding_type
        );
        Ok(Self { sink, options, footer: Footer::default(), body: Vec::new(), finalized: false })
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Serialize one block and append it. Both slices must have equal
    /// length >= 1.
    pub fn write_block(&mut self, ids: &[u64], values: &[i64]) -> Result<()> {
        if self.finalized {
            return Err(Error::InvalidArgument("writer already finalized".into()));
        }
        let (header, layout, payload) = encode_block(ids, values, self.options.encoding_type)?;

        let block_offset = (FILE_HEADER_SIZE + self.body.len()) as u64;
        header.write(&mut self.body);
        layout.write(&mut self.body);
        self.body.extend_from_slice(&payload);
        let block_size = (FILE_HEADER_SIZE as u64 + self.body.len() as u64 - block_offset) as u32;

        self.footer.entries.push(FooterEntry::from_block_header(block_offset, block_size, &header));
        debug!("wrote block at offset {block_offset} ({} pairs)", ids.len());
        Ok(())
    }

    /// Assemble file header, footer, footer_size, file-wide CRC-64, and
    /// trailing magic, then write the complete file and flush.
    pub fn finalize_and_close(mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;

        let header = FileHeader {
            version: crate::file_header::VERSION,
            column_type: ColumnType::Int64,
            block_count: self.footer.entries.len() as u64,
            block_size_target: self.options.block_size_target,
            compression_type: CompressionType::None,
            encoding_type: self.options.encoding_type,
            creation_time: Utc::now().timestamp(),
        };

        let mut file = Vec::with_capacity(FILE_HEADER_SIZE + self.body.len() + 64);
        header.write(&mut file);
        file.extend_from_slice(&self.body);

        let mut footer_bytes = Vec::new();
        self.footer.write(&mut footer_bytes);
        file.extend_from_slice(&footer_bytes);

        // Covers file header, all blocks, and the footer — but not the
        // footer_size/crc/magic trailer fields that follow it.
        let file_crc = crc64(&file);

        let footer_size = footer_bytes.len() as u64;
        let mut footer_size_buf = [0u8; 8];
        LittleEndian::write_u64(&mut footer_size_buf, footer_size);
        file.extend_from_slice(&footer_size_buf);

        let mut crc_buf = [0u8; 8];
        LittleEndian::write_u64(&mut crc_buf, file_crc);
        file.extend_from_slice(&crc_buf);

        let mut magic_buf = [0u8; 8];
        LittleEndian::write_u64(&mut magic_buf, TRAILING_MAGIC);
        file.extend_from_slice(&magic_buf);

        self.sink.write_all(&file)?;
        self.sink.flush()?;

        debug!(
            "finalized file: {} block(s), footer_size={footer_size}, file_crc64={file_crc:#x}",
            self.footer.entries.len()
        );
        Ok(())
    }
}
