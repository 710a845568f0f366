//! Block builder — buffers incoming `(id, value)` pairs and slices off
//! complete blocks at `block_size_target`, handing each to a `FileWriter`.
//!
//! The write-side counterpart to `FileWriter`'s block-at-a-time API:
//! accumulate, flush in fixed-size chunks, flush the remainder on close.

use std::io::Write;

use log::debug;

use crate::error::Result;
use crate::writer::FileWriter;

pub struct BlockBuilder<W: Write> {
    writer: FileWriter<W>,
    pending_ids: Vec<u64>,
    pending_values: Vec<i64>,
    total_items: u64,
}

impl<W: Write> BlockBuilder<W> {
    pub fn new(writer: FileWriter<W>) -> Self {
        let target = writer.options().block_size_target as usize;
        Self {
            writer,
            pending_ids: Vec::with_capacity(target),
            pending_values: Vec::with_capacity(target),
            total_items: 0,
        }
    }

    /// Total pairs accepted so far, including ones still buffered and not
    /// yet flushed to a block.
    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    /// Append pairs, flushing full-sized blocks to the underlying writer as
    /// the buffer fills. `ids` and `values` must have equal length.
    pub fn write(&mut self, ids: &[u64], values: &[i64]) -> Result<()> {
        if ids.len() != values.len() {
            return Err(crate::error::Error::InvalidArgument(format!(
                "id/value length mismatch: {} ids, {} values",
                ids.len(),
                values.len()
            )));
        }
        let target = self.writer.options().block_size_target as usize;
        self.total_items += ids.len() as u64;
        self.pending_ids.extend_from_slice(ids);
        self.pending_values.extend_from_slice(values);

        while self.pending_ids.len() >= target && target > 0 {
            self.flush_block(target)?;
        }
        Ok(())
    }

    fn flush_block(&mut self, n: usize) -> Result<()> {
        let id_chunk: Vec<u64> = self.pending_ids.drain(..n).collect();
        let value_chunk: Vec<i64> = self.pending_values.drain(..n).collect();
        self.writer.write_block(&id_chunk, &value_chunk)
    }

    /// Flush any remaining buffered pairs as a final (possibly undersized)
    /// block, then finalize the file.
    pub fn close(mut self) -> Result<()> {
        if !self.pending_ids.is_empty() {
            let n = self.pending_ids.len();
            self.flush_block(n)?;
        }
        debug!("closing builder: {} total items", self.total_items);
        self.writer.finalize_and_close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::WriterOptions;

    #[test]
    fn flushes_full_blocks_and_remainder() {
        let buf = Vec::new();
        let writer = FileWriter::new(
            buf,
            WriterOptions { block_size_target: 4, encoding_type: crate::block::EncodingType::Raw },
        )
        .unwrap();
        let mut builder = BlockBuilder::new(writer);

        let ids: Vec<u64> = (1..=10).collect();
        let values: Vec<i64> = (1..=10).collect();
        builder.write(&ids, &values).unwrap();
        assert_eq!(builder.total_items(), 10);
        builder.close().unwrap();
    }

    #[test]
    fn rejects_mismatched_write() {
        let buf = Vec::new();
        let writer = FileWriter::new(buf, WriterOptions::default()).unwrap();
        let mut builder = BlockBuilder::new(writer);
        assert!(builder.write(&[1, 2], &[1]).is_err());
    }
}
