//! Aggregation engine — count/min/max/sum/avg over the IDs in a file,
//! either straight from footer statistics (no block ever decoded) or by
//! scanning and filtering decoded blocks.
//!
//! The parallel scan path reads raw block bytes sequentially first (the
//! reader owns a single seek position), then decodes, filters, and
//! accumulates each block's contribution across a rayon thread pool sized by
//! `AggregateOptions::parallel`.

use std::io::{Read, Seek};

use log::debug;
use rayon::prelude::*;

use crate::bitmap::GlobalIdBitmap;
use crate::block::{decode_block, BlockHeader, DataLayout, BLOCK_HEADER_SIZE, DATA_LAYOUT_SIZE};
use crate::error::Result;
use crate::reader::FileReader;

#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    /// When `true`, bypass the footer-stats fast path even if no filters
    /// are set, forcing a full block scan.
    pub skip_precalculated: bool,
    pub allow_filter: Option<GlobalIdBitmap>,
    pub deny_filter: Option<GlobalIdBitmap>,
    /// `0` = sequential, `< 0` = rayon's default global pool, `> 0` = a
    /// scoped pool with exactly that many worker threads.
    pub parallel: i32,
}

/// Accumulates in a signed-sentinel form (`min = i64::MAX`, `max =
/// i64::MIN`) so partial results merge safely regardless of order; callers
/// see the externally-visible zero-result instead once `count == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateResult {
    pub count: u64,
    pub sum: i64,
    min_sentinel: i64,
    max_sentinel: i64,
}

impl AggregateResult {
    pub fn empty() -> Self {
        Self { count: 0, sum: 0, min_sentinel: i64::MAX, max_sentinel: i64::MIN }
    }

    pub fn single(value: i64) -> Self {
        Self { count: 1, sum: value, min_sentinel: value, max_sentinel: value }
    }

    pub fn min(&self) -> i64 {
        if self.count == 0 {
            0
        } else {
            self.min_sentinel
        }
    }

    pub fn max(&self) -> i64 {
        if self.count == 0 {
            0
        } else {
            self.max_sentinel
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    pub fn merge(&self, other: &Self) -> Self {
        if self.count == 0 {
            return *other;
        }
        if other.count == 0 {
            return *self;
        }
        Self {
            count: self.count + other.count,
            sum: self.sum.wrapping_add(other.sum),
            min_sentinel: self.min_sentinel.min(other.min_sentinel),
            max_sentinel: self.max_sentinel.max(other.max_sentinel),
        }
    }
}

fn passes_filters(id: u64, allow: Option<&GlobalIdBitmap>, deny: Option<&GlobalIdBitmap>) -> bool {
    // Deny takes precedence over allow.
    if let Some(deny) = deny {
        if deny.contains(id) {
            return false;
        }
    }
    if let Some(allow) = allow {
        return allow.contains(id);
    }
    true
}

fn has_filters(opts: &AggregateOptions) -> bool {
    opts.allow_filter.is_some() || opts.deny_filter.is_some()
}

/// Sum footer-entry statistics directly, without decoding a single block.
/// Only valid when no filters are active: per-entry `min`/`max`/`sum` can't
/// be recomputed under a filter without decoding.
fn aggregate_from_footer(entries: &[crate::footer::FooterEntry]) -> AggregateResult {
    let mut result = AggregateResult::empty();
    for entry in entries {
        if entry.count == 0 {
            continue;
        }
        result = result.merge(&AggregateResult {
            count: entry.count as u64,
            sum: entry.sum,
            min_sentinel: entry.min_value,
            max_sentinel: entry.max_value,
        });
    }
    result
}

fn aggregate_block_values(
    ids: &[u64],
    values: &[i64],
    allow: Option<&GlobalIdBitmap>,
    deny: Option<&GlobalIdBitmap>,
) -> AggregateResult {
    let mut result = AggregateResult::empty();
    for (&id, &value) in ids.iter().zip(values.iter()) {
        if passes_filters(id, allow, deny) {
            result = result.merge(&AggregateResult::single(value));
        }
    }
    result
}

/// Read one block's raw framed bytes (header + layout + payload) without
/// decoding them, so the sequential single-seek reader can be fully drained
/// before parallel work starts.
fn read_block_framed<R: Read + Seek>(reader: &mut FileReader<R>, index: usize) -> Result<Vec<u8>> {
    // FileReader doesn't expose raw bytes directly; get_pairs decodes, but
    // we want decode deferred to the parallel stage, so re-derive the
    // framing window via the footer entry and read it here.
    let entry = reader.footer_entries()[index].clone();
    reader.read_raw_block(entry.block_offset, entry.block_size)
}

fn decode_framed(framed: &[u8]) -> Result<(Vec<u64>, Vec<i64>)> {
    let header = BlockHeader::read(&framed[..BLOCK_HEADER_SIZE])?;
    let layout = DataLayout::read(&framed[BLOCK_HEADER_SIZE..BLOCK_HEADER_SIZE + DATA_LAYOUT_SIZE])?;
    let payload = &framed[BLOCK_HEADER_SIZE + DATA_LAYOUT_SIZE..];
    decode_block(&header, &layout, payload)
}

/// Run the scan path sequentially: decode every block in footer order,
/// filter, accumulate.
fn aggregate_scan_sequential<R: Read + Seek>(
    reader: &mut FileReader<R>,
    opts: &AggregateOptions,
) -> Result<AggregateResult> {
    let mut result = AggregateResult::empty();
    for i in 0..reader.block_count() {
        let (ids, values) = reader.get_pairs(i)?;
        result = result.merge(&aggregate_block_values(
            &ids,
            &values,
            opts.allow_filter.as_ref(),
            opts.deny_filter.as_ref(),
        ));
    }
    Ok(result)
}

/// Run the scan path across a rayon thread pool: raw block bytes are read
/// sequentially first (the reader owns one seek cursor), then decoded and
/// accumulated in parallel.
fn aggregate_scan_parallel<R: Read + Seek>(
    reader: &mut FileReader<R>,
    opts: &AggregateOptions,
) -> Result<AggregateResult> {
    let mut framed_blocks = Vec::with_capacity(reader.block_count());
    for i in 0..reader.block_count() {
        framed_blocks.push(read_block_framed(reader, i)?);
    }

    let reduce = |blocks: &[Vec<u8>]| -> Result<AggregateResult> {
        blocks
            .par_iter()
            .map(|framed| {
                let (ids, values) = decode_framed(framed)?;
                Ok(aggregate_block_values(&ids, &values, opts.allow_filter.as_ref(), opts.deny_filter.as_ref()))
            })
            .try_reduce(AggregateResult::empty, |a, b| Ok(a.merge(&b)))
    };

    if opts.parallel > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(opts.parallel as usize)
            .build()
            .map_err(|e| crate::error::Error::InvalidArgument(e.to_string()))?;
        pool.install(|| reduce(&framed_blocks))
    } else {
        reduce(&framed_blocks)
    }
}

/// Compute `AggregateResult` over a single file's blocks according to
/// `opts`. Takes the footer-stats fast path whenever no filters are set and
/// `skip_precalculated` is `false`; otherwise scans, sequentially or in
/// parallel per `opts.parallel`.
pub fn aggregate<R: Read + Seek>(
    reader: &mut FileReader<R>,
    opts: &AggregateOptions,
) -> Result<AggregateResult> {
    if !opts.skip_precalculated && !has_filters(opts) {
        debug!("aggregate: taking footer-stats fast path ({} blocks)", reader.block_count());
        return Ok(aggregate_from_footer(reader.footer_entries()));
    }

    if opts.parallel == 0 {
        debug!("aggregate: sequential scan ({} blocks)", reader.block_count());
        aggregate_scan_sequential(reader, opts)
    } else {
        debug!(
            "aggregate: parallel scan ({} blocks, parallel={})",
            reader.block_count(),
            opts.parallel
        );
        aggregate_scan_parallel(reader, opts)
    }
}
