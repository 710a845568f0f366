//! Multi-reader stack — aggregates across several files given
//! oldest-to-newest, where a newer file's IDs shadow the same IDs in older
//! files (LSM-style overwrite semantics). The stack itself walks the slice
//! newest-to-oldest internally so the shadow filter only ever grows.
//!
//! Each file is aggregated independently with an accumulating deny filter
//! covering every ID already seen in a newer file, then results are merged
//! with `AggregateResult::merge`. An empty stack returns
//! `AggregateResult::empty()` rather than erroring, matching the rest of the
//! aggregation engine's "no data is not a failure" convention.

use std::io::{Read, Seek};

use log::debug;

use crate::aggregate::{aggregate, AggregateOptions, AggregateResult};
use crate::bitmap::GlobalIdBitmap;
use crate::error::Result;
use crate::reader::FileReader;

/// Aggregate across `readers`, given oldest-to-newest, applying
/// `base_opts` to each file while layering in an accumulating deny filter
/// so older files never double-count IDs a newer file has already claimed.
///
/// `base_opts.deny_filter`, if set, is treated as an initial deny set
/// applied to every file in addition to the accumulated shadow filter.
pub fn aggregate_stack<R: Read + Seek>(
    readers: &mut [FileReader<R>],
    base_opts: &AggregateOptions,
) -> Result<AggregateResult> {
    if readers.is_empty() {
        debug!("aggregate_stack: empty reader stack");
        return Ok(AggregateResult::empty());
    }

    let mut shadow = base_opts.deny_filter.clone().unwrap_or_default();
    let mut total = AggregateResult::empty();

    for (i, reader) in readers.iter_mut().enumerate().rev() {
        let opts = AggregateOptions {
            skip_precalculated: true,
            allow_filter: base_opts.allow_filter.clone(),
            deny_filter: Some(shadow.clone()),
            parallel: base_opts.parallel,
        };
        let result = aggregate(reader, &opts)?;
        debug!("aggregate_stack: file {i} contributed count={}", result.count);
        total = total.merge(&result);

        // Every ID in this file now shadows the same ID in files older
        // than it, whether or not it passed this file's filters.
        let ids_bitmap = reader.get_global_id_bitmap()?;
        shadow.union_with(ids_bitmap);
    }

    Ok(total)
}

/// Convenience wrapper bundling readers with their own deny-shadow state,
/// for callers that want to add files incrementally rather than aggregate
/// a fixed slice in one call.
pub struct MultiReaderStack<R: Read + Seek> {
    readers: Vec<FileReader<R>>,
}

impl<R: Read + Seek> MultiReaderStack<R> {
    pub fn new() -> Self {
        Self { readers: Vec::new() }
    }

    /// Push the next-newest file onto the stack. Callers must push in
    /// oldest-to-newest order.
    pub fn push(&mut self, reader: FileReader<R>) {
        self.readers.push(reader);
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    pub fn aggregate(&mut self, opts: &AggregateOptions) -> Result<AggregateResult> {
        aggregate_stack(&mut self.readers, opts)
    }

    pub fn global_id_bitmap(&mut self) -> Result<GlobalIdBitmap> {
        let mut merged = GlobalIdBitmap::new();
        for reader in &mut self.readers {
            merged.union_with(reader.get_global_id_bitmap()?);
        }
        Ok(merged)
    }
}

impl<R: Read + Seek> Default for MultiReaderStack<R> {
    fn default() -> Self {
        Self::new()
    }
}
