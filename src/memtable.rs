//! In-memory store facade — a thin wrapper over one unflushed, unindexed
//! batch of pairs. Aggregations that can't be derived from block footer
//! statistics alone (median chief among them, since no running sum of
//! medians exists) are computed here by sorting the held values directly.
//!
//! One struct that owns buffered state and exposes the same-shaped
//! operations as the on-disk path, without a superblock or persistence of
//! its own.

use crate::aggregate::{AggregateOptions, AggregateResult};
use crate::bitmap::GlobalIdBitmap;
use crate::error::{Error, Result};

/// A single unflushed batch of `(id, value)` pairs, held in memory prior to
/// being handed to a `BlockBuilder`. IDs need not be unique or sorted; the
/// memtable makes no on-disk format guarantees of its own.
#[derive(Debug, Clone, Default)]
pub struct MemTable {
    ids: Vec<u64>,
    values: Vec<i64>,
}

impl MemTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u64, value: i64) {
        self.ids.push(id);
        self.values.push(value);
    }

    pub fn extend(&mut self, ids: &[u64], values: &[i64]) -> Result<()> {
        if ids.len() != values.len() {
            return Err(Error::InvalidArgument(format!(
                "id/value length mismatch: {} ids, {} values",
                ids.len(),
                values.len()
            )));
        }
        self.ids.extend_from_slice(ids);
        self.values.extend_from_slice(values);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn id_bitmap(&self) -> GlobalIdBitmap {
        GlobalIdBitmap::from_ids(self.ids.iter().copied())
    }

    /// Count/min/max/sum/avg over the held pairs, honoring the same
    /// allow/deny filter semantics as the on-disk aggregation engine.
    pub fn aggregate(&self, opts: &AggregateOptions) -> AggregateResult {
        let mut result = AggregateResult::empty();
        for (&id, &value) in self.ids.iter().zip(self.values.iter()) {
            if Self::passes(id, opts) {
                result = result.merge(&AggregateResult::single(value));
            }
        }
        result
    }

    fn passes(id: u64, opts: &AggregateOptions) -> bool {
        if let Some(deny) = &opts.deny_filter {
            if deny.contains(id) {
                return false;
            }
        }
        if let Some(allow) = &opts.allow_filter {
            return allow.contains(id);
        }
        true
    }

    /// Median of the values passing `opts`'s filters. `None` when nothing
    /// passes. Computed by sorting a filtered copy — there is no
    /// incremental footer statistic this can be derived from.
    pub fn median(&self, opts: &AggregateOptions) -> Option<f64> {
        let mut filtered: Vec<i64> = self
            .ids
            .iter()
            .zip(self.values.iter())
            .filter(|(&id, _)| Self::passes(id, opts))
            .map(|(_, &v)| v)
            .collect();
        if filtered.is_empty() {
            return None;
        }
        filtered.sort_unstable();
        let mid = filtered.len() / 2;
        if filtered.len() % 2 == 1 {
            Some(filtered[mid] as f64)
        } else {
            Some((filtered[mid - 1] as f64 + filtered[mid] as f64) / 2.0)
        }
    }
}
