//! # Record Cache
//!
//! Two bounded tables in front of a [`RecordSource`]:
//!
//! - **decoded**: [`DecodedSpectrum`] values, enabled explicitly by the caller
//!   (default capacity [`DEFAULT_DECODED_CAPACITY`]).
//! - **raw**: [`Record`]s still holding their native handle. It switches on by
//!   itself with capacity 1 when the same index is requested
//!   [`HOT_INDEX_THRESHOLD`] times in a row while the decoded table is off,
//!   which is what per-field getters do when a caller walks one spectrum.
//!
//! Both tables evict in insertion order. Raw records are released when they
//! are evicted, replaced, cleared or when the cache is dropped.

mod bounded;

#[cfg(test)]
mod tests;

use log::debug;

use crate::source::{DetailTier, Record, RecordSource, SourceError};
use crate::spectrum::DecodedSpectrum;

pub use bounded::{BoundedCache, Releasable};

/// Default capacity of the decoded table.
pub const DEFAULT_DECODED_CAPACITY: usize = 100;

/// Consecutive requests for one index that activate the raw table.
pub const HOT_INDEX_THRESHOLD: usize = 10;

/// Counters describing cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Decoded table lookups that were served
    pub decoded_hits: u64,
    /// Decoded table lookups that fell through
    pub decoded_misses: u64,
    /// Raw-path requests served from the raw table
    pub raw_hits: u64,
    /// Raw-path requests that read the source
    pub source_reads: u64,
    /// Entries evicted for capacity across both tables
    pub evictions: u64,
    /// Times the raw table switched on by itself
    pub hot_activations: u64,
}

/// Adaptive dual cache of decoded spectra and raw records.
#[derive(Debug)]
pub struct RecordCache {
    decoded: Option<BoundedCache<DecodedSpectrum>>,
    raw: Option<BoundedCache<Record>>,
    hot_index_threshold: usize,
    last_raw_index: Option<usize>,
    repeat_count: usize,
    stats: CacheStats,
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new(HOT_INDEX_THRESHOLD)
    }
}

impl RecordCache {
    /// Cache with both tables off.
    pub fn new(hot_index_threshold: usize) -> Self {
        Self {
            decoded: None,
            raw: None,
            hot_index_threshold: hot_index_threshold.max(1),
            last_raw_index: None,
            repeat_count: 0,
            stats: CacheStats::default(),
        }
    }

    /// Switch the decoded table on with a fresh, empty table.
    pub fn enable(&mut self, capacity: Option<usize>) {
        let capacity = capacity.unwrap_or(DEFAULT_DECODED_CAPACITY).max(1);
        debug!("Enabling decoded cache (capacity {})", capacity);
        self.decoded = Some(BoundedCache::new(capacity));
        self.reset_repeats();
    }

    /// Switch the decoded table off and drain the raw table.
    pub fn disable(&mut self) {
        self.decoded = None;
        if let Some(mut raw) = self.raw.take() {
            debug!("Draining raw cache ({} records)", raw.len());
            raw.clear();
        }
        self.reset_repeats();
    }

    /// Empty both tables without changing which are switched on.
    pub fn clear(&mut self) {
        if let Some(decoded) = self.decoded.as_mut() {
            decoded.clear();
        }
        if let Some(raw) = self.raw.as_mut() {
            raw.clear();
        }
        self.reset_repeats();
    }

    /// Whether the decoded table was enabled.
    pub fn is_enabled(&self) -> bool {
        self.decoded.is_some()
    }

    /// Whether the raw table is on.
    pub fn is_raw_active(&self) -> bool {
        self.raw.is_some()
    }

    /// Entries in the decoded table.
    pub fn decoded_len(&self) -> usize {
        self.decoded.as_ref().map_or(0, BoundedCache::len)
    }

    /// Entries in the raw table.
    pub fn raw_len(&self) -> usize {
        self.raw.as_ref().map_or(0, BoundedCache::len)
    }

    /// Indices in the decoded table, oldest first.
    pub fn decoded_indices(&self) -> Vec<usize> {
        self.decoded
            .as_ref()
            .map(|table| table.indices().collect())
            .unwrap_or_default()
    }

    /// Counters so far.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Decoded spectrum for `index`, reading through `source` on a miss.
    ///
    /// A cached spectrum without arrays does not satisfy `want_arrays`.
    pub fn get_or_load(
        &mut self,
        source: &dyn RecordSource,
        index: usize,
        want_arrays: bool,
    ) -> Result<DecodedSpectrum, SourceError> {
        if let Some(table) = self.decoded.as_ref() {
            if let Some(hit) = table.get(index).filter(|s| !want_arrays || s.has_arrays()) {
                self.stats.decoded_hits += 1;
                return Ok(hit.clone());
            }
            self.stats.decoded_misses += 1;
        }

        let tier = if want_arrays {
            DetailTier::FullData
        } else {
            DetailTier::MAX_METADATA
        };
        let spectrum = self.with_record(source, index, tier, DecodedSpectrum::from_record)?;

        if let Some(table) = self.decoded.as_mut() {
            if let Some(evicted) = table.insert(index, spectrum.clone()) {
                self.stats.evictions += 1;
                debug!("Decoded cache evicted index {}", evicted);
            }
        }
        Ok(spectrum)
    }

    /// Run `f` on the record at `index` read at `tier` or better.
    ///
    /// A raw-table entry read at a lower tier is a miss. Records read from the
    /// source are kept when the raw table is on and released otherwise.
    pub fn with_record<T, F>(
        &mut self,
        source: &dyn RecordSource,
        index: usize,
        tier: DetailTier,
        f: F,
    ) -> Result<T, SourceError>
    where
        F: FnOnce(&Record) -> T,
    {
        self.note_request(index);

        if let Some(record) = self.raw.as_ref().and_then(|raw| raw.get(index)) {
            if record.tier >= tier {
                self.stats.raw_hits += 1;
                return Ok(f(record));
            }
        }

        let mut record = source.read(index, tier)?;
        self.stats.source_reads += 1;
        let value = f(&record);

        if self.raw.is_none() && self.is_hot() {
            debug!(
                "Index {} requested {} times in a row, activating raw cache",
                index, self.repeat_count
            );
            self.raw = Some(BoundedCache::new(1));
            self.stats.hot_activations += 1;
        }

        match self.raw.as_mut() {
            Some(raw) => {
                if raw.insert(index, record).is_some() {
                    self.stats.evictions += 1;
                }
            }
            None => record.release_logged(),
        }
        Ok(value)
    }

    fn note_request(&mut self, index: usize) {
        if self.decoded.is_some() {
            return;
        }
        if self.last_raw_index == Some(index) {
            self.repeat_count += 1;
        } else {
            self.last_raw_index = Some(index);
            self.repeat_count = 1;
        }
    }

    fn is_hot(&self) -> bool {
        self.decoded.is_none() && self.repeat_count >= self.hot_index_threshold
    }

    fn reset_repeats(&mut self) {
        self.last_raw_index = None;
        self.repeat_count = 0;
    }
}
