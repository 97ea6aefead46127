//! # Spectrum Accessor
//!
//! Random access to the spectra of one opened file. The accessor ties the
//! pieces together:
//!
//! - the [`PipelineComposer`] supplies the decorated source,
//! - the [`RecordCache`] answers repeated requests,
//! - the [`EscalationResolver`] finds the cheapest tier that carries a field.
//!
//! Per-index queries go cache → pipeline read → field extraction. Aggregate
//! queries read the source directly on every call and never touch the cache.
//!
//! ## Example
//!
//! ```rust
//! use std::rc::Rc;
//! use mzaccess::prelude::*;
//!
//! let source = MemorySource::new(vec![
//!     MemoryRecord::new("scan=1").level(1).start_time(0.25).peaks(vec![400.2], vec![1e4]),
//!     MemoryRecord::new("scan=2").level(2).start_time(0.26),
//! ]);
//! let mut accessor = SpectrumAccessor::new(Rc::new(source), AccessorConfig::default())?;
//!
//! assert_eq!(accessor.len(), 2);
//! assert_eq!(accessor.level(1)?, Some(2));
//! assert_eq!(accessor.mz_array(0)?.as_deref(), Some(&[400.2][..]));
//! # Ok::<(), mzaccess::accessor::AccessError>(())
//! ```
//!
//! ## Changing filters
//!
//! [`set_pipeline_config`](SpectrumAccessor::set_pipeline_config) and
//! [`redo_filters`](SpectrumAccessor::redo_filters) only mark the pipeline
//! dirty; it is rebuilt on the next access. Cached spectra are kept, so call
//! [`clear_cache`](SpectrumAccessor::clear_cache) when entries decoded under
//! the old settings must not be served.

mod cancel;
mod config;
mod error;


pub use cancel::CancellationToken;
pub use config::{AccessorConfig, CacheConfig};
pub use error::AccessError;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use log::{debug, info};

use crate::cache::{CacheStats, RecordCache};
use crate::escalation::{EscalationResolver, FieldKind};
use crate::pipeline::{PipelineComposer, PipelineConfig, PipelineFacts};
use crate::source::{
    AggregateTrace, DetailTier, MobilityFields, MobilityUnit, Precursor, Record, RecordSource, SourceError,
    SourceOpener,
};
use crate::spectrum::DecodedSpectrum;

/// Indexed access to the spectra of one file.
///
/// Getters take `&mut self`: every query may update the cache and the
/// escalation floors.
#[derive(Debug)]
pub struct SpectrumAccessor {
    // Declared first so cached records are released before the source goes away
    cache: RecordCache,
    escalation: EscalationResolver,
    pipeline: PipelineComposer,
    id_index: Option<HashMap<String, usize>>,
    path: Option<PathBuf>,
}

impl SpectrumAccessor {
    /// Open `path` with the decoding engine behind `opener`.
    pub fn open(opener: &dyn SourceOpener, path: &Path, config: AccessorConfig) -> Result<Self, AccessError> {
        let source = opener.open(path)?;
        info!("Opened {} ({} records)", path.display(), source.len());
        let mut accessor = Self::new(source, config)?;
        accessor.path = Some(path.to_path_buf());
        Ok(accessor)
    }

    /// Accessor over an already opened source.
    pub fn new(source: Rc<dyn RecordSource>, config: AccessorConfig) -> Result<Self, AccessError> {
        config.validate()?;
        let AccessorConfig {
            pipeline,
            cache: cache_config,
        } = config;

        let mut cache = RecordCache::new(cache_config.hot_index_threshold);
        if cache_config.enabled {
            cache.enable(Some(cache_config.capacity));
        }

        Ok(Self {
            cache,
            escalation: EscalationResolver::new(),
            pipeline: PipelineComposer::new(source, pipeline)?,
            id_index: None,
            path: None,
        })
    }

    /// Path the accessor was opened from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of spectra.
    pub fn len(&self) -> usize {
        self.pipeline.root().len()
    }

    /// Whether the file holds no spectra.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ------------------------------------------------------------------
    // Per-index queries
    // ------------------------------------------------------------------

    /// Native identifier of a spectrum.
    pub fn id(&mut self, index: usize) -> Result<String, AccessError> {
        let source = self.pipeline.effective_source()?;
        if self.cache.is_enabled() {
            return Ok(self.cache.get_or_load(source.as_ref(), index, false)?.id);
        }
        Ok(self
            .cache
            .with_record(source.as_ref(), index, DetailTier::Instant, |record| record.id.clone())?)
    }

    /// MS level, `None` when the file does not report one.
    pub fn level(&mut self, index: usize) -> Result<Option<u8>, AccessError> {
        self.metadata(index, FieldKind::Level, |fields| fields.level(), Option::is_some)
    }

    /// Scan start time in minutes.
    pub fn start_time(&mut self, index: usize) -> Result<Option<f64>, AccessError> {
        self.metadata(index, FieldKind::StartTime, |fields| fields.start_time(), Option::is_some)
    }

    /// Ion mobility of the spectrum, normalized by the pipeline.
    pub fn mobility(&mut self, index: usize) -> Result<Option<MobilityFields>, AccessError> {
        self.metadata(index, FieldKind::Mobility, |fields| fields.mobility(), Option::is_some)
    }

    /// Scan description (filter line).
    pub fn scan_description(&mut self, index: usize) -> Result<Option<String>, AccessError> {
        self.metadata(
            index,
            FieldKind::ScanDescription,
            |fields| fields.scan_description().map(str::to_owned),
            Option::is_some,
        )
    }

    /// Precursors of a fragment spectrum; empty for survey scans.
    pub fn precursors(&mut self, index: usize) -> Result<Vec<Precursor>, AccessError> {
        if self.level(index)? == Some(1) {
            return Ok(Vec::new());
        }
        self.metadata(
            index,
            FieldKind::Precursors,
            |fields| fields.precursors().to_vec(),
            |precursors| !precursors.is_empty(),
        )
    }

    /// Decoded spectrum, with arrays when `want_arrays` is set.
    pub fn spectrum(&mut self, index: usize, want_arrays: bool) -> Result<DecodedSpectrum, AccessError> {
        let source = self.pipeline.effective_source()?;
        Ok(self.cache.get_or_load(source.as_ref(), index, want_arrays)?)
    }

    /// m/z array after every decorator has run.
    pub fn mz_array(&mut self, index: usize) -> Result<Option<Arc<[f64]>>, AccessError> {
        Ok(self.spectrum(index, true)?.mz)
    }

    /// Intensity array after every decorator has run.
    pub fn intensity_array(&mut self, index: usize) -> Result<Option<Arc<[f64]>>, AccessError> {
        Ok(self.spectrum(index, true)?.intensity)
    }

    /// Whether the spectrum's arrays hold centroided peaks.
    pub fn is_centroided(&mut self, index: usize) -> Result<bool, AccessError> {
        Ok(self.spectrum(index, true)?.centroided)
    }

    /// Whether the spectrum belongs to the excluded reference lock function.
    pub fn is_reference_lock_record(&mut self, index: usize) -> Result<bool, AccessError> {
        let Some(lock) = self.pipeline.facts()?.reference_lock_function else {
            return Ok(false);
        };
        let source = self.pipeline.effective_source()?;
        let function = self
            .cache
            .with_record(source.as_ref(), index, DetailTier::Instant, Record::function_number)?;
        Ok(function == Some(lock))
    }

    /// Index of the spectrum with native identifier `id`.
    ///
    /// The identifier map is built on first use with one cheap read per spectrum.
    pub fn index_of(&mut self, id: &str) -> Result<usize, AccessError> {
        if self.id_index.is_none() {
            self.id_index = Some(self.build_id_index()?);
        }
        self.id_index
            .as_ref()
            .and_then(|ids| ids.get(id).copied())
            .ok_or_else(|| AccessError::NotFound(format!("no spectrum with id '{id}'")))
    }

    // ------------------------------------------------------------------
    // Bulk walks and aggregate traces
    // ------------------------------------------------------------------

    /// Start times and levels of every spectrum.
    ///
    /// On error or cancellation the output vectors hold partial results and
    /// must be discarded.
    pub fn scan_times_and_levels(
        &mut self,
        cancel: &CancellationToken,
        times: &mut Vec<Option<f64>>,
        levels: &mut Vec<Option<u8>>,
    ) -> Result<(), AccessError> {
        times.clear();
        levels.clear();
        let count = self.len();
        times.reserve(count);
        levels.reserve(count);

        for index in 0..count {
            cancel.check()?;
            times.push(self.start_time(index)?);
            levels.push(self.level(index)?);
        }
        Ok(())
    }

    /// Aggregate trace at `channel`, `None` when the file has none there.
    pub fn aggregate_trace(&mut self, channel: usize) -> Result<Option<AggregateTrace>, AccessError> {
        let source = self.pipeline.effective_source()?;
        not_found_as_none(source.read_aggregate(channel, true))
    }

    /// Time axis of the first aggregate trace.
    pub fn first_aggregate_times(&mut self) -> Result<Option<Vec<f64>>, AccessError> {
        let source = self.pipeline.effective_source()?;
        Ok(not_found_as_none(source.read_aggregate(0, false))?.map(|trace| trace.times))
    }

    /// Intensities of the first aggregate trace.
    pub fn first_aggregate_intensities(&mut self) -> Result<Option<Vec<f64>>, AccessError> {
        let source = self.pipeline.effective_source()?;
        Ok(not_found_as_none(source.read_aggregate(0, true))?.map(|trace| trace.intensities))
    }

    /// Summed intensity over time for one vendor function.
    ///
    /// `None` for the reference lock function and for functions with no spectra.
    pub fn function_trace(
        &mut self,
        function: u32,
        cancel: &CancellationToken,
    ) -> Result<Option<AggregateTrace>, AccessError> {
        if self.pipeline.facts()?.reference_lock_function == Some(function) {
            debug!("Function {} is the reference lock function, no trace", function);
            return Ok(None);
        }

        let (times, intensities) = self.sum_intensities(cancel, |f| f == Some(function))?;
        if times.is_empty() {
            return Ok(None);
        }
        Ok(Some(AggregateTrace::new(format!("function={function} TIC"), times, intensities)))
    }

    /// Total ion current over every spectrum outside the reference lock function.
    pub fn total_ion_current(&mut self, cancel: &CancellationToken) -> Result<AggregateTrace, AccessError> {
        let lock = self.pipeline.facts()?.reference_lock_function;
        let (times, intensities) = self.sum_intensities(cancel, |f| lock.is_none() || f != lock)?;
        Ok(AggregateTrace::new("TIC", times, intensities))
    }

    // ------------------------------------------------------------------
    // Ion mobility
    // ------------------------------------------------------------------

    /// Unit of reported mobility values.
    pub fn mobility_unit(&mut self) -> Result<MobilityUnit, AccessError> {
        Ok(self.pipeline.facts()?.mobility_unit)
    }

    /// Whether mobility and CCS can be converted into each other.
    pub fn has_ccs_conversion(&mut self) -> Result<bool, AccessError> {
        Ok(self.pipeline.facts()?.ccs_convertible)
    }

    /// Collisional cross-section (Å²) for a mobility value.
    pub fn ccs_from_mobility(&mut self, mobility: f64, mz: f64, charge: i32) -> Result<Option<f64>, AccessError> {
        Ok(self
            .pipeline
            .mobility_converter()?
            .filter(|converter| converter.can_convert_ccs())
            .and_then(|converter| converter.ccs_from_mobility(mobility, mz, charge)))
    }

    /// Mobility value for a collisional cross-section (Å²).
    pub fn mobility_from_ccs(&mut self, ccs: f64, mz: f64, charge: i32) -> Result<Option<f64>, AccessError> {
        Ok(self
            .pipeline
            .mobility_converter()?
            .filter(|converter| converter.can_convert_ccs())
            .and_then(|converter| converter.mobility_from_ccs(ccs, mz, charge)))
    }

    // ------------------------------------------------------------------
    // Cache and pipeline control
    // ------------------------------------------------------------------

    /// Switch the decoded cache on with an empty table.
    pub fn enable_cache(&mut self, capacity: Option<usize>) {
        self.cache.enable(capacity);
    }

    /// Switch the decoded cache off and release every cached record.
    pub fn disable_cache(&mut self) {
        self.cache.disable();
    }

    /// Drop every cached entry, keeping the cache switched on or off.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Whether the decoded cache is on.
    pub fn is_cache_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    /// Cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Current pipeline settings.
    pub fn pipeline_config(&self) -> &PipelineConfig {
        self.pipeline.config()
    }

    /// Replace the pipeline settings; the pipeline is rebuilt on next access.
    pub fn set_pipeline_config(&mut self, config: PipelineConfig) -> Result<(), AccessError> {
        Ok(self.pipeline.set_config(config)?)
    }

    /// Rebuild the pipeline on next access.
    pub fn redo_filters(&mut self) {
        self.pipeline.invalidate();
    }

    /// Whether the next access rebuilds the pipeline.
    pub fn is_pipeline_dirty(&self) -> bool {
        self.pipeline.is_dirty()
    }

    /// What the last pipeline build found, building it if needed.
    pub fn pipeline_facts(&mut self) -> Result<PipelineFacts, AccessError> {
        Ok(self.pipeline.facts()?.clone())
    }

    /// Escalation floors reached so far.
    pub fn escalation(&self) -> &EscalationResolver {
        &self.escalation
    }

    /// Release every cached record and close the accessor.
    pub fn close(mut self) {
        self.cache.disable();
        match &self.path {
            Some(path) => info!("Closed {}", path.display()),
            None => info!("Closed accessor ({} records)", self.len()),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn metadata<T, U>(
        &mut self,
        index: usize,
        kind: FieldKind,
        extract: fn(&dyn SpectrumFields) -> T,
        is_usable: U,
    ) -> Result<T, AccessError>
    where
        U: Fn(&T) -> bool,
    {
        let source = self.pipeline.effective_source()?;
        if self.cache.is_enabled() {
            let spectrum = self.cache.get_or_load(source.as_ref(), index, false)?;
            return Ok(extract(&spectrum));
        }

        let cache = &mut self.cache;
        let value = self.escalation.resolve(
            kind,
            |tier| cache.with_record(source.as_ref(), index, tier, |record| extract(record)),
            is_usable,
        )?;
        Ok(value)
    }

    fn build_id_index(&mut self) -> Result<HashMap<String, usize>, AccessError> {
        let source = self.pipeline.effective_source()?;
        let mut ids = HashMap::with_capacity(source.len());
        for index in 0..source.len() {
            let mut record = source.read(index, DetailTier::Instant)?;
            ids.entry(std::mem::take(&mut record.id)).or_insert(index);
            record.release_logged();
        }
        debug!("Built identifier index for {} spectra", ids.len());
        Ok(ids)
    }

    fn sum_intensities<P>(
        &mut self,
        cancel: &CancellationToken,
        include: P,
    ) -> Result<(Vec<f64>, Vec<f64>), AccessError>
    where
        P: Fn(Option<u32>) -> bool,
    {
        let source = self.pipeline.effective_source()?;
        let mut times = Vec::new();
        let mut intensities = Vec::new();

        for index in 0..source.len() {
            cancel.check()?;
            let mut record = source.read(index, DetailTier::FullData)?;
            if include(record.function_number()) {
                if let Some(time) = record.start_time {
                    times.push(time);
                    intensities.push(record.intensity.as_deref().map_or(0.0, |values| values.iter().sum()));
                }
            }
            record.release_logged();
        }
        Ok((times, intensities))
    }
}

fn not_found_as_none(result: Result<AggregateTrace, SourceError>) -> Result<Option<AggregateTrace>, AccessError> {
    match result {
        Ok(trace) => Ok(Some(trace)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Field view shared by raw records and decoded spectra.
trait SpectrumFields {
    fn level(&self) -> Option<u8>;
    fn start_time(&self) -> Option<f64>;
    fn mobility(&self) -> Option<MobilityFields>;
    fn scan_description(&self) -> Option<&str>;
    fn precursors(&self) -> &[Precursor];
}

macro_rules! impl_spectrum_fields {
    ($ty:ty) => {
        impl SpectrumFields for $ty {
            fn level(&self) -> Option<u8> {
                self.level
            }

            fn start_time(&self) -> Option<f64> {
                self.start_time
            }

            fn mobility(&self) -> Option<MobilityFields> {
                self.mobility
            }

            fn scan_description(&self) -> Option<&str> {
                self.scan_description.as_deref()
            }

            fn precursors(&self) -> &[Precursor] {
                &self.precursors
            }
        }
    };
}

impl_spectrum_fields!(Record);
impl_spectrum_fields!(DecodedSpectrum);
