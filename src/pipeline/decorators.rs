//! Sources that wrap another source and transform its records.

use std::rc::Rc;

use log::trace;

use super::LevelSelection;
use crate::source::{
    AggregateTrace, DetailTier, MobilityConverter, PeakPicker, Record, RecordSource,
    ReferenceMassCorrector, ReferenceMassParams, SourceError, VendorFamily,
};

/// Everything except `read` passes straight through to `self.inner`.
macro_rules! delegate_to_inner {
    () => {
        fn len(&self) -> usize {
            self.inner.len()
        }

        fn read_aggregate(&self, channel: usize, full: bool) -> Result<AggregateTrace, SourceError> {
            self.inner.read_aggregate(channel, full)
        }

        fn vendor(&self) -> VendorFamily {
            self.inner.vendor()
        }

        fn has_combined_mobility(&self) -> bool {
            self.inner.has_combined_mobility()
        }

        fn vendor_peak_picker(&self) -> Option<Rc<dyn PeakPicker>> {
            self.inner.vendor_peak_picker()
        }

        fn alternate_peak_picker(&self) -> Option<Rc<dyn PeakPicker>> {
            self.inner.alternate_peak_picker()
        }

        fn reference_mass_corrector(&self) -> Option<Rc<dyn ReferenceMassCorrector>> {
            self.inner.reference_mass_corrector()
        }

        fn mobility_converter(&self) -> Option<Rc<dyn MobilityConverter>> {
            self.inner.mobility_converter()
        }
    };
}

/// Peak-picks profile records that carry arrays.
#[derive(Debug)]
pub struct CentroidSource {
    inner: Rc<dyn RecordSource>,
    picker: Rc<dyn PeakPicker>,
    levels: LevelSelection,
}

impl CentroidSource {
    /// Wrap `inner`, picking records at the selected levels.
    pub fn new(inner: Rc<dyn RecordSource>, picker: Rc<dyn PeakPicker>, levels: LevelSelection) -> Self {
        Self { inner, picker, levels }
    }
}

impl RecordSource for CentroidSource {
    fn read(&self, index: usize, tier: DetailTier) -> Result<Record, SourceError> {
        let mut record = self.inner.read(index, tier)?;
        if tier.includes_arrays() && !record.centroided && self.levels.contains(record.level) {
            trace!("Centroiding record {} with {}", index, self.picker.name());
            self.picker.pick(&mut record)?;
            record.centroided = true;
        }
        Ok(record)
    }

    delegate_to_inner!();
}

/// Applies reference-mass correction to records that carry arrays.
#[derive(Debug)]
pub struct ReferenceMassSource {
    inner: Rc<dyn RecordSource>,
    corrector: Rc<dyn ReferenceMassCorrector>,
    params: ReferenceMassParams,
}

impl ReferenceMassSource {
    /// Wrap `inner` with a corrector and its parameters.
    pub fn new(
        inner: Rc<dyn RecordSource>,
        corrector: Rc<dyn ReferenceMassCorrector>,
        params: ReferenceMassParams,
    ) -> Self {
        Self {
            inner,
            corrector,
            params,
        }
    }
}

impl RecordSource for ReferenceMassSource {
    fn read(&self, index: usize, tier: DetailTier) -> Result<Record, SourceError> {
        let mut record = self.inner.read(index, tier)?;
        if tier.includes_arrays() {
            self.corrector.correct(&mut record, &self.params)?;
        }
        Ok(record)
    }

    delegate_to_inner!();
}

/// Rewrites mobility values into the converter's unit.
#[derive(Debug)]
pub struct MobilitySource {
    inner: Rc<dyn RecordSource>,
    converter: Rc<dyn MobilityConverter>,
    combine: bool,
}

impl MobilitySource {
    /// Wrap `inner` with a mobility converter.
    pub fn new(inner: Rc<dyn RecordSource>, converter: Rc<dyn MobilityConverter>, combine: bool) -> Self {
        Self {
            inner,
            converter,
            combine,
        }
    }
}

impl RecordSource for MobilitySource {
    fn read(&self, index: usize, tier: DetailTier) -> Result<Record, SourceError> {
        let mut record = self.inner.read(index, tier)?;
        self.converter.normalize(&mut record, self.combine)?;
        Ok(record)
    }

    delegate_to_inner!();
}
