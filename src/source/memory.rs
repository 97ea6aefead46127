//! In-memory record source.
//!
//! Serves records from owned data while behaving like a native engine: fields
//! can be hidden below a chosen tier, every read hands out a native handle, and
//! a shared [`ReadLog`] records reads and releases.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{
    AggregateTrace, DetailTier, MobilityConverter, MobilityFields, NativeHandle, PeakPicker,
    Precursor, Record, RecordSource, ReferenceMassCorrector, SourceError, VendorFamily,
};

/// Owned data for one record of a [`MemorySource`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryRecord {
    /// Native identifier
    pub id: String,
    /// MS level
    pub level: Option<u8>,
    /// Start time in minutes
    pub start_time: Option<f64>,
    /// Ion mobility
    pub mobility: Option<MobilityFields>,
    /// Precursors
    pub precursors: Vec<Precursor>,
    /// Scan description
    pub scan_description: Option<String>,
    /// Vendor function number
    pub function: Option<u32>,
    /// Whether the arrays are already centroided
    pub centroided: bool,
    /// m/z values
    pub mz: Vec<f64>,
    /// Intensities
    pub intensity: Vec<f64>,
}

impl MemoryRecord {
    /// Record with only an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set the MS level.
    pub fn level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }

    /// Set the start time in minutes.
    pub fn start_time(mut self, minutes: f64) -> Self {
        self.start_time = Some(minutes);
        self
    }

    /// Set the ion mobility.
    pub fn mobility(mut self, mobility: MobilityFields) -> Self {
        self.mobility = Some(mobility);
        self
    }

    /// Append a precursor.
    pub fn precursor(mut self, precursor: Precursor) -> Self {
        self.precursors.push(precursor);
        self
    }

    /// Set the scan description.
    pub fn scan_description(mut self, description: impl Into<String>) -> Self {
        self.scan_description = Some(description.into());
        self
    }

    /// Set the vendor function number.
    pub fn function(mut self, function: u32) -> Self {
        self.function = Some(function);
        self
    }

    /// Mark the arrays as centroided.
    pub fn centroided(mut self, centroided: bool) -> Self {
        self.centroided = centroided;
        self
    }

    /// Set the value arrays.
    pub fn peaks(mut self, mz: Vec<f64>, intensity: Vec<f64>) -> Self {
        self.mz = mz;
        self.intensity = intensity;
        self
    }
}

/// Cheapest tier at which each optional field is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldTiers {
    /// MS level
    pub level: DetailTier,
    /// Start time
    pub start_time: DetailTier,
    /// Ion mobility
    pub mobility: DetailTier,
    /// Precursor list
    pub precursors: DetailTier,
    /// Scan description
    pub scan_description: DetailTier,
}

impl FieldTiers {
    /// Every field first appears at `tier`.
    pub fn uniform(tier: DetailTier) -> Self {
        Self {
            level: tier,
            start_time: tier,
            mobility: tier,
            precursors: tier,
            scan_description: tier,
        }
    }
}

/// Shared record of what a [`MemorySource`] served.
#[derive(Debug, Default)]
pub struct ReadLog {
    reads: RefCell<Vec<(usize, DetailTier)>>,
    aggregate_reads: Cell<usize>,
    acquired: Cell<usize>,
    released: Cell<usize>,
}

impl ReadLog {
    /// Total record reads.
    pub fn read_count(&self) -> usize {
        self.reads.borrow().len()
    }

    /// Every read in order.
    pub fn reads(&self) -> Vec<(usize, DetailTier)> {
        self.reads.borrow().clone()
    }

    /// Reads of one index.
    pub fn reads_of(&self, index: usize) -> usize {
        self.reads.borrow().iter().filter(|(i, _)| *i == index).count()
    }

    /// Tiers requested for one index, in order.
    pub fn tiers_for(&self, index: usize) -> Vec<DetailTier> {
        self.reads
            .borrow()
            .iter()
            .filter(|(i, _)| *i == index)
            .map(|(_, tier)| *tier)
            .collect()
    }

    /// Aggregate trace reads.
    pub fn aggregate_reads(&self) -> usize {
        self.aggregate_reads.get()
    }

    /// Native handles handed out.
    pub fn acquired(&self) -> usize {
        self.acquired.get()
    }

    /// Native handles given back.
    pub fn released(&self) -> usize {
        self.released.get()
    }

    /// Handles handed out and not yet given back.
    pub fn outstanding(&self) -> usize {
        self.acquired.get() - self.released.get()
    }

    /// Forget every read; handle counters are kept.
    pub fn clear_reads(&self) {
        self.reads.borrow_mut().clear();
        self.aggregate_reads.set(0);
    }
}

#[derive(Debug)]
struct MemoryHandle {
    log: Rc<ReadLog>,
}

impl NativeHandle for MemoryHandle {
    fn release(&mut self) -> Result<(), SourceError> {
        self.log.released.set(self.log.released.get() + 1);
        Ok(())
    }
}

/// Record source backed by owned records.
#[derive(Debug, Default)]
pub struct MemorySource {
    records: Vec<MemoryRecord>,
    tiers: FieldTiers,
    aggregates: Vec<AggregateTrace>,
    vendor: VendorFamily,
    combined_mobility: bool,
    vendor_picker: Option<Rc<dyn PeakPicker>>,
    alternate_picker: Option<Rc<dyn PeakPicker>>,
    corrector: Option<Rc<dyn ReferenceMassCorrector>>,
    mobility: Option<Rc<dyn MobilityConverter>>,
    log: Rc<ReadLog>,
}

impl MemorySource {
    /// Source over `records`, every field visible at every tier.
    pub fn new(records: Vec<MemoryRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    /// Hide fields below the given tiers.
    pub fn with_field_tiers(mut self, tiers: FieldTiers) -> Self {
        self.tiers = tiers;
        self
    }

    /// Add an aggregate trace at the next channel.
    pub fn with_aggregate(mut self, trace: AggregateTrace) -> Self {
        self.aggregates.push(trace);
        self
    }

    /// Report a vendor family.
    pub fn with_vendor(mut self, vendor: VendorFamily) -> Self {
        self.vendor = vendor;
        self
    }

    /// Report combined-mobility records.
    pub fn with_combined_mobility(mut self, combined: bool) -> Self {
        self.combined_mobility = combined;
        self
    }

    /// Offer vendor peak picking.
    pub fn with_vendor_peak_picker(mut self, picker: Rc<dyn PeakPicker>) -> Self {
        self.vendor_picker = Some(picker);
        self
    }

    /// Offer generic peak picking.
    pub fn with_alternate_peak_picker(mut self, picker: Rc<dyn PeakPicker>) -> Self {
        self.alternate_picker = Some(picker);
        self
    }

    /// Offer reference-mass correction.
    pub fn with_reference_mass_corrector(mut self, corrector: Rc<dyn ReferenceMassCorrector>) -> Self {
        self.corrector = Some(corrector);
        self
    }

    /// Offer mobility normalization.
    pub fn with_mobility_converter(mut self, converter: Rc<dyn MobilityConverter>) -> Self {
        self.mobility = Some(converter);
        self
    }

    /// Handle to the shared read log.
    pub fn log(&self) -> Rc<ReadLog> {
        Rc::clone(&self.log)
    }

    /// The backing records.
    pub fn records(&self) -> &[MemoryRecord] {
        &self.records
    }
}

impl RecordSource for MemorySource {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn read(&self, index: usize, tier: DetailTier) -> Result<Record, SourceError> {
        let data = self.records.get(index).ok_or_else(|| {
            SourceError::NotFound(format!(
                "record index {} out of range ({} records)",
                index,
                self.records.len()
            ))
        })?;

        self.log.reads.borrow_mut().push((index, tier));
        self.log.acquired.set(self.log.acquired.get() + 1);

        let tiers = &self.tiers;
        let mut record = Record::new(index, data.id.clone(), tier).with_handle(Box::new(MemoryHandle {
            log: Rc::clone(&self.log),
        }));
        record.function = data.function;
        record.centroided = data.centroided;
        if tier >= tiers.level {
            record.level = data.level;
        }
        if tier >= tiers.start_time {
            record.start_time = data.start_time;
        }
        if tier >= tiers.mobility {
            record.mobility = data.mobility;
        }
        if tier >= tiers.precursors {
            record.precursors = data.precursors.clone();
        }
        if tier >= tiers.scan_description {
            record.scan_description = data.scan_description.clone();
        }
        if tier.includes_arrays() {
            record.mz = Some(data.mz.clone());
            record.intensity = Some(data.intensity.clone());
        }

        Ok(record)
    }

    fn read_aggregate(&self, channel: usize, full: bool) -> Result<AggregateTrace, SourceError> {
        self.log.aggregate_reads.set(self.log.aggregate_reads.get() + 1);
        let trace = self
            .aggregates
            .get(channel)
            .ok_or_else(|| SourceError::NotFound(format!("no aggregate trace at channel {channel}")))?;

        if full {
            Ok(trace.clone())
        } else {
            Ok(AggregateTrace::new(trace.id.clone(), trace.times.clone(), Vec::new()))
        }
    }

    fn vendor(&self) -> VendorFamily {
        self.vendor
    }

    fn has_combined_mobility(&self) -> bool {
        self.combined_mobility
    }

    fn vendor_peak_picker(&self) -> Option<Rc<dyn PeakPicker>> {
        self.vendor_picker.clone()
    }

    fn alternate_peak_picker(&self) -> Option<Rc<dyn PeakPicker>> {
        self.alternate_picker.clone()
    }

    fn reference_mass_corrector(&self) -> Option<Rc<dyn ReferenceMassCorrector>> {
        self.corrector.clone()
    }

    fn mobility_converter(&self) -> Option<Rc<dyn MobilityConverter>> {
        self.mobility.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_records() -> MemorySource {
        MemorySource::new(vec![
            MemoryRecord::new("scan=1")
                .level(1)
                .start_time(0.5)
                .peaks(vec![100.0, 200.0], vec![10.0, 20.0]),
            MemoryRecord::new("scan=2")
                .level(2)
                .start_time(0.6)
                .precursor(Precursor::new(450.2).with_charge(2)),
        ])
    }

    #[test]
    fn test_out_of_range_is_not_found() {
        let source = two_records();
        let err = source.read(2, DetailTier::Instant).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(source.log().read_count(), 0);
    }

    #[test]
    fn test_field_tiers_hide_fields() {
        let source = two_records().with_field_tiers(FieldTiers {
            start_time: DetailTier::Full,
            ..Default::default()
        });

        let cheap = source.read(0, DetailTier::Fast).unwrap();
        assert_eq!(cheap.level, Some(1));
        assert_eq!(cheap.start_time, None);
        assert!(!cheap.has_arrays());

        let full = source.read(0, DetailTier::FullData).unwrap();
        assert_eq!(full.start_time, Some(0.5));
        assert_eq!(full.mz.as_deref(), Some(&[100.0, 200.0][..]));
    }

    #[test]
    fn test_handles_are_counted() {
        let source = two_records();
        let log = source.log();

        let mut first = source.read(0, DetailTier::Instant).unwrap();
        let second = source.read(1, DetailTier::Full).unwrap();
        assert_eq!(log.outstanding(), 2);

        first.release().unwrap();
        assert_eq!(log.outstanding(), 1);
        drop(second);
        assert_eq!(log.outstanding(), 0);
        assert_eq!(log.tiers_for(1), vec![DetailTier::Full]);
    }

    #[test]
    fn test_aggregate_without_full_drops_intensities() {
        let source = two_records().with_aggregate(AggregateTrace::new(
            "TIC",
            vec![0.5, 0.6],
            vec![30.0, 0.0],
        ));

        let trace = source.read_aggregate(0, false).unwrap();
        assert_eq!(trace.times, vec![0.5, 0.6]);
        assert!(trace.intensities.is_empty());
        assert!(source.read_aggregate(1, true).unwrap_err().is_not_found());
        assert_eq!(source.log().aggregate_reads(), 2);
    }
}
