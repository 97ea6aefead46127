//! Decoded, resource-free spectra.

use std::sync::Arc;

use crate::source::{MobilityFields, Precursor, Record};

/// Owned projection of a [`Record`] with no native resource behind it.
///
/// Arrays are reference counted so clones handed out of the cache stay cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSpectrum {
    /// 0-based index in the source
    pub index: usize,
    /// Native identifier
    pub id: String,
    /// MS level
    pub level: Option<u8>,
    /// Start time in minutes
    pub start_time: Option<f64>,
    /// Ion mobility
    pub mobility: Option<MobilityFields>,
    /// Precursors; empty for survey scans
    pub precursors: Vec<Precursor>,
    /// Scan description
    pub scan_description: Option<String>,
    /// Vendor function number
    pub function: Option<u32>,
    /// Whether the arrays hold centroided peaks
    pub centroided: bool,
    /// m/z values, when decoded with data
    pub mz: Option<Arc<[f64]>>,
    /// Intensities, when decoded with data
    pub intensity: Option<Arc<[f64]>>,
}

impl DecodedSpectrum {
    /// Copy every field out of a record.
    pub fn from_record(record: &Record) -> Self {
        Self {
            index: record.index,
            id: record.id.clone(),
            level: record.level,
            start_time: record.start_time,
            mobility: record.mobility,
            precursors: record.precursors.clone(),
            scan_description: record.scan_description.clone(),
            function: record.function_number(),
            centroided: record.centroided,
            mz: record.mz.as_deref().map(Arc::from),
            intensity: record.intensity.as_deref().map(Arc::from),
        }
    }

    /// Whether both value arrays were decoded.
    pub fn has_arrays(&self) -> bool {
        self.mz.is_some() && self.intensity.is_some()
    }

    /// Number of data points, 0 without arrays.
    pub fn peak_count(&self) -> usize {
        self.mz.as_ref().map_or(0, |mz| mz.len())
    }

    /// Sum of intensities, 0 without arrays.
    pub fn total_intensity(&self) -> f64 {
        self.intensity.as_ref().map_or(0.0, |values| values.iter().sum())
    }
}
