//! # Record Sources
//!
//! The boundary to the external decoding engine. A [`RecordSource`] is an
//! indexed, 0-based sequence of [`Record`]s that can be read at several
//! [`DetailTier`]s; the cheaper tiers leave expensive fields unset.
//!
//! The engine also owns every scientific algorithm this crate can apply
//! (peak picking, reference-mass correction, mobility conversion). Sources
//! expose them as processors; the [`pipeline`](crate::pipeline) decides only
//! whether and in which order to run them.

mod error;
pub mod memory;
mod record;

use std::fmt;
use std::path::Path;
use std::rc::Rc;

pub use error::SourceError;
pub use memory::{MemoryRecord, MemorySource, ReadLog};
pub use record::{MobilityFields, MobilityUnit, NativeHandle, Precursor, Record};

/// Cost/completeness level of a read.
///
/// A higher tier costs more and never reports less than a lower one.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DetailTier {
    /// Identity and whatever the engine has indexed already
    #[default]
    Instant,
    /// Metadata that is cheap to decode
    Fast,
    /// All metadata
    Full,
    /// All metadata plus the value arrays
    FullData,
}

impl DetailTier {
    /// Every tier, cheapest first.
    pub const ALL: [DetailTier; 4] = [
        DetailTier::Instant,
        DetailTier::Fast,
        DetailTier::Full,
        DetailTier::FullData,
    ];

    /// Highest tier used for metadata-only queries.
    pub const MAX_METADATA: DetailTier = DetailTier::Full;

    /// The next more expensive tier.
    pub fn next(self) -> Option<DetailTier> {
        match self {
            DetailTier::Instant => Some(DetailTier::Fast),
            DetailTier::Fast => Some(DetailTier::Full),
            DetailTier::Full => Some(DetailTier::FullData),
            DetailTier::FullData => None,
        }
    }

    /// Whether records read at this tier carry m/z and intensity arrays.
    pub fn includes_arrays(self) -> bool {
        self == DetailTier::FullData
    }
}

impl fmt::Display for DetailTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetailTier::Instant => "instant",
            DetailTier::Fast => "fast",
            DetailTier::Full => "full",
            DetailTier::FullData => "full+data",
        };
        f.write_str(name)
    }
}

/// Instrument vendor behind a source, as far as access quirks are concerned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum VendorFamily {
    /// Vendor not known or not relevant
    #[default]
    Unknown,
    /// Agilent MassHunter
    Agilent,
    /// Bruker timsTOF / BAF
    Bruker,
    /// SCIEX WIFF
    Sciex,
    /// Thermo RAW
    Thermo,
    /// Waters MassLynx RAW (reference lock functions)
    Waters,
}

/// Secondary trace that is not an indexed record, e.g. a TIC.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateTrace {
    /// Native trace identifier
    pub id: String,
    /// Time points in minutes
    pub times: Vec<f64>,
    /// Intensity at each time point
    pub intensities: Vec<f64>,
}

impl AggregateTrace {
    /// Build a trace from parallel arrays.
    pub fn new(id: impl Into<String>, times: Vec<f64>, intensities: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            times,
            intensities,
        }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the trace has no points.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Reference-mass ("lockmass") correction parameters.
///
/// All-zero masses mean no correction.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReferenceMassParams {
    /// Reference m/z for positive-mode scans
    pub positive: f64,
    /// Reference m/z for negative-mode scans
    pub negative: f64,
    /// Match tolerance in m/z
    pub tolerance: f64,
}

impl Default for ReferenceMassParams {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl ReferenceMassParams {
    /// Default tolerance used when only masses are given.
    pub const DEFAULT_TOLERANCE: f64 = 0.1;

    /// Parameters with the default tolerance.
    pub fn new(positive: f64, negative: f64) -> Self {
        Self {
            positive,
            negative,
            tolerance: Self::DEFAULT_TOLERANCE,
        }
    }

    /// Whether no reference mass is set.
    pub fn is_empty(&self) -> bool {
        self.positive == 0.0 && self.negative == 0.0
    }
}

/// Peak picker provided by the engine.
pub trait PeakPicker: fmt::Debug {
    /// Short algorithm name for logs.
    fn name(&self) -> &str;

    /// Replace the record's profile arrays by picked peaks.
    fn pick(&self, record: &mut Record) -> Result<(), SourceError>;
}

/// Reference-mass corrector provided by the engine.
pub trait ReferenceMassCorrector: fmt::Debug {
    /// Adjust the record's m/z axis against the reference signal.
    fn correct(&self, record: &mut Record, params: &ReferenceMassParams) -> Result<(), SourceError>;
}

/// Ion mobility support provided by the engine.
pub trait MobilityConverter: fmt::Debug {
    /// Unit the normalized mobility values are expressed in.
    fn unit(&self) -> MobilityUnit;

    /// Rewrite the record's mobility fields into [`unit`](Self::unit).
    ///
    /// `combine` asks for one record per frame instead of one per mobility bin.
    fn normalize(&self, record: &mut Record, combine: bool) -> Result<(), SourceError>;

    /// Whether collisional cross-section conversion is calibrated for this file.
    fn can_convert_ccs(&self) -> bool {
        false
    }

    /// CCS (Å²) for a mobility value, if convertible.
    fn ccs_from_mobility(&self, _mobility: f64, _mz: f64, _charge: i32) -> Option<f64> {
        None
    }

    /// Mobility value for a CCS (Å²), if convertible.
    fn mobility_from_ccs(&self, _ccs: f64, _mz: f64, _charge: i32) -> Option<f64> {
        None
    }
}

/// Indexed access to the records of one opened file.
///
/// Implementations are single-threaded; decorators share the source they wrap.
pub trait RecordSource: fmt::Debug {
    /// Number of records.
    fn len(&self) -> usize;

    /// Whether the source holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one record at the requested tier.
    ///
    /// # Errors
    /// `SourceError::NotFound` for an out-of-range index,
    /// `SourceError::Unsupported` when the tier cannot be served for this file.
    fn read(&self, index: usize, tier: DetailTier) -> Result<Record, SourceError>;

    /// Read the aggregate trace at `channel` (0 is the total ion current).
    ///
    /// `full` requests the intensity array as well as the time axis.
    fn read_aggregate(&self, channel: usize, full: bool) -> Result<AggregateTrace, SourceError>;

    /// Vendor family of the underlying file.
    fn vendor(&self) -> VendorFamily {
        VendorFamily::Unknown
    }

    /// Whether records already combine all mobility bins of a frame.
    fn has_combined_mobility(&self) -> bool {
        false
    }

    /// Vendor peak picking, when the vendor library offers it.
    fn vendor_peak_picker(&self) -> Option<Rc<dyn PeakPicker>> {
        None
    }

    /// Engine-side generic peak picking.
    fn alternate_peak_picker(&self) -> Option<Rc<dyn PeakPicker>> {
        None
    }

    /// Reference-mass correction, when the file has a reference channel.
    fn reference_mass_corrector(&self) -> Option<Rc<dyn ReferenceMassCorrector>> {
        None
    }

    /// Mobility support, when the file has an ion mobility dimension.
    fn mobility_converter(&self) -> Option<Rc<dyn MobilityConverter>> {
        None
    }
}

/// Opens files with the external decoding engine.
pub trait SourceOpener {
    /// Open `path` and return its record source.
    fn open(&self, path: &Path) -> Result<Rc<dyn RecordSource>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_order() {
        assert!(DetailTier::Instant < DetailTier::Fast);
        assert!(DetailTier::Fast < DetailTier::Full);
        assert!(DetailTier::Full < DetailTier::FullData);
        assert_eq!(DetailTier::MAX_METADATA, DetailTier::Full);
        assert!(DetailTier::FullData.includes_arrays());
        assert!(!DetailTier::Full.includes_arrays());
    }

    #[test]
    fn test_tier_next_walks_every_tier() {
        let mut walked = vec![DetailTier::Instant];
        while let Some(next) = walked.last().and_then(|t| t.next()) {
            walked.push(next);
        }
        assert_eq!(walked, DetailTier::ALL.to_vec());
    }

    #[test]
    fn test_reference_mass_params_empty() {
        assert!(ReferenceMassParams::default().is_empty());
        assert!(!ReferenceMassParams::new(556.2771, 0.0).is_empty());
        assert!(!ReferenceMassParams::new(0.0, 554.2615).is_empty());
    }
}
