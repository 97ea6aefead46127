use std::fmt;

use serde::{Deserialize, Serialize};

use super::PipelineError;
use crate::source::ReferenceMassParams;

/// Settings that decide which decorators wrap the raw source.
///
/// ```toml
/// [pipeline]
/// vendor_centroid_ms1 = true
/// vendor_centroid_ms2 = true
/// combine_mobility_spectra = false
///
/// [pipeline.reference_mass]
/// positive = 556.2771
/// negative = 554.2615
/// tolerance = 0.1
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Centroid MS1 records with the vendor peak picker
    pub vendor_centroid_ms1: bool,
    /// Centroid MS2+ records with the vendor peak picker
    pub vendor_centroid_ms2: bool,
    /// Centroid every record with the engine's generic peak picker
    pub alternate_centroid: bool,
    /// Reference-mass correction; all-zero masses disable it
    pub reference_mass: ReferenceMassParams,
    /// Report one record per mobility frame instead of one per bin
    pub combine_mobility_spectra: bool,
}

impl PipelineConfig {
    /// Check that the requested decorators can coexist.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let vendor = self.vendor_centroid_ms1 || self.vendor_centroid_ms2;
        if vendor && self.alternate_centroid {
            return Err(PipelineError::Configuration(
                "vendor and alternate centroiding are mutually exclusive".to_string(),
            ));
        }

        let params = &self.reference_mass;
        if !params.is_empty() && (params.tolerance.is_nan() || params.tolerance <= 0.0) {
            return Err(PipelineError::Configuration(format!(
                "reference mass tolerance must be positive, got {}",
                params.tolerance
            )));
        }

        Ok(())
    }

    /// Ordered decorator descriptors, innermost first.
    ///
    /// Centroiding comes before reference-mass correction, which comes before
    /// mobility normalization. Normalization is always listed; the composer
    /// skips it when the source has no mobility dimension.
    pub fn decorators(&self) -> Result<Vec<Decorator>, PipelineError> {
        self.validate()?;

        let mut chain = Vec::with_capacity(3);
        if self.vendor_centroid_ms1 || self.vendor_centroid_ms2 {
            chain.push(Decorator::Centroid(CentroidMode::Vendor(LevelSelection {
                ms1: self.vendor_centroid_ms1,
                msn: self.vendor_centroid_ms2,
            })));
        } else if self.alternate_centroid {
            chain.push(Decorator::Centroid(CentroidMode::Alternate));
        }

        if !self.reference_mass.is_empty() {
            chain.push(Decorator::ReferenceMass(self.reference_mass));
        }

        chain.push(Decorator::MobilityNormalize {
            combine: self.combine_mobility_spectra,
        });
        Ok(chain)
    }
}

/// MS levels a centroid decorator applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSelection {
    /// Survey scans
    pub ms1: bool,
    /// Fragment scans (level 2 and up)
    pub msn: bool,
}

impl LevelSelection {
    /// Every level.
    pub const ALL: LevelSelection = LevelSelection { ms1: true, msn: true };

    /// Whether a record at `level` is selected. Unknown levels need both.
    pub fn contains(&self, level: Option<u8>) -> bool {
        match level {
            Some(1) => self.ms1,
            Some(_) => self.msn,
            None => self.ms1 && self.msn,
        }
    }
}

/// Which peak picker a centroid decorator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CentroidMode {
    /// Vendor library peak picking for the selected levels
    Vendor(LevelSelection),
    /// Engine-side generic peak picking for every level
    Alternate,
}

impl CentroidMode {
    /// Levels this mode applies to.
    pub fn levels(&self) -> LevelSelection {
        match self {
            CentroidMode::Vendor(levels) => *levels,
            CentroidMode::Alternate => LevelSelection::ALL,
        }
    }
}

/// One step of the decorator pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Decorator {
    /// Peak picking
    Centroid(CentroidMode),
    /// Reference-mass correction
    ReferenceMass(ReferenceMassParams),
    /// Mobility unit normalization
    MobilityNormalize {
        /// Combine mobility bins per frame
        combine: bool,
    },
}

impl fmt::Display for Decorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decorator::Centroid(CentroidMode::Vendor(levels)) => {
                write!(f, "centroid(vendor, ms1={}, msn={})", levels.ms1, levels.msn)
            }
            Decorator::Centroid(CentroidMode::Alternate) => write!(f, "centroid(alternate)"),
            Decorator::ReferenceMass(params) => write!(
                f,
                "reference-mass(+{}, -{}, tol={})",
                params.positive, params.negative, params.tolerance
            ),
            Decorator::MobilityNormalize { combine } => {
                write!(f, "mobility-normalize(combine={})", combine)
            }
        }
    }
}
