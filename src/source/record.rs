//! Records handed out by a [`RecordSource`](super::RecordSource).

use std::fmt;

use log::warn;

use super::{DetailTier, SourceError};

/// A resource owned by the decoding engine that must be given back explicitly.
pub trait NativeHandle: fmt::Debug {
    /// Return the resource to the engine.
    fn release(&mut self) -> Result<(), SourceError>;
}

/// Unit of an ion mobility value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MobilityUnit {
    /// No ion mobility dimension
    #[default]
    None,
    /// Drift time in milliseconds (MS:1002476)
    DriftTimeMsec,
    /// Inverse reduced ion mobility in Vs/cm² (MS:1002815)
    InverseK0VsecPerCm2,
    /// FAIMS compensation voltage in volts (MS:1001581)
    CompensationVoltage,
}

impl fmt::Display for MobilityUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MobilityUnit::None => "none",
            MobilityUnit::DriftTimeMsec => "drift time (ms)",
            MobilityUnit::InverseK0VsecPerCm2 => "1/K0 (Vs/cm²)",
            MobilityUnit::CompensationVoltage => "compensation voltage (V)",
        };
        f.write_str(name)
    }
}

/// Ion mobility value reported for a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MobilityFields {
    /// Mobility value in `unit`
    pub value: f64,
    /// Unit of `value`
    pub unit: MobilityUnit,
    /// Drift time offset applied to high-energy (fragment) scans, if any
    pub high_energy_offset: Option<f64>,
}

impl MobilityFields {
    /// Mobility value without a high-energy offset.
    pub fn new(value: f64, unit: MobilityUnit) -> Self {
        Self {
            value,
            unit,
            high_energy_offset: None,
        }
    }
}

/// Precursor ion of a fragmentation record.
#[derive(Debug, Clone, PartialEq)]
pub struct Precursor {
    /// Selected ion m/z
    pub mz: f64,
    /// Charge state, when known
    pub charge: Option<i32>,
    /// Selected ion intensity
    pub intensity: Option<f64>,
    /// Isolation window lower offset
    pub isolation_lower: Option<f64>,
    /// Isolation window upper offset
    pub isolation_upper: Option<f64>,
    /// Collision energy in eV
    pub collision_energy: Option<f64>,
}

impl Precursor {
    /// Precursor with only an m/z.
    pub fn new(mz: f64) -> Self {
        Self {
            mz,
            charge: None,
            intensity: None,
            isolation_lower: None,
            isolation_upper: None,
            collision_energy: None,
        }
    }

    /// Set the charge state.
    pub fn with_charge(mut self, charge: i32) -> Self {
        self.charge = Some(charge);
        self
    }
}

/// One indexed record read from a source.
///
/// Optional fields are `None` when the tier the record was read at does not
/// carry them. A record may own a [`NativeHandle`]; it is released exactly once,
/// either through [`Record::release`] or, failing that, when the record is dropped.
#[derive(Debug)]
pub struct Record {
    /// 0-based position in the source
    pub index: usize,
    /// Native identifier string
    pub id: String,
    /// MS level (1, 2, ...)
    pub level: Option<u8>,
    /// Scan start time in minutes
    pub start_time: Option<f64>,
    /// Ion mobility of the whole record
    pub mobility: Option<MobilityFields>,
    /// Precursor list; empty when absent
    pub precursors: Vec<Precursor>,
    /// Free-text scan description (filter line)
    pub scan_description: Option<String>,
    /// Vendor acquisition function number
    pub function: Option<u32>,
    /// Whether the arrays hold centroided peaks
    pub centroided: bool,
    /// m/z values, present at [`DetailTier::FullData`]
    pub mz: Option<Vec<f64>>,
    /// Intensities, present at [`DetailTier::FullData`]
    pub intensity: Option<Vec<f64>>,
    /// Tier this record was read at
    pub tier: DetailTier,
    handle: Option<Box<dyn NativeHandle>>,
}

impl Record {
    /// Empty record with only an identity.
    pub fn new(index: usize, id: impl Into<String>, tier: DetailTier) -> Self {
        Self {
            index,
            id: id.into(),
            level: None,
            start_time: None,
            mobility: None,
            precursors: Vec::new(),
            scan_description: None,
            function: None,
            centroided: false,
            mz: None,
            intensity: None,
            tier,
            handle: None,
        }
    }

    /// Attach the engine resource backing this record.
    pub fn with_handle(mut self, handle: Box<dyn NativeHandle>) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Whether the native resource is still held.
    pub fn holds_native_handle(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether both value arrays are loaded.
    pub fn has_arrays(&self) -> bool {
        self.mz.is_some() && self.intensity.is_some()
    }

    /// Vendor function number, falling back to a `function=N` token in the id.
    pub fn function_number(&self) -> Option<u32> {
        self.function.or_else(|| parse_function_token(&self.id))
    }

    /// Give the native resource back to the engine. Later calls are no-ops.
    pub fn release(&mut self) -> Result<(), SourceError> {
        match self.handle.take() {
            Some(mut handle) => handle.release(),
            None => Ok(()),
        }
    }

    /// Release, logging a failure instead of returning it.
    pub(crate) fn release_logged(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to release record {} ({}): {}", self.index, self.id, e);
        }
    }
}

impl Drop for Record {
    fn drop(&mut self) {
        if self.handle.is_some() {
            warn!("Record {} dropped while holding a native handle", self.index);
            self.release_logged();
        }
    }
}

fn parse_function_token(id: &str) -> Option<u32> {
    id.split_whitespace()
        .find_map(|token| token.strip_prefix("function="))
        .and_then(|value| value.parse().ok())
}
