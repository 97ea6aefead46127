use anyhow::{Context, Result};
use log::info;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use mzaccess::accessor::{AccessorConfig, CancellationToken, SpectrumAccessor};
use mzaccess::escalation::FieldKind;
use mzaccess::pipeline::PipelineConfig;
use mzaccess::source::memory::FieldTiers;
use mzaccess::source::{
    DetailTier, MemoryRecord, MemorySource, MobilityConverter, MobilityFields, MobilityUnit, PeakPicker, Record,
    ReferenceMassCorrector, ReferenceMassParams, SourceError, VendorFamily,
};

use super::SessionReport;

/// Leucine enkephalin [M+H]+, the usual Waters lockspray reference
const LOCKSPRAY_MZ: f64 = 556.2771;

/// Lockspray scans are interleaved every this many scans
const LOCK_INTERVAL: usize = 10;

/// Walk a synthetic run through an accessor and print what happened
pub fn run(spectra: usize, config: Option<PathBuf>, cache: Option<usize>, json: bool) -> Result<()> {
    info!("mzaccess Demo - synthetic Waters-style run");
    info!("==========================================");

    let mut accessor_config = match config {
        Some(path) => AccessorConfig::from_file(&path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => demo_config(),
    };
    if let Some(capacity) = cache {
        accessor_config.cache.enabled = true;
        accessor_config.cache.capacity = capacity;
    }

    let source = build_demo_source(spectra);
    let log = source.log();
    let mut accessor =
        SpectrumAccessor::new(Rc::new(source), accessor_config).context("Failed to create accessor")?;
    info!("Synthetic run with {} spectra", accessor.len());

    let cancel = CancellationToken::new();
    let mut times = Vec::new();
    let mut levels = Vec::new();
    accessor
        .scan_times_and_levels(&cancel, &mut times, &mut levels)
        .context("Failed to walk scan times and levels")?;
    let ms1 = levels.iter().filter(|level| **level == Some(1)).count();
    let msn = levels.iter().filter(|level| matches!(level, Some(l) if *l > 1)).count();

    // Field-by-field probing of one spectrum, the pattern the raw cache adapts to
    if let Some(probe) = levels.iter().position(|level| *level == Some(2)) {
        for _ in 0..4 {
            accessor.level(probe)?;
            accessor.start_time(probe)?;
            accessor.mobility(probe)?;
            accessor.precursors(probe)?;
            accessor.scan_description(probe)?;
        }
        let peaks = accessor.mz_array(probe)?.map_or(0, |mz| mz.len());
        info!("Spectrum {} has {} peaks after processing", accessor.id(probe)?, peaks);
    }

    let tic = accessor
        .total_ion_current(&cancel)
        .context("Failed to compute total ion current")?;
    let facts = accessor.pipeline_facts().context("Failed to build pipeline")?;
    let escalation_floors = FieldKind::ALL
        .iter()
        .map(|kind| (format!("{:?}", kind), accessor.escalation().floor(*kind)))
        .collect::<BTreeMap<_, _>>();

    let report = SessionReport {
        source: format!("synthetic ({} spectra)", spectra),
        spectra: accessor.len(),
        ms1,
        msn,
        decorators: facts.applied.iter().map(ToString::to_string).collect(),
        mobility_unit: facts.mobility_unit,
        reference_lock_function: facts.reference_lock_function,
        tic_points: tic.len(),
        tic_apex: tic.intensities.iter().copied().fold(0.0, f64::max),
        escalation_floors,
        source_reads: log.read_count(),
        outstanding_handles: log.outstanding(),
        cache: accessor.cache_stats(),
    };
    accessor.close();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        #[cfg(feature = "colorized_output")]
        {
            println!("{}", report.format_colored());
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            println!("{}", report);
        }
    }

    Ok(())
}

fn demo_config() -> AccessorConfig {
    AccessorConfig {
        pipeline: PipelineConfig {
            vendor_centroid_ms1: true,
            vendor_centroid_ms2: true,
            reference_mass: ReferenceMassParams::new(LOCKSPRAY_MZ, 0.0),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Build a mock MSe run: function 1 low energy, function 2 high energy,
/// function 3 lockspray every [`LOCK_INTERVAL`] scans starting with scan 0.
fn build_demo_source(spectra: usize) -> MemorySource {
    let mut records = Vec::with_capacity(spectra);
    let mut scan_in_function = [0usize; 3];

    for index in 0..spectra {
        let time = index as f64 * 0.02;
        let function: u32 = if index % LOCK_INTERVAL == 0 {
            3
        } else if index % 2 == 1 {
            1
        } else {
            2
        };
        let slot = function as usize - 1;
        scan_in_function[slot] += 1;
        let id = format!("function={} process=0 scan={}", function, scan_in_function[slot]);

        let drift = 2.0 + (index as f64 * 0.37).sin().abs() * 8.0;
        let record = match function {
            3 => MemoryRecord::new(id)
                .level(1)
                .scan_description("Lockspray")
                .peaks_from_profile(&[(LOCKSPRAY_MZ + 0.004, 5e5)]),
            1 => MemoryRecord::new(id)
                .level(1)
                .scan_description("MSe low energy")
                .peaks_from_profile(&analyte_centroids(time, 1.0)),
            _ => MemoryRecord::new(id)
                .level(2)
                .scan_description("MSe high energy")
                .peaks_from_profile(&analyte_centroids(time, 0.4)),
        };
        records.push(
            record
                .start_time(time)
                .mobility(MobilityFields::new(drift, MobilityUnit::DriftTimeMsec)),
        );
    }

    MemorySource::new(records)
        .with_vendor(VendorFamily::Waters)
        .with_field_tiers(FieldTiers {
            level: DetailTier::Instant,
            start_time: DetailTier::Fast,
            mobility: DetailTier::Fast,
            precursors: DetailTier::Full,
            scan_description: DetailTier::Full,
        })
        .with_vendor_peak_picker(Rc::new(LocalMaximaPicker))
        .with_reference_mass_corrector(Rc::new(NearestPeakLockMass))
        .with_mobility_converter(Rc::new(DriftTimeConverter))
}

/// Centroids of a few co-eluting analytes at `time`
fn analyte_centroids(time: f64, energy_scale: f64) -> Vec<(f64, f64)> {
    (0..12)
        .map(|i| {
            let mz = 300.0 + i as f64 * 97.3 + (i as f64 * 0.123).sin() * 0.05;
            let elution = (-(time - 0.4 - i as f64 * 0.05).powi(2) / 0.02).exp();
            (mz, 1e5 * energy_scale * (0.1 + elution))
        })
        .collect()
}

trait ProfileExt {
    fn peaks_from_profile(self, centroids: &[(f64, f64)]) -> Self;
}

impl ProfileExt for MemoryRecord {
    /// Expand centroids into five-point profile peaks
    fn peaks_from_profile(self, centroids: &[(f64, f64)]) -> Self {
        const SHAPE: [(f64, f64); 5] = [(-0.02, 0.1), (-0.01, 0.5), (0.0, 1.0), (0.01, 0.5), (0.02, 0.1)];
        let mut mz = Vec::with_capacity(centroids.len() * SHAPE.len());
        let mut intensity = Vec::with_capacity(centroids.len() * SHAPE.len());
        for (center, height) in centroids {
            for (offset, scale) in SHAPE {
                mz.push(center + offset);
                intensity.push(height * scale);
            }
        }
        self.peaks(mz, intensity)
    }
}

#[derive(Debug)]
struct LocalMaximaPicker;

impl PeakPicker for LocalMaximaPicker {
    fn name(&self) -> &str {
        "local-maxima"
    }

    fn pick(&self, record: &mut Record) -> Result<(), SourceError> {
        let (Some(mz), Some(intensity)) = (record.mz.as_ref(), record.intensity.as_ref()) else {
            return Ok(());
        };
        let mut picked_mz = Vec::new();
        let mut picked_intensity = Vec::new();
        for i in 0..intensity.len() {
            let left = if i > 0 { intensity[i - 1] } else { 0.0 };
            let right = intensity.get(i + 1).copied().unwrap_or(0.0);
            if intensity[i] > left && intensity[i] >= right {
                picked_mz.push(mz[i]);
                picked_intensity.push(intensity[i]);
            }
        }
        record.mz = Some(picked_mz);
        record.intensity = Some(picked_intensity);
        Ok(())
    }
}

#[derive(Debug)]
struct NearestPeakLockMass;

impl ReferenceMassCorrector for NearestPeakLockMass {
    fn correct(&self, record: &mut Record, params: &ReferenceMassParams) -> Result<(), SourceError> {
        if params.positive == 0.0 {
            return Ok(());
        }
        let Some(mz) = record.mz.as_mut() else {
            return Ok(());
        };
        let observed = mz
            .iter()
            .copied()
            .filter(|value| (value - params.positive).abs() <= params.tolerance)
            .min_by(|a, b| (a - params.positive).abs().total_cmp(&(b - params.positive).abs()));
        if let Some(observed) = observed {
            let shift = params.positive - observed;
            mz.iter_mut().for_each(|value| *value += shift);
        }
        Ok(())
    }
}

#[derive(Debug)]
struct DriftTimeConverter;

impl DriftTimeConverter {
    /// Linear calibration, good enough for a demo
    const CCS_PER_MSEC: f64 = 45.0;
}

impl MobilityConverter for DriftTimeConverter {
    fn unit(&self) -> MobilityUnit {
        MobilityUnit::DriftTimeMsec
    }

    fn normalize(&self, record: &mut Record, _combine: bool) -> Result<(), SourceError> {
        if let Some(mobility) = record.mobility.as_mut() {
            mobility.unit = MobilityUnit::DriftTimeMsec;
        }
        Ok(())
    }

    fn can_convert_ccs(&self) -> bool {
        true
    }

    fn ccs_from_mobility(&self, mobility: f64, _mz: f64, charge: i32) -> Option<f64> {
        (charge > 0).then(|| mobility * Self::CCS_PER_MSEC / f64::from(charge))
    }

    fn mobility_from_ccs(&self, ccs: f64, _mz: f64, charge: i32) -> Option<f64> {
        (charge > 0).then(|| ccs * f64::from(charge) / Self::CCS_PER_MSEC)
    }
}
