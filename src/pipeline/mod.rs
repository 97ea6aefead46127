//! # Decorator Pipeline
//!
//! Wraps the raw [`RecordSource`] with the decorators a [`PipelineConfig`]
//! asks for, in a fixed order (innermost first):
//!
//! ```text
//! raw source → centroid → reference-mass correction → mobility normalization
//! ```
//!
//! Correction sees picked peaks and normalization sees corrected axes. The
//! composed source is built on first use and kept until the configuration
//! changes or [`PipelineComposer::invalidate`] is called.
//!
//! Composing also records [`PipelineFacts`]: the mobility unit, whether CCS
//! conversion is available, and for Waters files the reference lock function
//! to leave out of aggregate queries.

mod config;
pub mod decorators;
mod error;


use std::rc::Rc;

use log::{debug, info};

use crate::source::{DetailTier, MobilityConverter, MobilityUnit, RecordSource, SourceError, VendorFamily};

pub use config::{CentroidMode, Decorator, LevelSelection, PipelineConfig};
pub use decorators::{CentroidSource, MobilitySource, ReferenceMassSource};
pub use error::PipelineError;

/// What composing the pipeline found out about the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineFacts {
    /// Decorators actually applied, innermost first
    pub applied: Vec<Decorator>,
    /// Unit of normalized mobility values
    pub mobility_unit: MobilityUnit,
    /// Whether mobility/CCS conversion is available
    pub ccs_convertible: bool,
    /// Waters reference lock function excluded from aggregate queries
    pub reference_lock_function: Option<u32>,
}

#[derive(Debug)]
struct ComposedPipeline {
    source: Rc<dyn RecordSource>,
    mobility: Option<Rc<dyn MobilityConverter>>,
    facts: PipelineFacts,
}

/// Builds and memoizes the decorated source for one configuration.
#[derive(Debug)]
pub struct PipelineComposer {
    root: Rc<dyn RecordSource>,
    config: PipelineConfig,
    composed: Option<ComposedPipeline>,
    builds: u64,
}

impl PipelineComposer {
    /// Composer over `root`; the configuration is validated immediately.
    pub fn new(root: Rc<dyn RecordSource>, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            root,
            config,
            composed: None,
            builds: 0,
        })
    }

    /// The undecorated source.
    pub fn root(&self) -> &Rc<dyn RecordSource> {
        &self.root
    }

    /// Current configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Replace the configuration; a different one marks the pipeline dirty.
    pub fn set_config(&mut self, config: PipelineConfig) -> Result<(), PipelineError> {
        config.validate()?;
        if config != self.config {
            self.config = config;
            self.invalidate();
        }
        Ok(())
    }

    /// Drop the composed source so the next access rebuilds it.
    pub fn invalidate(&mut self) {
        if self.composed.take().is_some() {
            debug!("Pipeline marked dirty");
        }
    }

    /// Whether the next access will rebuild.
    pub fn is_dirty(&self) -> bool {
        self.composed.is_none()
    }

    /// Number of builds so far.
    pub fn build_count(&self) -> u64 {
        self.builds
    }

    /// The decorated source, building it if needed.
    pub fn effective_source(&mut self) -> Result<Rc<dyn RecordSource>, PipelineError> {
        Ok(Rc::clone(&self.ensure_composed()?.source))
    }

    /// Facts gathered while composing, building if needed.
    pub fn facts(&mut self) -> Result<&PipelineFacts, PipelineError> {
        Ok(&self.ensure_composed()?.facts)
    }

    /// The mobility converter in use, if the source has a mobility dimension.
    pub fn mobility_converter(&mut self) -> Result<Option<Rc<dyn MobilityConverter>>, PipelineError> {
        Ok(self.ensure_composed()?.mobility.clone())
    }

    fn ensure_composed(&mut self) -> Result<&ComposedPipeline, PipelineError> {
        let composed = match self.composed.take() {
            Some(composed) => composed,
            None => {
                let composed = compose(&self.root, &self.config)?;
                self.builds += 1;
                composed
            }
        };
        Ok(self.composed.insert(composed))
    }
}

fn compose(root: &Rc<dyn RecordSource>, config: &PipelineConfig) -> Result<ComposedPipeline, PipelineError> {
    let mut source = Rc::clone(root);
    let mut facts = PipelineFacts::default();
    let mut mobility = None;

    for decorator in config.decorators()? {
        match &decorator {
            Decorator::Centroid(mode) => {
                let picker = match mode {
                    CentroidMode::Vendor(_) => source.vendor_peak_picker().ok_or_else(|| {
                        PipelineError::UnsupportedFeature(
                            "centroiding unsupported: no vendor peak picking for this file".to_string(),
                        )
                    })?,
                    CentroidMode::Alternate => source.alternate_peak_picker().ok_or_else(|| {
                        PipelineError::UnsupportedFeature(
                            "centroiding unsupported: no alternate peak picker available".to_string(),
                        )
                    })?,
                };
                source = Rc::new(CentroidSource::new(source, picker, mode.levels()));
            }
            Decorator::ReferenceMass(params) => {
                let corrector = source.reference_mass_corrector().ok_or_else(|| {
                    PipelineError::UnsupportedFeature(
                        "reference-mass correction unsupported for this file".to_string(),
                    )
                })?;
                source = Rc::new(ReferenceMassSource::new(source, corrector, *params));
            }
            Decorator::MobilityNormalize { combine } => {
                let Some(converter) = source.mobility_converter() else {
                    continue;
                };
                facts.mobility_unit = converter.unit();
                facts.ccs_convertible = converter.can_convert_ccs();
                source = Rc::new(MobilitySource::new(source, Rc::clone(&converter), *combine));
                mobility = Some(converter);
            }
        }
        debug!("Applied decorator {}", decorator);
        facts.applied.push(decorator);
    }

    facts.reference_lock_function = detect_reference_lock(root.as_ref())?;

    Ok(ComposedPipeline {
        source,
        mobility,
        facts,
    })
}

/// Waters files may interleave a reference lock function with the analyte
/// functions. The first record's function number tells which one it is.
///
/// Record 0 must be a spectrum (it reports an MS level). The level may only
/// show up at a costlier tier, so record 0 is read one tier higher at a time
/// up to [`DetailTier::MAX_METADATA`].
fn detect_reference_lock(root: &dyn RecordSource) -> Result<Option<u32>, SourceError> {
    if root.vendor() != VendorFamily::Waters || root.is_empty() || root.has_combined_mobility() {
        return Ok(None);
    }

    let mut tier = DetailTier::Instant;
    let (level, function) = loop {
        let mut first = root.read(0, tier)?;
        let level = first.level;
        let function = first.function_number();
        first.release_logged();

        match tier.next() {
            Some(next) if level.is_none() && tier < DetailTier::MAX_METADATA => tier = next,
            _ => break (level, function),
        }
    };

    match (level, function) {
        (Some(_), Some(function)) if function > 1 => {
            info!("Excluding reference lock function {} from aggregate queries", function);
            Ok(Some(function))
        }
        _ => Ok(None),
    }
}
