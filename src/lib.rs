//! # mzaccess - Indexed Spectrum Access over External Decoders
//!
//! `mzaccess` layers fast, selective random access on top of a mass
//! spectrometry decoding engine. The engine does all file parsing and owns the
//! scientific algorithms; it is seen through the [`source::RecordSource`] trait
//! as an indexed sequence of records that can be read at increasing levels of
//! detail.
//!
//! ## Key Features
//!
//! - **Decorator Pipeline**: Centroiding, reference-mass correction and mobility
//!   normalization wrapped around the source in a fixed order, rebuilt only when
//!   the settings change.
//!
//! - **Adaptive Dual Cache**: Bounded tables of decoded spectra and raw records
//!   with release-on-evict, plus a raw cache that switches itself on when one
//!   spectrum is probed over and over.
//!
//! - **Metadata Escalation**: Optional fields are read at the cheapest detail
//!   tier that has proven to carry them, remembered per field kind.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//! use mzaccess::prelude::*;
//!
//! let source = MemorySource::new(vec![
//!     MemoryRecord::new("scan=1").level(1).start_time(0.5).peaks(vec![445.12], vec![2.5e5]),
//!     MemoryRecord::new("scan=2").level(2).start_time(0.6).precursor(Precursor::new(445.12)),
//! ]);
//!
//! let mut accessor = SpectrumAccessor::new(Rc::new(source), AccessorConfig::default())?;
//! accessor.enable_cache(Some(50));
//!
//! for index in 0..accessor.len() {
//!     println!("{} level={:?} rt={:?}", accessor.id(index)?, accessor.level(index)?, accessor.start_time(index)?);
//! }
//! accessor.close();
//! # Ok::<(), AccessError>(())
//! ```

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod accessor;
pub mod cache;
pub mod escalation;
pub mod pipeline;
pub mod source;
pub mod spectrum;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::accessor::{AccessError, AccessorConfig, CacheConfig, CancellationToken, SpectrumAccessor};
    pub use crate::cache::{CacheStats, RecordCache};
    pub use crate::escalation::{EscalationResolver, FieldKind};
    pub use crate::pipeline::{Decorator, PipelineComposer, PipelineConfig, PipelineError, PipelineFacts};
    pub use crate::source::{
        AggregateTrace, DetailTier, MemoryRecord, MemorySource, MobilityConverter, MobilityFields, MobilityUnit,
        PeakPicker, Precursor, Record, RecordSource, ReferenceMassCorrector, ReferenceMassParams, SourceError,
        SourceOpener, VendorFamily,
    };
    pub use crate::spectrum::DecodedSpectrum;
}
