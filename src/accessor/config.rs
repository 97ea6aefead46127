//! TOML configuration for a [`SpectrumAccessor`](super::SpectrumAccessor).
//!
//! ```toml
//! # mzaccess.toml
//! [pipeline]
//! vendor_centroid_ms1 = true
//! vendor_centroid_ms2 = true
//!
//! [pipeline.reference_mass]
//! positive = 556.2771
//! negative = 554.2615
//!
//! [cache]
//! enabled = true
//! capacity = 250
//! ```
//!
//! Every section and key is optional.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::AccessError;
use crate::cache::{DEFAULT_DECODED_CAPACITY, HOT_INDEX_THRESHOLD};
use crate::pipeline::PipelineConfig;

/// Root configuration of an accessor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessorConfig {
    /// Decorator pipeline settings
    pub pipeline: PipelineConfig,

    /// Cache settings
    pub cache: CacheConfig,
}

/// Cache settings applied when the accessor is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the decoded spectrum cache up front
    pub enabled: bool,

    /// Decoded cache capacity in spectra
    pub capacity: usize,

    /// Consecutive requests for one index before raw records are kept
    pub hot_index_threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: DEFAULT_DECODED_CAPACITY,
            hot_index_threshold: HOT_INDEX_THRESHOLD,
        }
    }
}

impl AccessorConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, AccessError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, AccessError> {
        let config: AccessorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings without opening anything.
    pub fn validate(&self) -> Result<(), AccessError> {
        self.pipeline.validate()?;
        if self.cache.capacity == 0 {
            return Err(AccessError::Configuration("cache capacity must be at least 1".to_string()));
        }
        if self.cache.hot_index_threshold == 0 {
            return Err(AccessError::Configuration(
                "hot_index_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
