use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "colorized_output")]
use console::style;
use serde::Serialize;

use mzaccess::cache::CacheStats;
use mzaccess::source::{DetailTier, MobilityUnit};

/// What one demo session did to the accessor
#[derive(Debug, Serialize)]
pub struct SessionReport {
    /// Label of the source that was walked
    pub source: String,
    /// Number of spectra
    pub spectra: usize,
    /// Survey spectra
    pub ms1: usize,
    /// Fragment spectra
    pub msn: usize,
    /// Applied decorators, innermost first
    pub decorators: Vec<String>,
    /// Unit of reported mobility values
    pub mobility_unit: MobilityUnit,
    /// Excluded reference lock function
    pub reference_lock_function: Option<u32>,
    /// Points in the computed total ion current
    pub tic_points: usize,
    /// Apex of the computed total ion current
    pub tic_apex: f64,
    /// Escalation floor reached per field kind
    pub escalation_floors: BTreeMap<String, DetailTier>,
    /// Reads issued to the source
    pub source_reads: usize,
    /// Native handles still held when the report was taken
    pub outstanding_handles: usize,
    /// Cache counters
    pub cache: CacheStats,
}

impl SessionReport {
    /// Format the report with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            let mut output = String::new();

            output.push_str(&format!("{}\n", style("mzaccess Session Report").bold().cyan()));
            output.push_str(&format!("{}\n", style("=======================").cyan()));
            output.push_str(&format!("{}: {}\n\n", style("Source").bold(), self.source));

            output.push_str(&format!(
                "{}: {} ({} MS1, {} MSn)\n",
                style("Spectra").bold(),
                self.spectra,
                self.ms1,
                self.msn
            ));
            output.push_str(&format!("{}:\n", style("Pipeline").bold()));
            for decorator in &self.decorators {
                output.push_str(&format!("  - {}\n", style(decorator).green()));
            }
            if self.decorators.is_empty() {
                output.push_str(&format!("  {}\n", style("(raw source)").dim()));
            }
            output.push_str(&format!("{}: {}\n", style("Mobility unit").bold(), self.mobility_unit));
            if let Some(function) = self.reference_lock_function {
                output.push_str(&format!(
                    "{}: function {}\n",
                    style("Reference lock").bold(),
                    style(function).yellow()
                ));
            }
            output.push_str(&format!(
                "{}: {} points, apex {:.3e}\n\n",
                style("TIC").bold(),
                self.tic_points,
                self.tic_apex
            ));

            output.push_str(&format!("{}:\n", style("Escalation floors").bold()));
            for (field, tier) in &self.escalation_floors {
                let tier = if *tier == DetailTier::Instant {
                    style(tier.to_string()).green()
                } else {
                    style(tier.to_string()).yellow()
                };
                output.push_str(&format!("  {:<16} {}\n", field, tier));
            }

            output.push('\n');
            output.push_str(&format!(
                "{}: {} hits, {} misses | {}: {} hits | {} source reads, {} evictions, {} hot activations\n",
                style("Decoded cache").bold(),
                style(self.cache.decoded_hits).green(),
                style(self.cache.decoded_misses).yellow(),
                style("Raw cache").bold(),
                style(self.cache.raw_hits).green(),
                self.source_reads,
                self.cache.evictions,
                self.cache.hot_activations
            ));

            if self.outstanding_handles == 0 {
                output.push_str(&format!("{}\n", style("All native handles released").green().bold()));
            } else {
                output.push_str(&format!(
                    "{}\n",
                    style(format!("{} native handles held by the raw cache", self.outstanding_handles))
                        .yellow()
                        .bold()
                ));
            }

            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mzaccess Session Report")?;
        writeln!(f, "=======================")?;
        writeln!(f, "Source: {}", self.source)?;
        writeln!(f)?;

        writeln!(f, "Spectra: {} ({} MS1, {} MSn)", self.spectra, self.ms1, self.msn)?;
        writeln!(f, "Pipeline:")?;
        if self.decorators.is_empty() {
            writeln!(f, "  (raw source)")?;
        }
        for decorator in &self.decorators {
            writeln!(f, "  - {}", decorator)?;
        }
        writeln!(f, "Mobility unit: {}", self.mobility_unit)?;
        if let Some(function) = self.reference_lock_function {
            writeln!(f, "Reference lock: function {}", function)?;
        }
        writeln!(f, "TIC: {} points, apex {:.3e}", self.tic_points, self.tic_apex)?;
        writeln!(f)?;

        writeln!(f, "Escalation floors:")?;
        for (field, tier) in &self.escalation_floors {
            writeln!(f, "  {:<16} {}", field, tier)?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "Decoded cache: {} hits, {} misses | Raw cache: {} hits | {} source reads, {} evictions, {} hot activations",
            self.cache.decoded_hits,
            self.cache.decoded_misses,
            self.cache.raw_hits,
            self.source_reads,
            self.cache.evictions,
            self.cache.hot_activations
        )?;

        if self.outstanding_handles == 0 {
            writeln!(f, "All native handles released")?;
        } else {
            writeln!(f, "{} native handles held by the raw cache", self.outstanding_handles)?;
        }

        Ok(())
    }
}
