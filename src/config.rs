//! Configuration and defaults for peakanno.
//!
//! This module contains the configuration structure and default values
//! that control how gene models and peak tables are read.

use anyhow::{bail, Result};

use crate::types::Feature;

/// Half-width of a synthesized start/stop codon window in bp.
pub const DEFAULT_CODON_FLANK: i64 = 10;

/// Largest accepted codon flank (1 Mb), far beyond any gene's coding span.
pub const MAX_CODON_FLANK: i64 = 1_000_000;

/// Minimum number of delimited fields a peak row must have.
pub const PEAK_MIN_FIELDS: usize = 15;

/// Configuration for the peak annotation process.
#[derive(Debug, Clone)]
pub struct Config {
    /// GTF attribute key holding the gene identifier.
    pub gene_id_tag: String,
    /// GTF feature type that defines a gene envelope.
    pub envelope_feature: String,
    /// GTF feature type of coding segments.
    pub coding_feature: String,
    /// Codon windows span `pos - codon_flank ..= pos + codon_flank`.
    pub codon_flank: i64,
    /// Field delimiter of the peak table.
    pub peak_delimiter: char,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gene_id_tag: "gene_id".to_string(),
            envelope_feature: "mRNA".to_string(),
            coding_feature: "CDS".to_string(),
            codon_flank: DEFAULT_CODON_FLANK,
            peak_delimiter: ',',
        }
    }
}

impl Config {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the codon flank. Values outside `0..=MAX_CODON_FLANK` are ignored.
    pub fn set_codon_flank(&mut self, flank: i64) -> bool {
        if (0..=MAX_CODON_FLANK).contains(&flank) {
            self.codon_flank = flank;
            true
        } else {
            false
        }
    }

    /// Width of a synthesized codon window in bp.
    pub fn codon_window_width(&self) -> i64 {
        self.codon_flank.saturating_mul(2).saturating_add(1)
    }

    /// Check that the envelope and coding feature types are distinct from
    /// each other and from the feature types read as structure.
    ///
    /// A GTF record is routed to exactly one of these roles, so an overlap
    /// would silently empty a category.
    pub fn validate(&self) -> Result<()> {
        if self.envelope_feature == self.coding_feature {
            bail!(
                "Envelope and coding feature types must differ (both are '{}')",
                self.envelope_feature
            );
        }

        for feature in Feature::DIRECT {
            let Some(gtf_type) = feature.gtf_feature_type() else {
                continue;
            };
            for (flag, value) in [
                ("envelope", &self.envelope_feature),
                ("coding", &self.coding_feature),
            ] {
                if value == gtf_type {
                    bail!(
                        "The {} feature type cannot be '{}': it is read as the {} category",
                        flag,
                        value,
                        feature
                    );
                }
            }
        }

        Ok(())
    }
}
