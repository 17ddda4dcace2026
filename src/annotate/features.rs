//! Feature set extraction.
//!
//! Turns an indexed gene model into the interval sets the resolver
//! intersects peaks against, one set per feature category.

use crate::parser::gtf::GeneModel;
use crate::types::{Feature, FeatureInterval};

/// Build the interval set for one feature category.
///
/// Exons and UTRs come straight from the annotation. Start and stop codons
/// are windows of `pos - flank ..= pos + flank` around the coding bound that
/// holds the codon on the gene's strand. Intron and intergenic have no
/// interval set of their own and yield an empty vector.
pub fn feature_set(model: &GeneModel, feature: Feature, flank: i64) -> Vec<FeatureInterval> {
    match feature {
        Feature::ThreePrimeUtr | Feature::Exon | Feature::FivePrimeUtr => {
            model.structure(feature).to_vec()
        }
        Feature::StartCodon | Feature::StopCodon => codon_windows(model, feature, flank),
        Feature::Intron | Feature::Intergenic => Vec::new(),
    }
}

/// Synthesize start or stop codon windows from the coding bounds.
///
/// On the forward strand the start codon sits on the leftmost coding base
/// and the stop codon on the rightmost; the reverse strand swaps them.
fn codon_windows(model: &GeneModel, feature: Feature, flank: i64) -> Vec<FeatureInterval> {
    model
        .coding_bounds
        .iter()
        .map(|(key, bounds)| {
            let pos = if feature == Feature::StartCodon {
                bounds.start_codon_position(key.strand)
            } else {
                bounds.stop_codon_position(key.strand)
            };
            key.interval(pos.saturating_sub(flank), pos.saturating_add(flank))
        })
        .collect()
}

/// Gene envelopes as intervals, in first-seen order.
pub fn envelope_set(model: &GeneModel) -> Vec<FeatureInterval> {
    model
        .envelopes
        .iter()
        .map(|(key, env)| key.interval(env.start, env.end))
        .collect()
}
