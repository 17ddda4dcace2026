//! Priority-ordered peak classification.
//!
//! Peaks are intersected against each directly observable feature category
//! in precedence order. After each category the pool of peaks still to be
//! searched shrinks to those that overlapped nothing in that category. What
//! is left at the end is classified against gene envelopes (intron) or as
//! intergenic.

use anyhow::Result;
use indexmap::map::Entry;
use indexmap::IndexMap;
use log::debug;

use crate::annotate::features::{envelope_set, feature_set};
use crate::annotate::intersect::IntersectEngine;
use crate::config::Config;
use crate::parser::gtf::GeneModel;
use crate::types::{Annotation, Feature, PeakInterval};

/// Annotations keyed by peak, in the order peaks were first annotated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationTable {
    entries: IndexMap<PeakInterval, Annotation>,
}

impl AnnotationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, peak: &PeakInterval) -> Option<&Annotation> {
        self.entries.get(peak)
    }

    /// Record that `peak` overlaps a `feature` interval of `gene_id`.
    ///
    /// The gene id is always added to the peak's gene set. The winning
    /// feature only changes when `feature` outranks the current one.
    pub fn record(&mut self, peak: &PeakInterval, gene_id: &str, feature: Feature) {
        match self.entries.get_mut(peak) {
            Some(ann) => {
                if !ann.genes.contains(gene_id) {
                    ann.genes.insert(gene_id.to_string());
                }
                if feature.outranks(ann.feature) {
                    ann.feature = feature;
                }
            }
            None => {
                self.entries
                    .insert(peak.clone(), Annotation::new(gene_id, feature));
            }
        }
    }

    /// Record a gene-envelope hit: new peaks become intron, existing ones
    /// only gain the gene id.
    pub fn record_intron(&mut self, peak: &PeakInterval, gene_id: &str) {
        match self.entries.entry(peak.clone()) {
            Entry::Occupied(mut e) => {
                let ann = e.get_mut();
                if !ann.genes.contains(gene_id) {
                    ann.genes.insert(gene_id.to_string());
                }
            }
            Entry::Vacant(e) => {
                e.insert(Annotation::new(gene_id, Feature::Intron));
            }
        }
    }

    /// Mark `peak` intergenic, replacing anything recorded for it.
    pub fn set_intergenic(&mut self, peak: &PeakInterval) {
        self.entries.insert(peak.clone(), Annotation::intergenic());
    }

    /// Fold `other` into this table. Keys present in both take `other`'s
    /// annotation but keep their original position.
    pub fn merge(&mut self, other: AnnotationTable) {
        for (peak, ann) in other.entries {
            self.entries.insert(peak, ann);
        }
    }

    pub fn into_entries(self) -> Vec<(PeakInterval, Annotation)> {
        self.entries.into_iter().collect()
    }
}

/// Per-category hit counts from one resolver run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Overlap pairs found per category (direct categories and intron).
    pub pairs: Vec<(Feature, usize)>,
    /// Peaks left after the direct categories.
    pub remaining_after_direct: usize,
    /// Peaks classified intergenic.
    pub intergenic: usize,
}

/// Annotate `peaks` against one gene model.
///
/// Peaks are referenced by index into `peaks` throughout; the remaining
/// pool is a list of such indices in input order.
pub fn annotate_peaks<E: IntersectEngine>(
    peaks: &[PeakInterval],
    model: &GeneModel,
    engine: &E,
    config: &Config,
) -> Result<(AnnotationTable, ResolveStats)> {
    let mut table = AnnotationTable::new();
    let mut stats = ResolveStats::default();
    let mut remaining: Vec<usize> = (0..peaks.len()).collect();

    for feature in Feature::DIRECT {
        let features = feature_set(model, feature, config.codon_flank);
        if features.is_empty() {
            debug!("No {} intervals, skipping", feature);
            continue;
        }

        let pool: Vec<&PeakInterval> = remaining.iter().map(|&i| &peaks[i]).collect();

        let pairs = engine.overlap(&pool, &features)?;
        for &(pi, fi) in &pairs {
            table.record(pool[pi], &features[fi].gene_id, feature);
        }

        let left = engine.subtract(&pool, &features)?;
        debug!(
            "{} (priority {}): {} overlaps, {} of {} peaks remain",
            feature,
            feature.priority(),
            pairs.len(),
            left.len(),
            remaining.len()
        );
        stats.pairs.push((feature, pairs.len()));
        remaining = left.into_iter().map(|i| remaining[i]).collect();
    }

    stats.remaining_after_direct = remaining.len();
    classify_remaining(peaks, &remaining, model, engine, &mut table, &mut stats)?;

    Ok((table, stats))
}

/// Intron/intergenic pass over the peaks no direct category claimed.
fn classify_remaining<E: IntersectEngine>(
    peaks: &[PeakInterval],
    remaining: &[usize],
    model: &GeneModel,
    engine: &E,
    table: &mut AnnotationTable,
    stats: &mut ResolveStats,
) -> Result<()> {
    let envelopes = envelope_set(model);
    let pool: Vec<&PeakInterval> = remaining.iter().map(|&i| &peaks[i]).collect();

    let pairs = engine.overlap(&pool, &envelopes)?;
    for &(pi, gi) in &pairs {
        table.record_intron(pool[pi], &envelopes[gi].gene_id);
    }
    stats.pairs.push((Feature::Intron, pairs.len()));

    let outside = engine.subtract(&pool, &envelopes)?;
    for &pi in &outside {
        table.set_intergenic(pool[pi]);
    }
    stats.intergenic = outside.len();

    debug!(
        "intron: {} overlaps, intergenic: {} peaks",
        pairs.len(),
        outside.len()
    );

    Ok(())
}
