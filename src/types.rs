//! Core data structures for peakanno.
//!
//! This module contains the fundamental types used throughout the peak
//! annotation process: peaks, gene-model intervals, and feature categories.

use indexmap::IndexSet;
use std::fmt;
use std::str::FromStr;

/// Strand orientation for genomic features.
///
/// Ordered `+` before `-`, matching the byte order of the symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strand {
    Positive,
    Negative,
}

/// Error type for parsing strand from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStrandError;

impl fmt::Display for ParseStrandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid strand: expected '+' or '-'")
    }
}

impl std::error::Error for ParseStrandError {}

impl FromStr for Strand {
    type Err = ParseStrandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Positive),
            "-" => Ok(Strand::Negative),
            _ => Err(ParseStrandError),
        }
    }
}

impl Strand {
    /// Convert strand to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strand::Positive => "+",
            Strand::Negative => "-",
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Feature categories a peak can be assigned to.
///
/// Declaration order is precedence order: the derived `Ord` ranks
/// `ThreePrimeUtr` highest and `Intergenic` lowest, so `a < b` means
/// `a` wins over `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    ThreePrimeUtr,
    StopCodon,
    Exon,
    StartCodon,
    FivePrimeUtr,
    Intron,
    Intergenic,
}

impl Feature {
    /// Categories matched directly against gene structure, in priority order.
    pub const DIRECT: [Feature; 5] = [
        Feature::ThreePrimeUtr,
        Feature::StopCodon,
        Feature::Exon,
        Feature::StartCodon,
        Feature::FivePrimeUtr,
    ];

    /// Numeric rank (1 = highest precedence).
    pub fn priority(self) -> u8 {
        self as u8 + 1
    }

    /// Whether this category outranks `other`.
    pub fn outranks(self, other: Feature) -> bool {
        self < other
    }

    /// Convert feature to its output name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::ThreePrimeUtr => "three_prime_utr",
            Feature::StopCodon => "stop_codon",
            Feature::Exon => "exon",
            Feature::StartCodon => "start_codon",
            Feature::FivePrimeUtr => "five_prime_utr",
            Feature::Intron => "intron",
            Feature::Intergenic => "intergenic",
        }
    }

    /// GTF feature type read directly for this category, if any.
    ///
    /// Codon windows are synthesized from coding bounds rather than read,
    /// and intron/intergenic are derived from gene envelopes.
    pub fn gtf_feature_type(&self) -> Option<&'static str> {
        match self {
            Feature::ThreePrimeUtr | Feature::Exon | Feature::FivePrimeUtr => Some(self.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Anything with a stranded genomic position. Coordinates are 1-based, closed.
pub trait GenomicInterval {
    fn chrom(&self) -> &str;
    fn start(&self) -> i64;
    fn end(&self) -> i64;
    fn strand(&self) -> Strand;

    /// Closed-interval overlap on the same chromosome and strand.
    fn overlaps<O: GenomicInterval + ?Sized>(&self, other: &O) -> bool {
        self.chrom() == other.chrom()
            && self.strand() == other.strand()
            && self.start() <= other.end()
            && other.start() <= self.end()
    }
}

impl<T: GenomicInterval + ?Sized> GenomicInterval for &T {
    fn chrom(&self) -> &str {
        (**self).chrom()
    }
    fn start(&self) -> i64 {
        (**self).start()
    }
    fn end(&self) -> i64 {
        (**self).end()
    }
    fn strand(&self) -> Strand {
        (**self).strand()
    }
}

/// A called peak.
///
/// All seven fields together are the peak key: two peaks are the same peak
/// only if every field is equal. The statistics are kept as source text so
/// equality and output are exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeakInterval {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub log2_fold_change: String,
    pub p_value: String,
    pub fdr: String,
}

impl PeakInterval {
    /// Create a new peak.
    pub fn new(
        chrom: String,
        start: i64,
        end: i64,
        strand: Strand,
        log2_fold_change: String,
        p_value: String,
        fdr: String,
    ) -> Self {
        PeakInterval {
            chrom,
            start,
            end,
            strand,
            log2_fold_change,
            p_value,
            fdr,
        }
    }

    /// Output sort key: chromosome, start, end, strand.
    pub fn sort_key(&self) -> (&str, i64, i64, Strand) {
        (&self.chrom, self.start, self.end, self.strand)
    }
}

impl GenomicInterval for PeakInterval {
    fn chrom(&self) -> &str {
        &self.chrom
    }
    fn start(&self) -> i64 {
        self.start
    }
    fn end(&self) -> i64 {
        self.end
    }
    fn strand(&self) -> Strand {
        self.strand
    }
}

/// A unit of annotated gene structure, used only for intersection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureInterval {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub gene_id: String,
}

impl FeatureInterval {
    /// Create a new feature interval.
    pub fn new(chrom: String, start: i64, end: i64, strand: Strand, gene_id: String) -> Self {
        FeatureInterval {
            chrom,
            start,
            end,
            strand,
            gene_id,
        }
    }
}

impl GenomicInterval for FeatureInterval {
    fn chrom(&self) -> &str {
        &self.chrom
    }
    fn start(&self) -> i64 {
        self.start
    }
    fn end(&self) -> i64 {
        self.end
    }
    fn strand(&self) -> Strand {
        self.strand
    }
}

/// Identity of a gene within one annotation: chromosome, strand, gene id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeneKey {
    pub chrom: String,
    pub strand: Strand,
    pub gene_id: String,
}

impl GeneKey {
    pub fn new(chrom: String, strand: Strand, gene_id: String) -> Self {
        GeneKey {
            chrom,
            strand,
            gene_id,
        }
    }

    /// Build a feature interval for this gene spanning `start..=end`.
    pub fn interval(&self, start: i64, end: i64) -> FeatureInterval {
        FeatureInterval::new(
            self.chrom.clone(),
            start,
            end,
            self.strand,
            self.gene_id.clone(),
        )
    }
}

/// Span of the first transcript-level record seen for a gene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneEnvelope {
    pub start: i64,
    pub end: i64,
}

/// Leftmost and rightmost coordinate over all coding records of a gene.
///
/// These are positional, not transcript-relative: `start` is always the
/// smaller coordinate regardless of strand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodingBounds {
    pub start: i64,
    pub end: i64,
}

impl CodingBounds {
    /// Bounds covering a single coding record.
    pub fn new(start: i64, end: i64) -> Self {
        CodingBounds { start, end }
    }

    /// Widen to include another coding record.
    pub fn extend(&mut self, start: i64, end: i64) {
        if start < self.start {
            self.start = start;
        }
        if end > self.end {
            self.end = end;
        }
    }

    /// Coordinate the start codon sits on for a gene on `strand`.
    pub fn start_codon_position(&self, strand: Strand) -> i64 {
        match strand {
            Strand::Positive => self.start,
            Strand::Negative => self.end,
        }
    }

    /// Coordinate the stop codon sits on for a gene on `strand`.
    pub fn stop_codon_position(&self, strand: Strand) -> i64 {
        match strand {
            Strand::Positive => self.end,
            Strand::Negative => self.start,
        }
    }
}

/// Annotation assigned to one peak key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Gene ids in first-seen order, without duplicates.
    pub genes: IndexSet<String>,
    /// Winning feature category.
    pub feature: Feature,
}

/// Gene label used for peaks outside every gene envelope.
pub const INTERGENIC_LABEL: &str = "intergenic";

impl Annotation {
    /// Create an annotation with a single gene.
    pub fn new(gene_id: &str, feature: Feature) -> Self {
        let mut genes = IndexSet::new();
        genes.insert(gene_id.to_string());
        Annotation { genes, feature }
    }

    /// The annotation of a peak that overlaps no gene at all.
    pub fn intergenic() -> Self {
        Annotation::new(INTERGENIC_LABEL, Feature::Intergenic)
    }

    /// Gene ids joined with commas.
    pub fn gene_string(&self) -> String {
        let ids: Vec<&str> = self.genes.iter().map(String::as_str).collect();
        ids.join(",")
    }
}
