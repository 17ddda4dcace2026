//! peakanno - Strand-aware feature annotation of genomic peaks.
//!
//! This library assigns each called peak to the single most relevant gene
//! feature it overlaps (3'UTR, stop codon, exon, start codon, 5'UTR, intron,
//! or intergenic) together with the ids of the overlapping genes.
//!
//! # Features
//!
//! - Parse peak statistics tables and GTF gene models (with gzip support)
//! - Synthesize start/stop codon windows from coding bounds
//! - Resolve overlaps in fixed priority order with a shrinking search pool
//! - Intersect in-process or through `bedtools intersect`
//! - Merge strand-specific runs into one sorted, deduplicated table
//!
//! # Example
//!
//! ```ignore
//! use peakanno::annotate::{annotate_peaks, IndexedIntersect};
//! use peakanno::config::Config;
//! use peakanno::output::{aggregate, write_results};
//! use peakanno::parser::{parse_gtf, parse_peaks};
//! use peakanno::types::Strand;
//! use std::path::Path;
//!
//! let config = Config::default();
//! let model = parse_gtf(Path::new("genes.fwd.gtf"), &config)?;
//! let peaks = parse_peaks(Path::new("peaks.csv"), Strand::Positive, config.peak_delimiter)?;
//!
//! let (table, _stats) = annotate_peaks(&peaks, &model, &IndexedIntersect::new(), &config)?;
//! let rows = aggregate(table.into_entries());
//! write_results(&mut std::io::stdout(), &rows)?;
//! ```

pub mod annotate;
pub mod config;
pub mod output;
pub mod parser;
pub mod types;

pub use annotate::{annotate_peaks, AnnotationTable, BedtoolsIntersect, IndexedIntersect, IntersectEngine};
pub use config::Config;
pub use parser::GeneModel;
pub use types::{Annotation, Feature, FeatureInterval, PeakInterval, Strand};
