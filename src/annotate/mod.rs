//! Peak classification against gene models.

pub mod bedtools;
pub mod features;
pub mod intersect;
pub mod resolver;

pub use bedtools::BedtoolsIntersect;
pub use features::{envelope_set, feature_set};
pub use intersect::{IndexedIntersect, IntersectEngine};
pub use resolver::{annotate_peaks, AnnotationTable, ResolveStats};
