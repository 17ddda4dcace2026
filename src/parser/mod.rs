//! Parsers for the peak table and GTF gene models.

pub mod gtf;
pub mod peaks;
pub mod util;

pub use gtf::{parse_gtf, GeneModel};
pub use peaks::parse_peaks;
