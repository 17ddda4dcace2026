//! Output formatting for peakanno results.
//!
//! This module sorts and deduplicates annotated peaks and writes the final
//! tab-separated table.

use ahash::AHashSet;
use anyhow::Result;

use std::io::Write;

use crate::types::{Annotation, PeakInterval};

/// Column header of the annotation table.
pub const HEADER: &str = "chr\tpeak_start\tpeak_end\tstrand\tgeneid\tfeature\tlog2FC\tpvalue\tfdr";

/// Sort rows by chromosome, start, end, strand and drop repeated peak keys.
///
/// The sort is stable, so among rows with the same peak key the first one
/// in input order is kept. Applying this twice gives the same result.
pub fn aggregate(
    mut rows: Vec<(PeakInterval, Annotation)>,
) -> Vec<(PeakInterval, Annotation)> {
    rows.sort_by(|(a, _), (b, _)| a.sort_key().cmp(&b.sort_key()));

    // Equal keys share a sort position but may be interleaved with rows that
    // differ only in their statistics, so track every key kept so far.
    let mut seen: AHashSet<PeakInterval> = AHashSet::with_capacity(rows.len());
    rows.retain(|(peak, _)| seen.insert(peak.clone()));
    rows
}

/// Write the output header.
pub fn write_header<W: Write>(writer: &mut W) -> Result<()> {
    writeln!(writer, "{}", HEADER)?;
    Ok(())
}

/// Format a single output line for an annotated peak.
pub fn format_output_line(peak: &PeakInterval, annotation: &Annotation) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        peak.chrom,
        peak.start,
        peak.end,
        peak.strand,
        annotation.gene_string(),
        annotation.feature,
        peak.log2_fold_change,
        peak.p_value,
        peak.fdr
    )
}

/// Write the header and all rows. Returns the number of rows written.
pub fn write_results<W: Write>(
    writer: &mut W,
    rows: &[(PeakInterval, Annotation)],
) -> Result<usize> {
    write_header(writer)?;
    for (peak, annotation) in rows {
        writeln!(writer, "{}", format_output_line(peak, annotation))?;
    }
    Ok(rows.len())
}
