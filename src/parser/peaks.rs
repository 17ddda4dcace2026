//! Peak table parser.
//!
//! Reads the delimited statistics table written by the peak caller. The
//! table carries no strand column: forward and reverse peaks come from
//! separate files, so the strand is supplied by the caller.

use anyhow::{Context, Result};
use log::debug;
use std::io::BufRead;
use std::path::Path;

use crate::config::PEAK_MIN_FIELDS;
use crate::parser::util::open_reader;
use crate::types::{PeakInterval, Strand};

// 0-based column positions in the peak table.
const COL_CHROM: usize = 1;
const COL_START: usize = 2;
const COL_END: usize = 3;
const COL_LOG2FC: usize = 12;
const COL_PVALUE: usize = 13;
const COL_FDR: usize = 14;

/// Parse a peak table and tag every peak with `strand`.
///
/// Supports both plain text and gzip-compressed tables.
pub fn parse_peaks(path: &Path, strand: Strand, delimiter: char) -> Result<Vec<PeakInterval>> {
    let reader = open_reader(path, "peak table")?;
    parse_peaks_reader(reader, strand, delimiter)
}

/// Parse a peak table from a reader. The first line is a header.
pub fn parse_peaks_reader<R: BufRead>(
    reader: R,
    strand: Strand,
    delimiter: char,
) -> Result<Vec<PeakInterval>> {
    let mut peaks = Vec::new();

    for (line_no, line_result) in reader.lines().enumerate() {
        let line = line_result.context("Failed to read peak table line")?;

        if line_no == 0 {
            continue;
        }

        if let Some(peak) = parse_peak_line(line.trim(), strand, delimiter) {
            peaks.push(peak);
        } else if !line.trim().is_empty() {
            debug!("Skipping malformed peak row {}", line_no + 1);
        }
    }

    Ok(peaks)
}

/// Parse one data row. Returns `None` for short rows or non-integer coordinates.
fn parse_peak_line(line: &str, strand: Strand, delimiter: char) -> Option<PeakInterval> {
    let fields: Vec<&str> = line.split(delimiter).collect();
    if fields.len() < PEAK_MIN_FIELDS {
        return None;
    }

    let start: i64 = unquote(fields[COL_START]).parse().ok()?;
    let end: i64 = unquote(fields[COL_END]).parse().ok()?;

    Some(PeakInterval::new(
        unquote(fields[COL_CHROM]),
        start,
        end,
        strand,
        unquote(fields[COL_LOG2FC]),
        unquote(fields[COL_PVALUE]),
        unquote(fields[COL_FDR]),
    ))
}

fn unquote(field: &str) -> String {
    field.replace('"', "").trim().to_string()
}
