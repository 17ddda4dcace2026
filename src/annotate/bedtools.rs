//! `bedtools intersect` subprocess backend.
//!
//! Each operation writes both interval sets to a scratch directory as BED6,
//! runs bedtools with its stdout redirected into that directory, and reads
//! the result back. The scratch directory is removed when the operation
//! returns, whether it succeeded or not.
//!
//! Rows are written 0-based half-open (`start - 1`, `end`) so bedtools'
//! overlap test agrees with the closed-interval rule used elsewhere, and the
//! BED name column carries the row's index in its input slice.

use anyhow::{bail, Context, Result};
use log::debug;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::annotate::intersect::IntersectEngine;
use crate::types::GenomicInterval;

/// Column of the A-side index in `-wa -wb` output (BED6 + BED6).
const A_NAME_COL: usize = 3;
/// Column of the B-side index in `-wa -wb` output.
const B_NAME_COL: usize = 9;

/// Intersection backend that shells out to `bedtools`.
#[derive(Debug, Clone)]
pub struct BedtoolsIntersect {
    program: PathBuf,
}

impl Default for BedtoolsIntersect {
    fn default() -> Self {
        BedtoolsIntersect::new("bedtools")
    }
}

impl BedtoolsIntersect {
    /// Use the bedtools executable at `program` (looked up on `PATH` if bare).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        BedtoolsIntersect {
            program: program.into(),
        }
    }

    /// Run `bedtools --version` and return its output line.
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run {}", self.program.display()))?;

        if !output.status.success() {
            bail!(
                "{} --version exited with {}",
                self.program.display(),
                output.status
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run one `bedtools intersect` call and return its output lines.
    fn intersect<A, B>(&self, a: &[A], b: &[B], mode: &[&str]) -> Result<Vec<String>>
    where
        A: GenomicInterval,
        B: GenomicInterval,
    {
        let scratch = tempfile::Builder::new()
            .prefix("peakanno-")
            .tempdir()
            .context("Failed to create scratch directory")?;

        let a_path = scratch.path().join("a.bed");
        let b_path = scratch.path().join("b.bed");
        let out_path = scratch.path().join("out.bed");
        write_bed(&a_path, a)?;
        write_bed(&b_path, b)?;

        let out_file = File::create(&out_path).context("Failed to create scratch output")?;

        debug!(
            "bedtools intersect {} ({} x {} intervals)",
            mode.join(" "),
            a.len(),
            b.len()
        );

        let output = Command::new(&self.program)
            .arg("intersect")
            .arg("-a")
            .arg(&a_path)
            .arg("-b")
            .arg(&b_path)
            .arg("-s")
            .args(mode)
            .stdin(Stdio::null())
            .stdout(out_file)
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to run {}", self.program.display()))?;

        if !output.status.success() {
            bail!(
                "bedtools intersect exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let content = fs::read_to_string(&out_path).context("Failed to read bedtools output")?;
        Ok(content.lines().map(str::to_string).collect())
    }
}

impl IntersectEngine for BedtoolsIntersect {
    fn overlap<A, B>(&self, a: &[A], b: &[B]) -> Result<Vec<(usize, usize)>>
    where
        A: GenomicInterval + Sync,
        B: GenomicInterval + Sync,
    {
        if a.is_empty() || b.is_empty() {
            return Ok(Vec::new());
        }

        let lines = self.intersect(a, b, &["-wa", "-wb"])?;
        let mut pairs = lines
            .iter()
            .filter(|l| !l.is_empty())
            .map(|l| parse_pair(l, a.len(), b.len()))
            .collect::<Result<Vec<_>>>()?;

        // bedtools reports B hits in tree order, not file order
        pairs.sort_unstable();
        pairs.dedup();
        Ok(pairs)
    }

    fn subtract<A, B>(&self, a: &[A], b: &[B]) -> Result<Vec<usize>>
    where
        A: GenomicInterval + Sync,
        B: GenomicInterval + Sync,
    {
        if a.is_empty() {
            return Ok(Vec::new());
        }
        if b.is_empty() {
            return Ok((0..a.len()).collect());
        }

        let lines = self.intersect(a, b, &["-v"])?;
        let mut kept = lines
            .iter()
            .filter(|l| !l.is_empty())
            .map(|l| parse_index(l, A_NAME_COL, a.len()))
            .collect::<Result<Vec<_>>>()?;

        kept.sort_unstable();
        Ok(kept)
    }
}

/// Write intervals as BED6 with the slice index as the name.
fn write_bed<T: GenomicInterval>(path: &Path, intervals: &[T]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create scratch file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    for (i, iv) in intervals.iter().enumerate() {
        writeln!(writer, "{}", format_bed_line(iv, i))?;
    }

    writer.flush()?;
    Ok(())
}

fn format_bed_line<T: GenomicInterval>(iv: &T, index: usize) -> String {
    format!(
        "{}\t{}\t{}\t{}\t0\t{}",
        iv.chrom(),
        (iv.start() - 1).max(0),
        iv.end(),
        index,
        iv.strand()
    )
}

fn parse_pair(line: &str, a_len: usize, b_len: usize) -> Result<(usize, usize)> {
    Ok((
        parse_index(line, A_NAME_COL, a_len)?,
        parse_index(line, B_NAME_COL, b_len)?,
    ))
}

fn parse_index(line: &str, col: usize, len: usize) -> Result<usize> {
    let field = line
        .split('\t')
        .nth(col)
        .with_context(|| format!("Truncated bedtools output line: {}", line))?;
    let index: usize = field
        .parse()
        .with_context(|| format!("Unexpected bedtools name column: {}", field))?;

    if index >= len {
        bail!("bedtools output index {} out of range ({})", index, len);
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::intersect::IndexedIntersect;
    use crate::types::{FeatureInterval, Strand};

    fn iv(chrom: &str, start: i64, end: i64, strand: Strand) -> FeatureInterval {
        FeatureInterval::new(chrom.to_string(), start, end, strand, "G".to_string())
    }

    fn bedtools_available() -> bool {
        BedtoolsIntersect::default().version().is_ok()
    }

    #[test]
    fn test_format_bed_line() {
        let line = format_bed_line(&iv("chr1", 100, 200, Strand::Negative), 7);
        assert_eq!(line, "chr1\t99\t200\t7\t0\t-");

        // Windows reaching below position 1 are clamped
        let line = format_bed_line(&iv("chr1", -5, 15, Strand::Positive), 0);
        assert_eq!(line, "chr1\t0\t15\t0\t0\t+");
    }

    #[test]
    fn test_parse_pair() {
        let line = "chr1\t99\t200\t3\t0\t+\tchr1\t149\t250\t12\t0\t+";
        assert_eq!(parse_pair(line, 4, 13).unwrap(), (3, 12));
        assert!(parse_pair(line, 3, 13).is_err());
        assert!(parse_pair("chr1\t99\t200", 4, 13).is_err());
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let engine = BedtoolsIntersect::new("/nonexistent/bedtools");
        let a = vec![iv("chr1", 100, 200, Strand::Positive)];
        assert!(engine.overlap(&a, &a).is_err());
        assert!(engine.version().is_err());
    }

    #[test]
    fn test_empty_inputs_skip_subprocess() {
        // The program never runs, so a bogus path still succeeds
        let engine = BedtoolsIntersect::new("/nonexistent/bedtools");
        let a = vec![iv("chr1", 100, 200, Strand::Positive)];
        let empty: Vec<FeatureInterval> = Vec::new();

        assert!(engine.overlap(&a, &empty).unwrap().is_empty());
        assert_eq!(engine.subtract(&a, &empty).unwrap(), vec![0]);
        assert!(engine.subtract(&empty, &a).unwrap().is_empty());
    }

    #[cfg(unix)]
    fn stand_in(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("data")
            .join(name)
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_intersect_is_an_error() {
        let engine = BedtoolsIntersect::new(stand_in("bedtools_failing.sh"));
        assert!(engine.version().unwrap().starts_with("bedtools"));

        let a = vec![iv("chr1", 100, 200, Strand::Positive)];
        let err = engine.overlap(&a, &a).unwrap_err().to_string();
        assert!(err.contains("bedtools intersect exited"));
        assert!(err.contains("boom"));
        assert!(engine.subtract(&a, &a).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_output_rows_are_mapped_sorted_and_deduped() {
        let engine = BedtoolsIntersect::new(stand_in("bedtools_canned.sh"));
        let a = vec![
            iv("chr1", 100, 200, Strand::Positive),
            iv("chr1", 300, 400, Strand::Positive),
            iv("chr1", 500, 600, Strand::Positive),
        ];
        let b = vec![
            iv("chr1", 150, 250, Strand::Positive),
            iv("chr1", 350, 450, Strand::Positive),
            iv("chr1", 550, 650, Strand::Positive),
        ];

        assert_eq!(engine.overlap(&a, &b).unwrap(), vec![(0, 2), (2, 0), (2, 1)]);
        assert_eq!(engine.subtract(&a, &b).unwrap(), vec![0, 2]);
    }

    #[cfg(unix)]
    #[test]
    fn test_output_index_out_of_range_is_an_error() {
        let engine = BedtoolsIntersect::new(stand_in("bedtools_canned.sh"));
        let a = vec![
            iv("chr1", 100, 200, Strand::Positive),
            iv("chr1", 300, 400, Strand::Positive),
        ];
        let err = engine.overlap(&a, &a).unwrap_err().to_string();
        assert!(err.contains("out of range"));
    }

    #[test]
    fn test_agrees_with_indexed_engine() {
        if !bedtools_available() {
            eprintln!("bedtools not found on PATH, skipping");
            return;
        }

        let a = vec![
            iv("chr1", 100, 200, Strand::Positive),
            iv("chr1", 300, 400, Strand::Positive),
            iv("chr1", 100, 200, Strand::Negative),
            iv("chr2", 1, 10, Strand::Positive),
        ];
        let b = vec![
            iv("chr1", 200, 250, Strand::Positive),
            iv("chr1", 50, 99, Strand::Positive),
            iv("chr1", 150, 160, Strand::Negative),
            iv("chr2", -5, 1, Strand::Positive),
        ];

        let bedtools = BedtoolsIntersect::default();
        let indexed = IndexedIntersect::new();
        assert_eq!(
            bedtools.overlap(&a, &b).unwrap(),
            indexed.overlap(&a, &b).unwrap()
        );
        assert_eq!(
            bedtools.subtract(&a, &b).unwrap(),
            indexed.subtract(&a, &b).unwrap()
        );
    }
}
