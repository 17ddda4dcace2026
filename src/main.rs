//! CLI entry point for peakanno.
//!
//! Annotates forward- and reverse-strand peak tables against their gene
//! models and writes one merged table.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use peakanno::annotate::{annotate_peaks, AnnotationTable, BedtoolsIntersect, IndexedIntersect, IntersectEngine};
use peakanno::config::{Config, MAX_CODON_FLANK};
use peakanno::output::{aggregate, write_results};
use peakanno::parser::{parse_gtf, parse_peaks};
use peakanno::types::Strand;

/// Interval intersection backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Engine {
    /// In-process sorted index
    Native,
    /// `bedtools intersect` subprocess
    Bedtools,
}

/// Genomic peak feature annotation tool.
///
/// Assigns every peak to the highest-priority gene feature it overlaps.
#[derive(Parser, Debug)]
#[command(name = "peakanno")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Forward-strand peak table
    #[arg(short = 'p', long = "peaks-fwd")]
    peaks_fwd: Option<PathBuf>,

    /// Reverse-strand peak table
    #[arg(short = 'n', long = "peaks-rev")]
    peaks_rev: Option<PathBuf>,

    /// GTF annotation used for both strands
    #[arg(short = 'g', long = "gtf")]
    gtf: Option<PathBuf>,

    /// GTF annotation for forward-strand peaks (overrides --gtf)
    #[arg(long = "gtf-fwd")]
    gtf_fwd: Option<PathBuf>,

    /// GTF annotation for reverse-strand peaks (overrides --gtf)
    #[arg(long = "gtf-rev")]
    gtf_rev: Option<PathBuf>,

    /// Output file (required)
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// GTF tag for gene ID
    #[arg(short = 'G', long = "gene", default_value = "gene_id")]
    gene_tag: String,

    /// GTF feature type defining gene envelopes
    #[arg(long = "envelope-feature", default_value = "mRNA")]
    envelope_feature: String,

    /// GTF feature type of coding segments
    #[arg(long = "coding-feature", default_value = "CDS")]
    coding_feature: String,

    /// Half-width in bp of start/stop codon windows
    #[arg(long = "codon-flank", default_value = "10")]
    codon_flank: i64,

    /// Field delimiter of the peak tables
    #[arg(short = 'd', long = "delimiter", default_value = ",")]
    delimiter: char,

    /// Intersection backend
    #[arg(short = 'e', long = "engine", value_enum, default_value = "native")]
    engine: Engine,

    /// bedtools executable for --engine bedtools
    #[arg(long = "bedtools", default_value = "bedtools")]
    bedtools: PathBuf,

    /// Number of worker threads (0 = auto-detect)
    #[arg(long = "threads", short = 'j', default_value = "8")]
    threads: usize,
}

/// One strand's inputs.
struct StrandRun {
    strand: Strand,
    peaks: PathBuf,
    gtf: PathBuf,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let start = Instant::now();

    let runs = strand_runs(&args)?;

    // Build configuration
    let mut config = Config::new();
    config.gene_id_tag = args.gene_tag.clone();
    config.envelope_feature = args.envelope_feature.clone();
    config.coding_feature = args.coding_feature.clone();
    config.peak_delimiter = args.delimiter;
    if !config.set_codon_flank(args.codon_flank) {
        bail!(
            "The codon flank must be between 0 and {} bps.",
            MAX_CODON_FLANK
        );
    }
    config.validate()?;
    debug!("Codon windows span {} bp", config.codon_window_width());

    // Determine thread count
    let num_threads = if args.threads == 0 {
        num_cpus::get()
    } else {
        args.threads
    };
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .context("Failed to create thread pool")?;
    debug!("Using {} threads", num_threads);

    let table = match args.engine {
        Engine::Native => run_all(&runs, &IndexedIntersect::new(), &config)?,
        Engine::Bedtools => {
            let engine = BedtoolsIntersect::new(args.bedtools.clone());
            let version = engine
                .version()
                .context("bedtools is required for --engine bedtools")?;
            info!("Using {}", version);
            run_all(&runs, &engine, &config)?
        }
    };

    let rows = aggregate(table.into_entries());

    // Nothing is written until every strand has been annotated
    let file = File::create(&args.output).context("Failed to create output file")?;
    let mut writer = BufWriter::new(file);
    let written = write_results(&mut writer, &rows)?;
    writer.flush()?;

    info!(
        "Wrote {} annotated peaks to {}",
        written,
        args.output.display()
    );
    info!("Elapsed time: {:.3?}", start.elapsed());
    Ok(())
}

/// Log at info level unless RUST_LOG says otherwise.
fn init_logging() {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
}

/// Pair each supplied peak table with its annotation and validate paths.
fn strand_runs(args: &Args) -> Result<Vec<StrandRun>> {
    let mut runs = Vec::new();

    let specs = [
        (Strand::Positive, &args.peaks_fwd, &args.gtf_fwd, "--gtf-fwd"),
        (Strand::Negative, &args.peaks_rev, &args.gtf_rev, "--gtf-rev"),
    ];

    for (strand, peaks, gtf_override, flag) in specs {
        let Some(peaks) = peaks else {
            continue;
        };
        let Some(gtf) = gtf_override.as_ref().or(args.gtf.as_ref()) else {
            bail!("No annotation for {} strand peaks: pass --gtf or {}", strand, flag);
        };

        check_exists(peaks, "Peak table")?;
        check_exists(gtf, "GTF file")?;

        runs.push(StrandRun {
            strand,
            peaks: peaks.clone(),
            gtf: gtf.clone(),
        });
    }

    if runs.is_empty() {
        bail!("At least one of --peaks-fwd or --peaks-rev is required.");
    }

    Ok(runs)
}

fn check_exists(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        bail!("{} not found: {}", what, path.display());
    }
    Ok(())
}

/// Annotate every strand run in order and merge the results.
fn run_all<E: IntersectEngine>(
    runs: &[StrandRun],
    engine: &E,
    config: &Config,
) -> Result<AnnotationTable> {
    let mut merged = AnnotationTable::new();

    for run in runs {
        let table = run_strand(run, engine, config)?;
        merged.merge(table);
    }

    if merged.is_empty() {
        warn!("No peaks were read; the output will only hold the header");
    }

    Ok(merged)
}

fn run_strand<E: IntersectEngine>(
    run: &StrandRun,
    engine: &E,
    config: &Config,
) -> Result<AnnotationTable> {
    info!("Processing {} strand", run.strand);

    info!("Parsing GTF file: {}", run.gtf.display());
    let model = parse_gtf(&run.gtf, config)?;
    info!("  {}", model.summary());

    info!("Parsing peak table: {}", run.peaks.display());
    let peaks = parse_peaks(&run.peaks, run.strand, config.peak_delimiter)?;
    info!("  {} peaks", peaks.len());

    let (table, stats) = annotate_peaks(&peaks, &model, engine, config)?;
    for (feature, pairs) in &stats.pairs {
        debug!("  {}: {} overlaps", feature, pairs);
    }
    info!(
        "  Found {} peaks ({} unmatched by gene structure, {} intergenic)",
        table.len(),
        stats.remaining_after_direct,
        stats.intergenic
    );

    Ok(table)
}
