//! GTF gene-model indexer with gzip support.
//!
//! Parses GTF (Gene Transfer Format) annotation files into the per-gene
//! envelopes, coding bounds, and directly observable structure records
//! (exons and UTRs) used for peak annotation.

use ahash::AHashMap;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::io::BufRead;
use std::path::Path;

use crate::config::Config;
use crate::parser::util::open_reader;
use crate::types::{CodingBounds, Feature, FeatureInterval, GeneEnvelope, GeneKey, Strand};

/// Indexed gene model of one annotation file.
#[derive(Debug, Clone, Default)]
pub struct GeneModel {
    /// First envelope record per gene, in first-seen order.
    pub envelopes: IndexMap<GeneKey, GeneEnvelope>,
    /// Running coding bounds per gene, in first-seen order.
    pub coding_bounds: IndexMap<GeneKey, CodingBounds>,
    /// Exon and UTR records in file order, by category.
    pub structures: AHashMap<Feature, Vec<FeatureInterval>>,
}

impl GeneModel {
    /// Records read directly for `feature` (empty for synthesized categories).
    pub fn structure(&self, feature: Feature) -> &[FeatureInterval] {
        self.structures
            .get(&feature)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// One-line count summary for logging.
    pub fn summary(&self) -> String {
        format!(
            "{} gene envelopes, {} coding genes, {} exons, {} 5'UTRs, {} 3'UTRs",
            self.envelopes.len(),
            self.coding_bounds.len(),
            self.structure(Feature::Exon).len(),
            self.structure(Feature::FivePrimeUtr).len(),
            self.structure(Feature::ThreePrimeUtr).len(),
        )
    }
}

/// Parse a GTF file into a gene model.
///
/// Supports both plain text and gzip-compressed GTF files.
pub fn parse_gtf(path: &Path, config: &Config) -> Result<GeneModel> {
    let reader = open_reader(path, "GTF")?;
    parse_gtf_reader(reader, config)
}

/// Parse GTF data from a reader.
pub fn parse_gtf_reader<R: BufRead>(reader: R, config: &Config) -> Result<GeneModel> {
    config.validate()?;
    let mut model = GeneModel::default();

    // GTF feature type -> category, for the records kept verbatim
    let direct: Vec<(&'static str, Feature)> = Feature::DIRECT
        .iter()
        .filter_map(|f| f.gtf_feature_type().map(|t| (t, *f)))
        .collect();

    for (line_no, line_result) in reader.lines().enumerate() {
        let line = line_result.context("Failed to read GTF line")?;

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.trim_end().split('\t').collect();
        if fields.len() < 9 {
            continue;
        }

        let chrom = fields[0];
        let feature_type = fields[2];
        let start: i64 = fields[3]
            .parse()
            .with_context(|| format!("Failed to parse start coordinate on line {}", line_no + 1))?;
        let end: i64 = fields[4]
            .parse()
            .with_context(|| format!("Failed to parse end coordinate on line {}", line_no + 1))?;
        let attributes = fields[8];

        let strand = match fields[6].parse::<Strand>() {
            Ok(s) => s,
            Err(_) => continue, // Skip entries without valid strand
        };

        let gene_id = match extract_attribute(attributes, &config.gene_id_tag) {
            Some(id) => id,
            None => continue,
        };

        if feature_type == config.envelope_feature {
            let key = GeneKey::new(chrom.to_string(), strand, gene_id);
            model
                .envelopes
                .entry(key)
                .or_insert(GeneEnvelope { start, end });
        } else if feature_type == config.coding_feature {
            let key = GeneKey::new(chrom.to_string(), strand, gene_id);
            model
                .coding_bounds
                .entry(key)
                .and_modify(|b| b.extend(start, end))
                .or_insert(CodingBounds::new(start, end));
        } else if let Some((_, feature)) = direct.iter().find(|(t, _)| *t == feature_type) {
            model
                .structures
                .entry(*feature)
                .or_default()
                .push(FeatureInterval::new(
                    chrom.to_string(),
                    start,
                    end,
                    strand,
                    gene_id,
                ));
        }
    }

    Ok(model)
}

/// Extract an attribute value from the GTF attributes string.
///
/// GTF attributes are in the format: key "value"; key "value"; ...
/// Only a whole key matches (`gene_id` does not match `pseudo_gene_id`),
/// and an empty value counts as missing.
pub fn extract_attribute(attributes: &str, key: &str) -> Option<String> {
    for attr in attributes.split(';') {
        let attr = attr.trim();
        let Some(rest) = attr.strip_prefix(key) else {
            continue;
        };
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }

        // Value between the first pair of quotes
        let rest = rest.trim_start();
        let value = rest.strip_prefix('"')?;
        let closing = value.find('"')?;
        let value = &value[..closing];

        return if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        };
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn parse(content: &str) -> GeneModel {
        let reader = BufReader::new(content.as_bytes());
        parse_gtf_reader(reader, &Config::default()).unwrap()
    }

    fn key(chrom: &str, strand: Strand, gene: &str) -> GeneKey {
        GeneKey::new(chrom.to_string(), strand, gene.to_string())
    }

    #[test]
    fn test_extract_attribute() {
        let attrs = r#"gene_id "CsaV3_1G000010"; transcript_id "CsaV3_1G000010.1"; gene_type "protein_coding";"#;

        assert_eq!(
            extract_attribute(attrs, "gene_id"),
            Some("CsaV3_1G000010".to_string())
        );
        assert_eq!(
            extract_attribute(attrs, "transcript_id"),
            Some("CsaV3_1G000010.1".to_string())
        );
        assert_eq!(extract_attribute(attrs, "nonexistent"), None);
    }

    #[test]
    fn test_extract_attribute_whole_key_only() {
        let attrs = r#"ref_gene_id "R1"; gene_id "G1";"#;
        assert_eq!(extract_attribute(attrs, "gene_id"), Some("G1".to_string()));

        let attrs = r#"gene_idx "X"; transcript_id "T1";"#;
        assert_eq!(extract_attribute(attrs, "gene_id"), None);
    }

    #[test]
    fn test_extract_attribute_empty_value() {
        assert_eq!(extract_attribute(r#"gene_id ""; transcript_id "T1";"#, "gene_id"), None);
        assert_eq!(extract_attribute("gene_id G1;", "gene_id"), None);
    }

    #[test]
    fn test_envelope_first_seen_wins() {
        let model = parse(
            "chr1\tsrc\tmRNA\t100\t500\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";\n\
             chr1\tsrc\tmRNA\t50\t900\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T2\";\n",
        );

        assert_eq!(model.envelopes.len(), 1);
        assert_eq!(
            model.envelopes[&key("chr1", Strand::Positive, "G1")],
            GeneEnvelope { start: 100, end: 500 }
        );
    }

    #[test]
    fn test_coding_bounds_are_strand_agnostic() {
        let model = parse(
            "chr1\tsrc\tCDS\t300\t400\t.\t-\t0\tgene_id \"G2\";\n\
             chr1\tsrc\tCDS\t100\t200\t.\t-\t0\tgene_id \"G2\";\n\
             chr1\tsrc\tCDS\t600\t700\t.\t-\t0\tgene_id \"G2\";\n\
             chr1\tsrc\tCDS\t10\t20\t.\t+\t0\tgene_id \"G1\";\n",
        );

        assert_eq!(
            model.coding_bounds[&key("chr1", Strand::Negative, "G2")],
            CodingBounds::new(100, 700)
        );
        assert_eq!(
            model.coding_bounds[&key("chr1", Strand::Positive, "G1")],
            CodingBounds::new(10, 20)
        );
        // First-seen order
        let first = model.coding_bounds.keys().next().unwrap();
        assert_eq!(first.gene_id, "G2");
    }

    #[test]
    fn test_same_gene_id_on_two_strands_is_two_genes() {
        let model = parse(
            "chr1\tsrc\tmRNA\t100\t500\t.\t+\t.\tgene_id \"G1\";\n\
             chr1\tsrc\tmRNA\t100\t500\t.\t-\t.\tgene_id \"G1\";\n",
        );
        assert_eq!(model.envelopes.len(), 2);
    }

    #[test]
    fn test_structures_in_file_order() {
        let model = parse(
            "chr1\tsrc\texon\t500\t600\t.\t+\t.\tgene_id \"G1\";\n\
             chr1\tsrc\tthree_prime_utr\t550\t600\t.\t+\t.\tgene_id \"G1\";\n\
             chr1\tsrc\texon\t100\t200\t.\t+\t.\tgene_id \"G1\";\n\
             chr1\tsrc\tfive_prime_utr\t100\t120\t.\t+\t.\tgene_id \"G1\";\n\
             chr1\tsrc\tstart_codon\t121\t123\t.\t+\t.\tgene_id \"G1\";\n",
        );

        let exons = model.structure(Feature::Exon);
        assert_eq!(exons.len(), 2);
        assert_eq!(exons[0].start, 500);
        assert_eq!(exons[1].start, 100);
        assert_eq!(model.structure(Feature::ThreePrimeUtr).len(), 1);
        assert_eq!(model.structure(Feature::FivePrimeUtr)[0].end, 120);
        // Codon records are not read; they are synthesized from coding bounds
        assert!(model.structure(Feature::StartCodon).is_empty());
    }

    #[test]
    fn test_skips_comments_short_lines_and_bad_records() {
        let model = parse(
            "##gff-version 2\n\
             #comment\n\
             chr1\tsrc\texon\t100\n\
             chr1\tsrc\texon\t100\t200\t.\t.\t.\tgene_id \"G1\";\n\
             chr1\tsrc\texon\t100\t200\t.\t+\t.\ttranscript_id \"T1\";\n\
             chr1\tsrc\texon\t300\t400\t.\t+\t.\tgene_id \"G1\";\n",
        );

        let exons = model.structure(Feature::Exon);
        assert_eq!(exons.len(), 1);
        assert_eq!(exons[0].start, 300);
    }

    #[test]
    fn test_bad_coordinate_is_fatal() {
        let reader = BufReader::new(
            "chr1\tsrc\texon\tabc\t200\t.\t+\t.\tgene_id \"G1\";\n".as_bytes(),
        );
        let err = parse_gtf_reader(reader, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_custom_feature_types_and_tag() {
        let mut config = Config::default();
        config.envelope_feature = "transcript".to_string();
        config.gene_id_tag = "gene_name".to_string();

        let reader = BufReader::new(
            "chr1\tsrc\ttranscript\t100\t500\t.\t+\t.\tgene_id \"G1\"; gene_name \"ABC\";\n\
             chr1\tsrc\tmRNA\t1\t5000\t.\t+\t.\tgene_id \"G2\"; gene_name \"XYZ\";\n"
                .as_bytes(),
        );
        let model = parse_gtf_reader(reader, &config).unwrap();

        assert_eq!(model.envelopes.len(), 1);
        assert!(model
            .envelopes
            .contains_key(&key("chr1", Strand::Positive, "ABC")));
    }

    #[test]
    fn test_overlapping_feature_roles_rejected() {
        let mut config = Config::default();
        config.envelope_feature = "exon".to_string();

        let reader = BufReader::new(
            "chr1\tsrc\texon\t100\t500\t.\t+\t.\tgene_id \"G1\";\n".as_bytes(),
        );
        let err = parse_gtf_reader(reader, &config).unwrap_err();
        assert!(err.to_string().contains("exon"));
    }

    #[test]
    fn test_summary() {
        let model = parse(
            "chr1\tsrc\tmRNA\t100\t500\t.\t+\t.\tgene_id \"G1\";\n\
             chr1\tsrc\tCDS\t150\t450\t.\t+\t0\tgene_id \"G1\";\n\
             chr1\tsrc\texon\t100\t500\t.\t+\t.\tgene_id \"G1\";\n",
        );
        assert_eq!(
            model.summary(),
            "1 gene envelopes, 1 coding genes, 1 exons, 0 5'UTRs, 0 3'UTRs"
        );
    }
}
