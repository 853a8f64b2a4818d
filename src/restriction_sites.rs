//! Detection of type IIS recognition sites and the reading-frame codons
//! they span.

use crate::GENETIC_CODE;
use crate::codon_usage::CodonUsageTable;
use crate::dna::reverse_complement;
use crate::progress::{Extra, ProgressSink, fields};
use serde::{Serialize, Serializer};
use serde_json::json;
use std::fmt;

pub const STEP: &str = "Restriction Sites";

/// Bases of flanking sequence captured on each side of a recognition site.
pub const CONTEXT_RADIUS: usize = 30;

/// The Golden Gate enzymes this pipeline domesticates against. Both carry
/// 6-nt non-palindromic recognition sequences, so each strand is scanned
/// separately.
pub const ENZYMES: [(&str, &str); 2] = [("BsmBI", "CGTCTC"), ("BsaI", "GGTCTC")];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
}

/// One reading-frame codon overlapping a recognition site, positioned
/// relative to the site's context window.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Codon {
    pub amino_acid: char,
    /// Start of this codon within the context window.
    pub context_position: usize,
    pub codon_sequence: String,
    /// Indices within the codon (0..3) that fall inside the recognition
    /// sequence. Always non-empty.
    pub rs_overlap: Vec<usize>,
    pub usage: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictionSite {
    /// 0-based start of the matched pattern on the top strand.
    pub position: usize,
    pub frame: usize,
    pub strand: Strand,
    pub enzyme: String,
    /// The pattern as it reads on the top strand (the reverse complement of
    /// the enzyme's recognition sequence for minus-strand hits).
    pub recognition_seq: String,
    pub context_seq: String,
    /// Indices of the recognition sequence within the context window.
    pub context_rs_indices: Vec<usize>,
    /// Start of the context window on the full sequence.
    pub context_start: usize,
    pub codons: Vec<Codon>,
}

/// Identity of a detected site throughout the pipeline. Ordered by position
/// so that keyed maps iterate sites 5' to 3'.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SiteKey {
    pub position: usize,
    pub enzyme: String,
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mutation_{}", self.position)
    }
}

impl Serialize for SiteKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl RestrictionSite {
    pub fn key(&self) -> SiteKey {
        SiteKey {
            position: self.position,
            enzyme: self.enzyme.clone(),
        }
    }
}

pub struct RestrictionSiteDetector<'a> {
    pub codon_usage: &'a CodonUsageTable,
}

impl<'a> RestrictionSiteDetector<'a> {
    pub fn new(codon_usage: &'a CodonUsageTable) -> Self {
        Self { codon_usage }
    }

    /// Scans both strands of `sequence` for every enzyme in [`ENZYMES`] and
    /// returns the hits in ascending position order. The sequence is
    /// expected to be in frame 0 (codon starts at multiples of 3).
    pub fn find_sites(&self, sequence: &str, sink: &dyn ProgressSink) -> Vec<RestrictionSite> {
        sink.report(STEP, "Scanning for restriction sites", 0, &Extra::new());

        let upper = sequence.to_ascii_uppercase();
        let mut sites = Vec::new();
        for (enzyme, recognition) in ENZYMES {
            for (pattern, strand) in [
                (recognition.to_string(), Strand::Plus),
                (reverse_complement(recognition), Strand::Minus),
            ] {
                for position in find_pattern(&upper, &pattern) {
                    sites.push(self.build_site(&upper, enzyme, &pattern, strand, position));
                }
            }
        }
        sites.sort_by_key(|s| s.position);

        if sites.is_empty() {
            sink.report(
                STEP,
                "No restriction sites found",
                100,
                &fields(&[
                    ("callout", json!("No restriction sites found in the sequence.")),
                    ("notificationCount", json!(1)),
                ]),
            );
        } else {
            log::debug!("{} restriction site(s) detected", sites.len());
            sink.report(
                STEP,
                &format!("Restriction sites detected: {}", sites.len()),
                100,
                &fields(&[
                    ("restrictionSites", json!(sites.len())),
                    ("notificationCount", json!(sites.len())),
                ]),
            );
        }
        sites
    }

    fn build_site(
        &self,
        sequence: &str,
        enzyme: &str,
        pattern: &str,
        strand: Strand,
        position: usize,
    ) -> RestrictionSite {
        let site_len = pattern.len();
        let context_start = position.saturating_sub(CONTEXT_RADIUS);
        let context_end = (position + site_len + CONTEXT_RADIUS).min(sequence.len());
        let frame = position % 3;
        RestrictionSite {
            position,
            frame,
            strand,
            enzyme: enzyme.to_string(),
            recognition_seq: pattern.to_string(),
            context_seq: sequence[context_start..context_end].to_string(),
            context_rs_indices: (position - context_start..position - context_start + site_len)
                .collect(),
            context_start,
            codons: self.spanned_codons(sequence, position, site_len, context_start),
        }
    }

    /// Frame-aligned codons overlapping the recognition sequence. Codon
    /// starts derive from the site's frame; codons truncated by either end
    /// of the sequence are skipped.
    fn spanned_codons(
        &self,
        sequence: &str,
        position: usize,
        site_len: usize,
        context_start: usize,
    ) -> Vec<Codon> {
        let pos = position as isize;
        let starts: Vec<isize> = match position % 3 {
            0 => vec![pos, pos + 3],
            1 => vec![pos - 1, pos + 2, pos + 5],
            _ => vec![pos - 2, pos + 1, pos + 4],
        };
        let len = sequence.len() as isize;
        let mut codons = Vec::new();
        for start in starts {
            if start < 0 || start + 3 > len {
                continue;
            }
            let start = start as usize;
            let codon_sequence = sequence[start..start + 3].to_string();
            let rs_overlap: Vec<usize> = (0..3)
                .filter(|i| {
                    let base = start + i;
                    base >= position && base < position + site_len
                })
                .collect();
            if rs_overlap.is_empty() {
                continue;
            }
            let amino_acid = GENETIC_CODE.translate(&codon_sequence);
            codons.push(Codon {
                amino_acid,
                context_position: start - context_start,
                codon_sequence: codon_sequence.clone(),
                rs_overlap,
                usage: self.codon_usage.usage(&codon_sequence, amino_acid),
            });
        }
        codons
    }
}

/// All start indices of `pattern` in `haystack`, overlapping matches
/// included.
fn find_pattern(haystack: &str, pattern: &str) -> Vec<usize> {
    let haystack = haystack.as_bytes();
    let pattern = pattern.as_bytes();
    if pattern.is_empty() || haystack.len() < pattern.len() {
        return Vec::new();
    }
    (0..=haystack.len() - pattern.len())
        .filter(|&i| &haystack[i..i + pattern.len()] == pattern)
        .collect()
}
