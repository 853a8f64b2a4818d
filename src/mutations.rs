//! Synonymous mutation candidates that destroy a detected recognition site,
//! together with the 4-nt overhang windows each candidate offers.

use crate::GENETIC_CODE;
use crate::codon_usage::CodonUsageTable;
use crate::dna::reverse_complement;
use crate::error::{DomesticationError, Result};
use crate::progress::{Extra, ProgressSink, fields};
use crate::restriction_sites::{Codon, RestrictionSite, SiteKey};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

pub const STEP: &str = "Mutation Analysis";

/// A 4-nt sticky-end window a ligase could join on, anchored inside the
/// mutated context.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverhangOption {
    pub top_overhang: String,
    pub bottom_overhang: String,
    /// Start of the window within the mutated context.
    pub overhang_start_index: usize,
}

/// One codon replaced by a synonymous alternative.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationCodon {
    pub codon: Codon,
    /// Index of the replaced codon within the site's spanned-codon list.
    pub nth_codon_in_rs: usize,
}

/// One domestication candidate: a single spanned codon replaced by a
/// synonymous alternative.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
    /// The swapped codon. A candidate swaps exactly one codon; the list
    /// shape matches the serialized payload.
    pub mut_codons: Vec<MutationCodon>,
    /// Context positions of the replaced codons, parallel to `mut_codons`.
    pub mut_codons_context_start_idx: Vec<usize>,
    /// Offsets of every changed base from the recognition-sequence start.
    /// Negative offsets are changed bases in a spanned codon that hangs
    /// out of the site.
    pub mut_indices_rs: Vec<isize>,
    /// Within-codon indices of the changed bases, parallel to `mut_codons`.
    pub mut_indices_codon: Vec<Vec<usize>>,
    pub mut_context: String,
    pub native_context: String,
    /// First and last changed base, as context indices.
    pub first_mut_idx: usize,
    pub last_mut_idx: usize,
    pub overhang_options: Vec<OverhangOption>,
    pub context_rs_indices: Vec<usize>,
    /// Start of the context window on the full sequence.
    pub context_start: usize,
    pub recognition_seq: String,
    pub enzyme: String,
}

pub struct MutationAnalyzer<'a> {
    codon_usage: &'a CodonUsageTable,
    max_mutations: usize,
}

impl<'a> MutationAnalyzer<'a> {
    pub fn new(codon_usage: &'a CodonUsageTable, max_mutations: usize) -> Self {
        Self {
            codon_usage,
            max_mutations,
        }
    }

    /// Enumerates, per spanned codon, every synonymous alternative that
    /// changes at least one base inside the codon's recognition-site
    /// overlap with at most `max_mutations` base changes. Each qualifying
    /// alternative is its own candidate; codons are never swapped in
    /// combination. Sites with no viable swap are omitted from the result.
    pub fn generate_mutations(
        &self,
        sites: &[RestrictionSite],
        sink: &dyn ProgressSink,
    ) -> Result<BTreeMap<SiteKey, Vec<Mutation>>> {
        sink.report(STEP, "Generating mutation candidates", 0, &Extra::new());

        // Upper bound on the alternatives to examine, so progress can tick
        // proportionally and stay below 100 until the final report.
        let estimate: usize = sites
            .iter()
            .flat_map(|site| &site.codons)
            .map(|codon| {
                GENETIC_CODE
                    .synonymous_codons(codon.amino_acid)
                    .len()
                    .saturating_sub(1)
            })
            .sum::<usize>()
            .max(1);

        let mut by_site = BTreeMap::new();
        let mut examined = 0usize;
        for site in sites {
            let mutations = self.mutations_for_site(site, sink, &mut examined, estimate)?;
            if mutations.is_empty() {
                log::warn!(
                    "no disruptive synonymous mutation for {} site at {}",
                    site.enzyme,
                    site.position
                );
                continue;
            }
            by_site.insert(site.key(), mutations);
        }

        let total_mutations: usize = by_site.values().map(Vec::len).sum();
        sink.report(
            STEP,
            &format!("Mutation analysis complete: {total_mutations} candidate(s)"),
            100,
            &fields(&[
                ("mutationCount", json!(total_mutations)),
                ("siteCount", json!(by_site.len())),
            ]),
        );
        Ok(by_site)
    }

    fn mutations_for_site(
        &self,
        site: &RestrictionSite,
        sink: &dyn ProgressSink,
        examined: &mut usize,
        estimate: usize,
    ) -> Result<Vec<Mutation>> {
        let mut mutations = Vec::new();
        for (nth, codon) in site.codons.iter().enumerate() {
            for alternative in GENETIC_CODE.synonymous_codons(codon.amino_acid) {
                if *alternative == codon.codon_sequence {
                    continue;
                }
                *examined += 1;
                let percent = ((*examined * 99) / estimate).min(99) as u8;
                sink.report(
                    STEP,
                    &format!(
                        "Evaluating alternative codon {alternative} for site at position {}",
                        site.position
                    ),
                    percent,
                    &Extra::new(),
                );

                let diff: Vec<usize> = codon
                    .codon_sequence
                    .bytes()
                    .zip(alternative.bytes())
                    .enumerate()
                    .filter(|(_, (a, b))| a != b)
                    .map(|(i, _)| i)
                    .collect();
                if diff.len() > self.max_mutations {
                    continue;
                }
                if !diff.iter().any(|i| codon.rs_overlap.contains(i)) {
                    continue;
                }
                mutations.push(self.build_mutation(site, nth, alternative, &diff)?);
            }
        }
        Ok(mutations)
    }

    fn build_mutation(
        &self,
        site: &RestrictionSite,
        nth: usize,
        alternative: &'static str,
        diff: &[usize],
    ) -> Result<Mutation> {
        let native = &site.codons[nth];
        let start = native.context_position;
        let mut mut_context = site.context_seq.clone().into_bytes();
        if start + 3 > mut_context.len() {
            return Err(DomesticationError::ContextBounds {
                position: start,
                context_len: mut_context.len(),
            });
        }
        mut_context[start..start + 3].copy_from_slice(alternative.as_bytes());

        let rs_context_start = site.position as isize - site.context_start as isize;
        let changed: Vec<usize> = diff.iter().map(|&i| start + i).collect();
        let indices_rs = changed
            .iter()
            .map(|&idx| idx as isize - rs_context_start)
            .collect();

        let mut_context =
            String::from_utf8(mut_context).unwrap_or_else(|_| site.context_seq.clone());
        let first_mut_idx = changed.iter().copied().min().unwrap_or(0);
        let last_mut_idx = changed.iter().copied().max().unwrap_or(0);
        let overhang_options = sticky_end_options(&mut_context, first_mut_idx, last_mut_idx);

        Ok(Mutation {
            mut_codons: vec![MutationCodon {
                codon: Codon {
                    amino_acid: native.amino_acid,
                    context_position: start,
                    codon_sequence: alternative.to_string(),
                    rs_overlap: native.rs_overlap.clone(),
                    usage: self.codon_usage.usage(alternative, native.amino_acid),
                },
                nth_codon_in_rs: nth,
            }],
            mut_codons_context_start_idx: vec![start],
            mut_indices_rs: indices_rs,
            mut_indices_codon: vec![diff.to_vec()],
            mut_context,
            native_context: site.context_seq.clone(),
            first_mut_idx,
            last_mut_idx,
            overhang_options,
            context_rs_indices: site.context_rs_indices.clone(),
            context_start: site.context_start,
            recognition_seq: site.recognition_seq.clone(),
            enzyme: site.enzyme.clone(),
        })
    }
}

/// The sliding 4-nt windows that still cover a changed base: four alignments
/// each around the first and last changed positions, de-duplicated (a single
/// changed base yields one set of four). Windows keep at least one context
/// base on each side so a primer clamp can flank the overhang; windows flush
/// with a context boundary are dropped.
fn sticky_end_options(mut_context: &str, first: usize, last: usize) -> Vec<OverhangOption> {
    if mut_context.len() < 6 {
        return Vec::new();
    }
    let max_start = mut_context.len() - 5;
    let mut anchors = vec![first];
    if last != first {
        anchors.push(last);
    }
    let mut starts: Vec<usize> = Vec::new();
    for anchor in anchors {
        for start in anchor.saturating_sub(3).max(1)..=anchor.min(max_start) {
            if !starts.contains(&start) {
                starts.push(start);
            }
        }
    }
    starts.sort_unstable();
    starts
        .into_iter()
        .map(|start| {
            let top = &mut_context[start..start + 4];
            OverhangOption {
                top_overhang: top.to_string(),
                bottom_overhang: reverse_complement(top),
                overhang_start_index: start,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{MemorySink, NullSink};
    use crate::restriction_sites::RestrictionSiteDetector;

    fn analyze(sequence: &str, max_mutations: usize) -> BTreeMap<SiteKey, Vec<Mutation>> {
        let usage = CodonUsageTable::builtin_e_coli();
        let sites = RestrictionSiteDetector::new(&usage).find_sites(sequence, &NullSink);
        MutationAnalyzer::new(&usage, max_mutations)
            .generate_mutations(&sites, &NullSink)
            .unwrap()
    }

    #[test]
    fn test_single_base_candidates_frame0() {
        // CGT (Arg) and CTC (Leu) sit fully inside the site. With the
        // base-change ceiling at 1, only the one-base alternatives qualify:
        // CGC/CGA/CGG for Arg, CTT/CTA/CTG for Leu.
        let seq = format!("{}CGTCTC{}", "GCT".repeat(10), "GCT".repeat(10));
        let by_site = analyze(&seq, 1);
        assert_eq!(by_site.len(), 1);
        let mutations = by_site.values().next().unwrap();
        assert_eq!(mutations.len(), 6);
        for m in mutations {
            assert_eq!(m.mut_indices_rs.len(), 1);
        }
    }

    #[test]
    fn test_candidates_swap_exactly_one_codon() {
        // Raising the ceiling admits the two-base alternatives (AGA/AGG for
        // Arg, TTA/TTG for Leu) but never combines swaps across codons.
        let seq = format!("{}CGTCTC{}", "GCT".repeat(10), "GCT".repeat(10));
        let by_site = analyze(&seq, 2);
        let mutations = by_site.values().next().unwrap();
        assert_eq!(mutations.len(), 10);
        for m in mutations {
            assert_eq!(m.mut_codons.len(), 1);
            assert_eq!(m.mut_codons_context_start_idx.len(), 1);
            assert_eq!(m.mut_indices_codon.len(), 1);
        }
    }

    #[test]
    fn test_max_mutations_caps_base_changes_per_candidate() {
        let seq = format!("{}CGTCTC{}", "GCT".repeat(10), "GCT".repeat(10));
        for m in analyze(&seq, 1).values().flatten() {
            assert!(m.mut_indices_codon[0].len() <= 1);
        }
        let change_counts: Vec<usize> = analyze(&seq, 2)
            .values()
            .flatten()
            .map(|m| m.mut_indices_codon[0].len())
            .collect();
        assert!(change_counts.iter().any(|&n| n == 2));
        assert!(change_counts.iter().all(|&n| n <= 2));
    }

    #[test]
    fn test_progress_ticks_during_enumeration() {
        let usage = CodonUsageTable::builtin_e_coli();
        let seq = format!("{}CGTCTC{}", "GCT".repeat(10), "GCT".repeat(10));
        let sites = RestrictionSiteDetector::new(&usage).find_sites(&seq, &NullSink);
        let sink = MemorySink::new();
        MutationAnalyzer::new(&usage, 1)
            .generate_mutations(&sites, &sink)
            .unwrap();
        let percents = sink.percents_for_step(STEP);
        assert_eq!(percents.first(), Some(&0));
        assert_eq!(percents.last(), Some(&100));
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        // Ten alternatives across the two spanned codons: one tick each,
        // all capped below the final report.
        let ticks = &percents[1..percents.len() - 1];
        assert_eq!(ticks.len(), 10);
        assert!(ticks.iter().all(|&p| p < 100));
        assert!(ticks.windows(2).any(|w| w[1] > w[0]));
    }

    #[test]
    fn test_every_candidate_destroys_the_site() {
        let seq = format!("{}CGTCTC{}", "GCT".repeat(10), "GCT".repeat(10));
        for mutations in analyze(&seq, 2).values() {
            for m in mutations {
                let window_start = m.context_rs_indices[0];
                let window = &m.mut_context[window_start..window_start + 6];
                assert_ne!(window, m.recognition_seq);
            }
        }
    }

    #[test]
    fn test_candidates_are_synonymous() {
        let seq = format!("{}CGTCTC{}", "GCT".repeat(10), "GCT".repeat(10));
        for mutations in analyze(&seq, 2).values() {
            for m in mutations {
                for (mc, diffs) in m.mut_codons.iter().zip(&m.mut_indices_codon) {
                    assert_eq!(
                        GENETIC_CODE.translate(&mc.codon.codon_sequence),
                        mc.codon.amino_acid
                    );
                    // Every swap touches the recognition sequence.
                    assert!(diffs.iter().any(|i| mc.codon.rs_overlap.contains(i)));
                }
            }
        }
    }

    #[test]
    fn test_context_splice_and_mut_indices() {
        let seq = format!("{}CGTCTC{}", "GCT".repeat(10), "GCT".repeat(10));
        let by_site = analyze(&seq, 1);
        let mutations = by_site.values().next().unwrap();
        for m in mutations {
            assert_eq!(m.mut_context.len(), m.native_context.len());
            assert!(m.first_mut_idx <= m.last_mut_idx);
            // Changed bases differ, untouched bases agree.
            let native = m.native_context.as_bytes();
            let mutated = m.mut_context.as_bytes();
            assert_ne!(native[m.first_mut_idx], mutated[m.first_mut_idx]);
            assert_ne!(native[m.last_mut_idx], mutated[m.last_mut_idx]);
            assert_eq!(&native[..m.first_mut_idx], &mutated[..m.first_mut_idx]);
            assert_eq!(&native[m.last_mut_idx + 1..], &mutated[m.last_mut_idx + 1..]);
        }
    }

    #[test]
    fn test_mut_indices_rs_offsets() {
        let seq = format!("{}CGTCTC{}", "GCT".repeat(10), "GCT".repeat(10));
        let by_site = analyze(&seq, 1);
        let (key, mutations) = by_site.iter().next().unwrap();
        assert_eq!(key.position, 30);
        for m in mutations {
            // Frame 0: every changed base is inside the 6-nt site.
            for &offset in &m.mut_indices_rs {
                assert!((0..6).contains(&offset));
            }
        }
    }

    #[test]
    fn test_overhang_options_four_alignments_per_anchor() {
        let seq = format!("{}CGTCTC{}", "GCT".repeat(10), "GCT".repeat(10));
        let by_site = analyze(&seq, 1);
        for m in by_site.values().next().unwrap() {
            if m.first_mut_idx == m.last_mut_idx {
                assert_eq!(m.overhang_options.len(), 4);
            }
            for opt in &m.overhang_options {
                assert_eq!(opt.top_overhang.len(), 4);
                assert_eq!(
                    opt.bottom_overhang,
                    reverse_complement(&opt.top_overhang)
                );
                assert_eq!(
                    opt.top_overhang,
                    m.mut_context[opt.overhang_start_index..opt.overhang_start_index + 4]
                );
                // Window still covers a changed base.
                assert!(
                    opt.overhang_start_index <= m.last_mut_idx
                        && opt.overhang_start_index + 4 > m.first_mut_idx
                );
            }
        }
    }

    #[test]
    fn test_sticky_end_options_clamped_at_edges() {
        // Changed base at the very first position: only the windows with a
        // spare clamp base on each side survive.
        let options = sticky_end_options("ACGTACGT", 0, 0);
        assert!(options.is_empty());
        let options = sticky_end_options("ACGTACGT", 1, 1);
        let starts: Vec<usize> = options.iter().map(|o| o.overhang_start_index).collect();
        assert_eq!(starts, vec![1]);
        // Changed base at the last position: start 4 would leave no base
        // after the window.
        let options = sticky_end_options("ACGTACGT", 7, 7);
        assert!(options.is_empty());
        let options = sticky_end_options("ACGTACGTA", 7, 7);
        let starts: Vec<usize> = options.iter().map(|o| o.overhang_start_index).collect();
        assert_eq!(starts, vec![4]);
    }

    #[test]
    fn test_sticky_end_options_merge_for_adjacent_anchors() {
        let options = sticky_end_options(&"A".repeat(20), 8, 10);
        let starts: Vec<usize> = options.iter().map(|o| o.overhang_start_index).collect();
        assert_eq!(starts, vec![5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_site_without_synonymous_swap_is_omitted() {
        // Met and Trp have single codons, so a site spanned only by them
        // offers no synonymous swap and drops out of the candidate map.
        use crate::restriction_sites::Strand;
        let usage = CodonUsageTable::builtin_e_coli();
        let site = RestrictionSite {
            position: 0,
            frame: 0,
            strand: Strand::Plus,
            enzyme: "BsmBI".into(),
            recognition_seq: "CGTCTC".into(),
            context_seq: "ATGTGGCGTCTC".into(),
            context_rs_indices: (6..12).collect(),
            context_start: 0,
            codons: vec![
                Codon {
                    amino_acid: 'M',
                    context_position: 0,
                    codon_sequence: "ATG".into(),
                    rs_overlap: vec![0, 1, 2],
                    usage: 1.0,
                },
                Codon {
                    amino_acid: 'W',
                    context_position: 3,
                    codon_sequence: "TGG".into(),
                    rs_overlap: vec![0, 1, 2],
                    usage: 1.0,
                },
            ],
        };
        let by_site = MutationAnalyzer::new(&usage, 3)
            .generate_mutations(&[site], &NullSink)
            .unwrap();
        assert!(by_site.is_empty());
    }
}
