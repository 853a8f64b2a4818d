//! Mutagenic and edge primer construction.
//!
//! Mutation primers anneal on the mutated context around a chosen 4-nt
//! overhang; edge primers anneal on the sequence termini and carry the MTK
//! part-end tails. All primers get a GAA spacer plus a BsmBI site in front
//! of the annealing region so the assembly re-cuts them out.

use crate::PART_ENDS;
use crate::compatibility::MutationSet;
use crate::dna::{Direction, gc_content, melting_temperature, optimal_primer_length, reverse_complement};
use crate::error::{DomesticationError, Result};
use crate::mutations::Mutation;
use crate::part_ends::Kozak;
use crate::progress::{Extra, ProgressSink, fields};
use crate::restriction_sites::SiteKey;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use serde_json::json;
use std::str::FromStr;

pub const STEP: &str = "Primer Design";

pub const TM_THRESHOLD: f64 = 55.0;
pub const MIN_BINDING_LENGTH: usize = 10;
pub const MAX_BINDING_LENGTH: usize = 30;
pub const SPACER: &str = "GAA";
pub const BSMBI_SITE: &str = "CGTCTC";

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Primer {
    pub name: String,
    /// Full synthesis sequence, 5' to 3', tail included.
    pub sequence: String,
    /// The part that anneals to the template, 5' to 3' on the primer.
    pub binding_region: String,
    pub tm: f64,
    pub gc_content: f64,
    pub length: usize,
    /// Start of the binding region on the template top strand.
    pub template_start: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationPrimerPair {
    pub site: SiteKey,
    /// First mutated base on the full sequence; pairs within a set are
    /// strictly increasing on this.
    pub position: usize,
    pub forward: Primer,
    pub reverse: Primer,
    pub mutation: Mutation,
}

/// One full domestication alternative: a primer pair per site, produced
/// from one valid coordinate of the compatibility matrix.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationPrimerSet {
    pub mut_primer_pairs: Vec<MutationPrimerPair>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgePrimerPair {
    pub forward: Primer,
    pub reverse: Primer,
}

/// How many alternative primer sets to hand back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResultPolicy {
    #[default]
    One,
    AFew,
    Many,
    Most,
    All,
}

impl FromStr for ResultPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().replace('_', " ").as_str() {
            "one" => Ok(ResultPolicy::One),
            "a few" | "afew" => Ok(ResultPolicy::AFew),
            "many" => Ok(ResultPolicy::Many),
            "most" => Ok(ResultPolicy::Most),
            "all" => Ok(ResultPolicy::All),
            other => anyhow::bail!(
                "unknown result policy '{other}' (expected one, a few, many, most or all)"
            ),
        }
    }
}

impl ResultPolicy {
    /// Target number of sets given the site count and the number of valid
    /// matrix coordinates; never exceeds what exists.
    pub fn target(&self, num_sites: usize, total_coords: usize) -> usize {
        let raw = match self {
            ResultPolicy::One => 1,
            ResultPolicy::AFew => 2 * num_sites.max(1),
            ResultPolicy::Many => 4 * num_sites.max(1),
            ResultPolicy::Most => ((total_coords as f64) * 0.75).round() as usize,
            ResultPolicy::All => total_coords,
        };
        raw.clamp(1, total_coords.max(1))
    }
}

pub struct PrimerDesigner {
    pub kozak: Kozak,
    /// Fixes the sampling of valid coordinates; `None` draws from the OS.
    pub seed: Option<u64>,
}

impl PrimerDesigner {
    pub fn new(kozak: Kozak, seed: Option<u64>) -> Self {
        Self { kozak, seed }
    }

    /// Designs one primer set per sampled valid coordinate of the
    /// compatibility matrix. `Ok(None)` means the matrix holds no valid
    /// coordinate at all; hard errors are bookkeeping contradictions.
    pub fn design_mutation_primers(
        &self,
        set: &MutationSet,
        primer_name: &str,
        policy: ResultPolicy,
        sink: &dyn ProgressSink,
    ) -> Result<Option<Vec<MutationPrimerSet>>> {
        sink.report(STEP, "Designing mutation primers", 0, &Extra::new());

        let coords = set.compatibility.valid_coords();
        if coords.is_empty() {
            log::warn!("no compatible overhang combination, no mutation primers designed");
            sink.report(
                STEP,
                "No valid primer sets found",
                100,
                &fields(&[
                    (
                        "callout",
                        json!("No valid primer sets found: the selected mutations have no compatible overhang combination."),
                    ),
                    ("notificationCount", json!(1)),
                ]),
            );
            return Ok(None);
        }

        let chosen_coords = self.sample_coords(coords, set.chosen.len(), policy);
        let mut sets = Vec::with_capacity(chosen_coords.len());
        for coords in &chosen_coords {
            let mut pairs = Vec::with_capacity(set.chosen.len());
            for ((key, mutation), &overhang_idx) in set.chosen.iter().zip(coords) {
                pairs.push(self.mutation_primer_pair(key, mutation, overhang_idx, primer_name)?);
            }
            ensure_increasing_positions(&pairs)?;
            sets.push(MutationPrimerSet {
                mut_primer_pairs: pairs,
            });
        }

        sink.report(
            STEP,
            &format!("Designed {} mutation primer set(s)", sets.len()),
            100,
            &fields(&[("setCount", json!(sets.len()))]),
        );
        Ok(Some(sets))
    }

    fn sample_coords(
        &self,
        coords: Vec<Vec<usize>>,
        num_sites: usize,
        policy: ResultPolicy,
    ) -> Vec<Vec<usize>> {
        let target = policy.target(num_sites, coords.len());
        if target >= coords.len() {
            return coords;
        }
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut picked: Vec<usize> =
            rand::seq::index::sample(&mut rng, coords.len(), target).into_vec();
        picked.sort_unstable();
        picked.into_iter().map(|i| coords[i].clone()).collect()
    }

    fn mutation_primer_pair(
        &self,
        key: &SiteKey,
        mutation: &Mutation,
        overhang_idx: usize,
        primer_name: &str,
    ) -> Result<MutationPrimerPair> {
        let option = mutation.overhang_options.get(overhang_idx).ok_or_else(|| {
            DomesticationError::OverhangIndex {
                site: key.to_string(),
                index: overhang_idx,
                available: mutation.overhang_options.len(),
            }
        })?;
        let context = &mutation.mut_context;

        // Forward: one base of clamp before the overhang, then grown 3'.
        let forward_start = option.overhang_start_index.checked_sub(1).ok_or(
            DomesticationError::ContextBounds {
                position: option.overhang_start_index,
                context_len: context.len(),
            },
        )?;
        let forward_anneal = grow_forward(context, forward_start);
        if forward_anneal.len() < 5
            || !forward_anneal[1..5].eq_ignore_ascii_case(&option.top_overhang)
        {
            return Err(DomesticationError::OverhangMismatch {
                site: key.to_string(),
                strand: "forward",
                expected: option.top_overhang.clone(),
                found: forward_anneal.get(1..5).unwrap_or("").to_string(),
            });
        }

        // Reverse: binding window ends one base past the overhang, grown 5'
        // on the template, read back as the bottom strand.
        let reverse_end = option.overhang_start_index + 5;
        if reverse_end > context.len() {
            return Err(DomesticationError::ContextBounds {
                position: reverse_end,
                context_len: context.len(),
            });
        }
        let (reverse_binding_start, reverse_window) = grow_reverse(context, reverse_end);
        let reverse_anneal = reverse_complement(reverse_window);
        if reverse_anneal.len() < 5
            || !reverse_anneal[1..5].eq_ignore_ascii_case(&option.bottom_overhang)
        {
            return Err(DomesticationError::OverhangMismatch {
                site: key.to_string(),
                strand: "reverse",
                expected: option.bottom_overhang.clone(),
                found: reverse_anneal.get(1..5).unwrap_or("").to_string(),
            });
        }

        let forward = assembled_primer(
            format!("{primer_name}_{key}_forward"),
            forward_anneal,
            mutation.context_start + forward_start,
        );
        let reverse = assembled_primer(
            format!("{primer_name}_{key}_reverse"),
            &reverse_anneal,
            mutation.context_start + reverse_binding_start,
        );
        Ok(MutationPrimerPair {
            site: key.clone(),
            position: mutation.context_start + mutation.first_mut_idx,
            forward,
            reverse,
            mutation: mutation.clone(),
        })
    }

    /// Edge primers annealing on the sequence termini, tailed with the MTK
    /// part-end sequences of the flanking parts.
    pub fn edge_primers(
        &self,
        sequence: &str,
        mtk_part_left: &str,
        mtk_part_right: &str,
        primer_name: &str,
        sink: &dyn ProgressSink,
    ) -> Result<EdgePrimerPair> {
        sink.report(STEP, "Designing edge primers", 0, &Extra::new());

        let forward_len = optimal_primer_length(sequence, 0, Direction::Forward);
        let forward_binding = &sequence[..forward_len.min(sequence.len())];
        let forward_tail = PART_ENDS.tail(mtk_part_left, Direction::Forward, self.kozak)?;
        let forward = tailed_primer(
            format!("{primer_name}_edge_forward"),
            forward_tail,
            forward_binding,
            0,
        );

        let reverse_len = optimal_primer_length(sequence, sequence.len(), Direction::Reverse);
        let reverse_start = sequence.len().saturating_sub(reverse_len);
        let reverse_binding = reverse_complement(&sequence[reverse_start..]);
        let reverse_tail = PART_ENDS.tail(mtk_part_right, Direction::Reverse, self.kozak)?;
        let reverse = tailed_primer(
            format!("{primer_name}_edge_reverse"),
            reverse_tail,
            &reverse_binding,
            reverse_start,
        );

        sink.report(
            STEP,
            "Edge primers designed",
            100,
            &fields(&[
                ("forwardLength", json!(forward.length)),
                ("reverseLength", json!(reverse.length)),
            ]),
        );
        Ok(EdgePrimerPair { forward, reverse })
    }
}

/// Annealing window grown 3' from `start` until Tm reaches the threshold,
/// between the binding length bounds and clamped to the context.
fn grow_forward(context: &str, start: usize) -> &str {
    let mut length = MIN_BINDING_LENGTH.min(context.len() - start);
    while melting_temperature(&context[start..start + length]) < TM_THRESHOLD
        && length < MAX_BINDING_LENGTH
        && start + length < context.len()
    {
        length += 1;
    }
    &context[start..start + length]
}

/// Binding window (top-strand coordinates) grown 5' so that it ends at
/// `end`; returns the window start and the top-strand slice.
fn grow_reverse(context: &str, end: usize) -> (usize, &str) {
    let mut length = MIN_BINDING_LENGTH.min(end);
    while melting_temperature(&context[end - length..end]) < TM_THRESHOLD
        && length < MAX_BINDING_LENGTH
        && length < end
    {
        length += 1;
    }
    (end - length, &context[end - length..end])
}

fn assembled_primer(name: String, anneal: &str, template_start: usize) -> Primer {
    let sequence = format!("{SPACER}{BSMBI_SITE}{anneal}");
    Primer {
        name,
        length: sequence.len(),
        sequence,
        binding_region: anneal.to_string(),
        tm: melting_temperature(anneal),
        gc_content: gc_content(anneal),
        template_start,
    }
}

fn tailed_primer(name: String, tail: &str, binding: &str, template_start: usize) -> Primer {
    let sequence = format!("{tail}{binding}");
    Primer {
        name,
        length: sequence.len(),
        sequence,
        binding_region: binding.to_string(),
        tm: melting_temperature(binding),
        gc_content: gc_content(binding),
        template_start,
    }
}

fn ensure_increasing_positions(pairs: &[MutationPrimerPair]) -> Result<()> {
    let positions: Vec<usize> = pairs.iter().map(|p| p.position).collect();
    if positions.windows(2).all(|w| w[0] < w[1]) {
        Ok(())
    } else {
        Err(DomesticationError::PrimerOrder { positions })
    }
}
