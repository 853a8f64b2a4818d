//! Chains designed primers into the PCR reactions that rebuild the
//! domesticated part: each mutation splits the template, so n sites make
//! n + 1 amplicons.

use crate::primers::{EdgePrimerPair, MutationPrimerSet, Primer};
use crate::progress::{Extra, ProgressSink, fields};
use serde::Serialize;
use serde_json::json;

pub const STEP: &str = "PCR Reaction Grouping";

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PCRReaction {
    pub name: String,
    pub forward_primer: Primer,
    pub reverse_primer: Primer,
    pub amplicon_size: usize,
}

pub struct ReactionOrganizer;

impl ReactionOrganizer {
    /// One reaction group per primer set. Within a group the reactions walk
    /// the template: edge-forward with the first mutation's reverse, each
    /// mutation's forward with the next mutation's reverse, the last
    /// mutation's forward with edge-reverse. No mutation primers at all
    /// gives the single edge-only reaction.
    pub fn chain(
        &self,
        edge: &EdgePrimerPair,
        primer_sets: &[MutationPrimerSet],
        sink: &dyn ProgressSink,
    ) -> Vec<Vec<PCRReaction>> {
        sink.report(STEP, "Grouping primers into PCR reactions", 0, &Extra::new());

        let groups: Vec<Vec<PCRReaction>> = if primer_sets.is_empty() {
            vec![vec![PCRReaction {
                name: "reaction_1".to_string(),
                forward_primer: edge.forward.clone(),
                reverse_primer: edge.reverse.clone(),
                amplicon_size: amplicon_size(&edge.forward, &edge.reverse),
            }]]
        } else {
            primer_sets
                .iter()
                .enumerate()
                .map(|(set_idx, set)| {
                    let mut pairs: Vec<_> = set.mut_primer_pairs.iter().collect();
                    pairs.sort_by_key(|p| p.position);

                    let mut forwards = vec![&edge.forward];
                    forwards.extend(pairs.iter().map(|p| &p.forward));
                    let mut reverses: Vec<&Primer> =
                        pairs.iter().map(|p| &p.reverse).collect();
                    reverses.push(&edge.reverse);

                    forwards
                        .into_iter()
                        .zip(reverses)
                        .enumerate()
                        .map(|(k, (forward, reverse))| PCRReaction {
                            name: format!("set{}_reaction_{}", set_idx + 1, k + 1),
                            forward_primer: forward.clone(),
                            reverse_primer: reverse.clone(),
                            amplicon_size: amplicon_size(forward, reverse),
                        })
                        .collect()
                })
                .collect()
        };

        let total: usize = groups.iter().map(Vec::len).sum();
        sink.report(
            STEP,
            &format!("Grouped primers into {total} PCR reaction(s)"),
            100,
            &fields(&[
                ("reactionCount", json!(total)),
                ("groupCount", json!(groups.len())),
            ]),
        );
        groups
    }
}

/// Product length: template span between the two binding regions' outer
/// ends, plus the non-binding tails both primers add to the product.
pub fn amplicon_size(forward: &Primer, reverse: &Primer) -> usize {
    let span_end = reverse.template_start + reverse.binding_region.len();
    let span = span_end.saturating_sub(forward.template_start);
    let forward_tail = forward.sequence.len() - forward.binding_region.len();
    let reverse_tail = reverse.sequence.len() - reverse.binding_region.len();
    span + forward_tail + reverse_tail
}
