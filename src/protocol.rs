//! End-to-end domestication protocol: preprocessing, site detection,
//! mutation analysis, overhang scoring, primer design and PCR grouping for
//! one or more sequences.

use crate::codon_usage::CodonUsageTable;
use crate::compatibility::MutationOptimizer;
use crate::error::DomesticationError;
use crate::mutations::{Mutation, MutationAnalyzer};
use crate::part_ends::Kozak;
use crate::primers::{EdgePrimerPair, MutationPrimerSet, PrimerDesigner, ResultPolicy};
use crate::progress::ProgressSink;
use crate::reactions::{PCRReaction, ReactionOrganizer};
use crate::restriction_sites::{RestrictionSite, RestrictionSiteDetector, SiteKey};
use crate::sequence_prep::SequencePreparator;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One insert to domesticate, as supplied by the caller.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceToDomesticate {
    #[serde(default)]
    pub primer_name: Option<String>,
    pub sequence: String,
    /// Template the insert was amplified from, if the caller tracks one.
    /// Carried through for downstream tooling; the pipeline itself only
    /// works on `sequence`.
    #[serde(default)]
    pub template_sequence: Option<String>,
    pub mtk_part_left: String,
    pub mtk_part_right: String,
}

fn default_species() -> String {
    "escherichia_coli".to_string()
}

fn default_kozak() -> String {
    "MTK".to_string()
}

fn default_max_mutations() -> usize {
    3
}

fn default_max_results() -> String {
    "one".to_string()
}

/// A whole job: the sequences plus the knobs shared across them.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolRequest {
    pub sequences_to_domesticate: Vec<SequenceToDomesticate>,
    #[serde(default = "default_species")]
    pub species: String,
    #[serde(default = "default_kozak")]
    pub kozak: String,
    #[serde(default = "default_max_mutations")]
    pub max_mut_per_site: usize,
    #[serde(default = "default_max_results")]
    pub max_results: String,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomesticationResult {
    pub sequence_index: usize,
    pub primer_name: String,
    pub mtk_part_left: String,
    pub mtk_part_right: String,
    pub processed_sequence: String,
    pub restriction_sites: Vec<RestrictionSite>,
    pub mutation_options: BTreeMap<SiteKey, Vec<Mutation>>,
    pub edge_primers: Option<EdgePrimerPair>,
    pub mut_primers: Vec<MutationPrimerSet>,
    #[serde(rename = "PCRReactions")]
    pub pcr_reactions: Vec<Vec<PCRReaction>>,
    pub messages: Vec<String>,
    pub errors: Option<String>,
}

impl DomesticationResult {
    fn empty(sequence_index: usize, seq: &SequenceToDomesticate) -> Self {
        Self {
            sequence_index,
            primer_name: seq
                .primer_name
                .clone()
                .unwrap_or_else(|| format!("seq{}", sequence_index + 1)),
            mtk_part_left: seq.mtk_part_left.clone(),
            mtk_part_right: seq.mtk_part_right.clone(),
            processed_sequence: String::new(),
            restriction_sites: Vec::new(),
            mutation_options: BTreeMap::new(),
            edge_primers: None,
            mut_primers: Vec::new(),
            pcr_reactions: Vec::new(),
            messages: Vec::new(),
            errors: None,
        }
    }
}

pub struct ProtocolMaker<'a> {
    codon_usage: &'a CodonUsageTable,
    kozak: Kozak,
    max_mutations: usize,
    policy: ResultPolicy,
    seed: Option<u64>,
}

impl<'a> ProtocolMaker<'a> {
    pub fn new(
        codon_usage: &'a CodonUsageTable,
        kozak: Kozak,
        max_mutations: usize,
        policy: ResultPolicy,
        seed: Option<u64>,
    ) -> Self {
        Self {
            codon_usage,
            kozak,
            max_mutations,
            policy,
            seed,
        }
    }

    /// Runs the pipeline for one sequence. Edge primers and PCR grouping
    /// always run; the mutation stages only when sites were detected.
    pub fn run(
        &self,
        sequence_index: usize,
        seq: &SequenceToDomesticate,
        sink: &dyn ProgressSink,
    ) -> Result<DomesticationResult, DomesticationError> {
        let mut result = DomesticationResult::empty(sequence_index, seq);

        let (processed, _success) =
            SequencePreparator.prepare(&seq.sequence, &seq.mtk_part_left, sink);
        result.processed_sequence = processed.clone();

        let detector = RestrictionSiteDetector::new(self.codon_usage);
        result.restriction_sites = detector.find_sites(&processed, sink);

        let designer = PrimerDesigner::new(self.kozak, self.seed);
        if result.restriction_sites.is_empty() {
            result
                .messages
                .push("No restriction sites found, no mutations needed.".to_string());
        } else {
            let analyzer = MutationAnalyzer::new(self.codon_usage, self.max_mutations);
            result.mutation_options =
                analyzer.generate_mutations(&result.restriction_sites, sink)?;
            let mutation_set = MutationOptimizer.select_and_score(&result.mutation_options, sink);
            match designer.design_mutation_primers(
                &mutation_set,
                &result.primer_name,
                self.policy,
                sink,
            )? {
                Some(sets) => result.mut_primers = sets,
                None => result.messages.push(
                    "No valid primer sets found: the selected mutations have no compatible \
                     overhang combination."
                        .to_string(),
                ),
            }
        }

        let edge = designer.edge_primers(
            &processed,
            &seq.mtk_part_left,
            &seq.mtk_part_right,
            &result.primer_name,
            sink,
        )?;
        result.pcr_reactions = ReactionOrganizer.chain(&edge, &result.mut_primers, sink);
        result.edge_primers = Some(edge);
        Ok(result)
    }

    /// Runs every sequence of a request in parallel. A failing sequence
    /// does not abort the batch; its error lands in the result.
    pub fn run_many(
        &self,
        sequences: &[SequenceToDomesticate],
        sink: &(dyn ProgressSink),
    ) -> Vec<DomesticationResult> {
        sequences
            .par_iter()
            .enumerate()
            .map(|(index, seq)| match self.run(index, seq, sink) {
                Ok(result) => result,
                Err(err) => {
                    log::error!("sequence {index} failed: {err}");
                    let mut result = DomesticationResult::empty(index, seq);
                    result.errors = Some(err.to_string());
                    result
                }
            })
            .collect()
    }
}

/// Parses the request knobs and runs the whole job with the bundled codon
/// usage table for the requested species.
pub fn run_request(
    request: &ProtocolRequest,
    sink: &dyn ProgressSink,
) -> anyhow::Result<Vec<DomesticationResult>> {
    let codon_usage = match request.species.as_str() {
        "escherichia_coli" => CodonUsageTable::builtin_e_coli(),
        other => CodonUsageTable::from_path(other)?,
    };
    let kozak: Kozak = request.kozak.parse()?;
    let policy: ResultPolicy = request.max_results.parse()?;
    let maker = ProtocolMaker::new(
        &codon_usage,
        kozak,
        request.max_mut_per_site,
        policy,
        request.seed,
    );
    Ok(maker.run_many(&request.sequences_to_domesticate, sink))
}
