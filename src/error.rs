use thiserror::Error;

/// Hard failures only. "Nothing found" outcomes are expressed as empty
/// collections plus progress messages; these variants indicate bookkeeping
/// contradictions between pipeline stages, and the caller is expected to
/// mark the whole job failed.
#[derive(Debug, Error)]
pub enum DomesticationError {
    #[error(
        "{strand} annealing window '{found}' does not match expected overhang '{expected}' at {site}"
    )]
    OverhangMismatch {
        site: String,
        strand: &'static str,
        expected: String,
        found: String,
    },

    #[error("mutation primer pairs are not in increasing position order: {positions:?}")]
    PrimerOrder { positions: Vec<usize> },

    #[error("overhang option index {index} out of range ({available} available) at {site}")]
    OverhangIndex {
        site: String,
        index: usize,
        available: usize,
    },

    #[error("codon splice at {position} does not fit context of length {context_len}")]
    ContextBounds { position: usize, context_len: usize },

    #[error("no part-end sequence for MTK part '{part}' ({direction})")]
    UnknownPart {
        part: String,
        direction: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, DomesticationError>;
