//! Golden Gate domestication toolkit.
//!
//! Given a coding sequence destined for an MTK (mammalian toolkit) part,
//! the pipeline finds internal BsmBI/BsaI recognition sites, proposes
//! synonymous codon swaps that remove them, scores the ligation
//! compatibility of the resulting 4-nt overhangs, designs the mutagenic
//! and edge primers, and groups them into the PCR reactions that rebuild
//! the part. [`protocol::ProtocolMaker`] ties the stages together.

use crate::amino_acids::GeneticCode;
use crate::part_ends::PartEnds;
use lazy_static::lazy_static;

pub mod amino_acids;
pub mod codon_usage;
pub mod compatibility;
pub mod dna;
pub mod error;
pub mod export;
pub mod mutations;
pub mod part_ends;
pub mod primers;
pub mod progress;
pub mod protocol;
pub mod reactions;
pub mod restriction_sites;
pub mod sequence_prep;

lazy_static! {
    // Standard genetic code
    pub static ref GENETIC_CODE: GeneticCode = GeneticCode::default();

    // MTK part-end tails for edge primers
    pub static ref PART_ENDS: PartEnds = PartEnds::default();
}
