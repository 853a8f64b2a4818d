//! TSV export of designed primers, one order sheet per job.

use crate::protocol::DomesticationResult;
use anyhow::{Context, Result};
use std::path::Path;

/// Writes every reaction's primer pair as two TSV rows. The forward row
/// carries the expected amplicon size; the reverse row leaves it blank.
pub fn write_primers_tsv<P: AsRef<Path>>(path: P, results: &[DomesticationResult]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("could not create '{}'", path.display()))?;
    writer.write_record(["Primer Name", "Sequence", "Amplicon"])?;
    for result in results {
        for group in &result.pcr_reactions {
            for reaction in group {
                let amplicon = reaction.amplicon_size.to_string();
                writer.write_record([
                    reaction.forward_primer.name.as_str(),
                    reaction.forward_primer.sequence.as_str(),
                    amplicon.as_str(),
                ])?;
                writer.write_record([
                    reaction.reverse_primer.name.as_str(),
                    reaction.reverse_primer.sequence.as_str(),
                    "",
                ])?;
            }
        }
    }
    writer
        .flush()
        .with_context(|| format!("could not write '{}'", path.display()))?;
    Ok(())
}
