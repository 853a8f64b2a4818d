use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;

const BUILTIN_E_COLI_JSON: &str = include_str!("../assets/codon_usage/escherichia_coli.json");

/// Per-species codon usage frequencies, keyed by amino acid letter and
/// RNA-alphabet codon (the format the usage tables are published in).
/// Injected into each pipeline invocation; never mutated after load.
#[derive(Clone, Debug, Default)]
pub struct CodonUsageTable {
    by_amino_acid: HashMap<char, HashMap<String, f64>>,
}

impl CodonUsageTable {
    pub fn from_json_text(json_text: &str) -> Result<Self> {
        let raw: HashMap<String, HashMap<String, f64>> =
            serde_json::from_str(json_text).context("codon usage table is not valid JSON")?;
        let mut by_amino_acid = HashMap::new();
        for (aa, codons) in raw {
            let letter = aa
                .chars()
                .next()
                .context("empty amino acid key in codon usage table")?;
            by_amino_acid.insert(letter.to_ascii_uppercase(), codons);
        }
        Ok(Self { by_amino_acid })
    }

    pub fn from_path(path: &str) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("could not read codon usage table '{path}'"))?;
        Self::from_json_text(&text)
    }

    pub fn builtin_e_coli() -> Self {
        // The bundled table is part of the crate; a parse failure here is a
        // packaging defect, not a runtime condition.
        Self::from_json_text(BUILTIN_E_COLI_JSON).expect("bundled E. coli codon usage table")
    }

    /// Usage frequency of a DNA codon for `amino_acid`. The table keys are
    /// RNA codons, so `T` is converted to `U` at lookup time. Missing
    /// entries default to 0.
    pub fn usage(&self, codon_dna: &str, amino_acid: char) -> f64 {
        let codon_rna = codon_dna.to_ascii_uppercase().replace('T', "U");
        self.by_amino_acid
            .get(&amino_acid.to_ascii_uppercase())
            .and_then(|codons| codons.get(&codon_rna))
            .copied()
            .unwrap_or(0.0)
    }
}
