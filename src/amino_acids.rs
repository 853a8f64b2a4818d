use std::collections::HashMap;

/// Standard genetic code (NCBI table 1), DNA alphabet.
const STANDARD_CODE: [(&str, char); 64] = [
    ("TTT", 'F'),
    ("TTC", 'F'),
    ("TTA", 'L'),
    ("TTG", 'L'),
    ("CTT", 'L'),
    ("CTC", 'L'),
    ("CTA", 'L'),
    ("CTG", 'L'),
    ("ATT", 'I'),
    ("ATC", 'I'),
    ("ATA", 'I'),
    ("ATG", 'M'),
    ("GTT", 'V'),
    ("GTC", 'V'),
    ("GTA", 'V'),
    ("GTG", 'V'),
    ("TCT", 'S'),
    ("TCC", 'S'),
    ("TCA", 'S'),
    ("TCG", 'S'),
    ("CCT", 'P'),
    ("CCC", 'P'),
    ("CCA", 'P'),
    ("CCG", 'P'),
    ("ACT", 'T'),
    ("ACC", 'T'),
    ("ACA", 'T'),
    ("ACG", 'T'),
    ("GCT", 'A'),
    ("GCC", 'A'),
    ("GCA", 'A'),
    ("GCG", 'A'),
    ("TAT", 'Y'),
    ("TAC", 'Y'),
    ("TAA", '*'),
    ("TAG", '*'),
    ("CAT", 'H'),
    ("CAC", 'H'),
    ("CAA", 'Q'),
    ("CAG", 'Q'),
    ("AAT", 'N'),
    ("AAC", 'N'),
    ("AAA", 'K'),
    ("AAG", 'K'),
    ("GAT", 'D'),
    ("GAC", 'D'),
    ("GAA", 'E'),
    ("GAG", 'E'),
    ("TGT", 'C'),
    ("TGC", 'C'),
    ("TGA", '*'),
    ("TGG", 'W'),
    ("CGT", 'R'),
    ("CGC", 'R'),
    ("CGA", 'R'),
    ("CGG", 'R'),
    ("AGT", 'S'),
    ("AGC", 'S'),
    ("AGA", 'R'),
    ("AGG", 'R'),
    ("GGT", 'G'),
    ("GGC", 'G'),
    ("GGA", 'G'),
    ("GGG", 'G'),
];

/// Read-only codon/amino-acid lookup built once at startup (crate::GENETIC_CODE).
#[derive(Clone, Debug)]
pub struct GeneticCode {
    codon_to_aa: HashMap<&'static str, char>,
    aa_to_codons: HashMap<char, Vec<&'static str>>,
}

impl GeneticCode {
    pub fn standard() -> Self {
        let mut codon_to_aa = HashMap::new();
        let mut aa_to_codons: HashMap<char, Vec<&'static str>> = HashMap::new();
        for (codon, aa) in STANDARD_CODE {
            codon_to_aa.insert(codon, aa);
            aa_to_codons.entry(aa).or_default().push(codon);
        }
        Self {
            codon_to_aa,
            aa_to_codons,
        }
    }

    /// Translates a 3-nt DNA codon. `*` for stop codons, `X` for anything
    /// unknown (ambiguous bases, wrong length).
    pub fn translate(&self, codon: &str) -> char {
        self.codon_to_aa
            .get(codon.to_ascii_uppercase().as_str())
            .copied()
            .unwrap_or('X')
    }

    /// All codons encoding `amino_acid`, including the stop codons for `*`.
    /// Empty for unknown letters.
    pub fn synonymous_codons(&self, amino_acid: char) -> &[&'static str] {
        self.aa_to_codons
            .get(&amino_acid.to_ascii_uppercase())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

impl Default for GeneticCode {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate() {
        let code = GeneticCode::standard();
        assert_eq!(code.translate("ATG"), 'M');
        assert_eq!(code.translate("taa"), '*');
        assert_eq!(code.translate("NNN"), 'X');
        assert_eq!(code.translate("AT"), 'X');
    }

    #[test]
    fn test_synonymous_codons() {
        let code = GeneticCode::standard();
        assert_eq!(code.synonymous_codons('M'), &["ATG"]);
        assert_eq!(code.synonymous_codons('W'), &["TGG"]);
        assert_eq!(code.synonymous_codons('L').len(), 6);
        assert_eq!(code.synonymous_codons('*'), &["TAA", "TAG", "TGA"]);
        assert!(code.synonymous_codons('X').is_empty());
    }

    #[test]
    fn test_code_is_complete() {
        let code = GeneticCode::standard();
        assert_eq!(code.codon_to_aa.len(), 64);
        let total: usize = code.aa_to_codons.values().map(|v| v.len()).sum();
        assert_eq!(total, 64);
    }
}
