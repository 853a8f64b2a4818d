//! Per-site mutation selection and the overhang compatibility matrix.

use crate::mutations::Mutation;
use crate::progress::{Extra, ProgressSink, fields};
use crate::restriction_sites::SiteKey;
use itertools::Itertools;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::json;
use std::collections::BTreeMap;

pub const STEP: &str = "Mutation Optimization";

/// N-dimensional 0/1 tensor with one axis per site; the entry at a
/// coordinate tuple is 1 when the overhang options selected by that tuple
/// are mutually compatible.
#[derive(Clone, Debug, PartialEq)]
pub struct CompatibilityMatrix {
    dims: Vec<usize>,
    cells: Vec<u8>,
}

impl CompatibilityMatrix {
    pub fn new(dims: Vec<usize>) -> Self {
        let len = dims.iter().product();
        Self {
            dims,
            cells: vec![0; len],
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    fn index(&self, coords: &[usize]) -> Option<usize> {
        if coords.len() != self.dims.len() {
            return None;
        }
        let mut idx = 0;
        for (&c, &d) in coords.iter().zip(&self.dims) {
            if c >= d {
                return None;
            }
            idx = idx * d + c;
        }
        Some(idx)
    }

    pub fn get(&self, coords: &[usize]) -> u8 {
        self.index(coords).map_or(0, |i| self.cells[i])
    }

    pub fn set(&mut self, coords: &[usize], value: u8) {
        if let Some(i) = self.index(coords) {
            self.cells[i] = value;
        }
    }

    pub fn ones(&self) -> usize {
        self.cells.iter().filter(|&&c| c == 1).count()
    }

    /// Coordinate tuples whose entry is 1, in row-major order.
    pub fn valid_coords(&self) -> Vec<Vec<usize>> {
        if self.dims.iter().any(|&d| d == 0) {
            return Vec::new();
        }
        self.dims
            .iter()
            .map(|&d| 0..d)
            .multi_cartesian_product()
            .filter(|coords| self.get(coords) == 1)
            .collect()
    }
}

// Rendered the way the result payload expects a tensor: a snippet of the
// flat cell data, the shape, and the fill rate.
impl Serialize for CompatibilityMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("CompatibilityMatrix", 3)?;
        let snippet: Vec<u8> = self.cells.iter().copied().take(5).collect();
        let percentage = if self.cells.is_empty() {
            0.0
        } else {
            (self.ones() as f64 / self.cells.len() as f64 * 10000.0).round() / 100.0
        };
        s.serialize_field("snippet", &snippet)?;
        s.serialize_field("shape", &self.dims)?;
        s.serialize_field("onesPercentage", &percentage)?;
        s.end()
    }
}

/// The chosen mutation per site plus the matrix over their overhang options.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationSet {
    pub chosen: BTreeMap<SiteKey, Mutation>,
    pub compatibility: CompatibilityMatrix,
}

/// Ligation fidelity screen over a set of 4-nt overhangs. All four checks
/// must pass:
/// no duplicated overhang, no 4 identical consecutive bases, no 3-mer
/// shared between two different overhangs, GC content strictly between
/// 0% and 100%.
pub fn overhangs_compatible(overhangs: &[&str]) -> bool {
    for (i, a) in overhangs.iter().enumerate() {
        let bytes = a.as_bytes();
        if bytes.len() == 4 && bytes.iter().all(|&b| b == bytes[0]) {
            return false;
        }
        let gc = bytes
            .iter()
            .filter(|&&b| b == b'G' || b == b'C')
            .count();
        if gc == 0 || gc == bytes.len() {
            return false;
        }
        for b in &overhangs[i + 1..] {
            if a == b {
                return false;
            }
            for k in 0..=a.len().saturating_sub(3) {
                if b.contains(&a[k..k + 3]) {
                    return false;
                }
            }
        }
    }
    true
}

pub struct MutationOptimizer;

impl MutationOptimizer {
    /// Picks the highest-usage candidate per site (the first seen wins
    /// ties), then fills the compatibility matrix over every combination
    /// of the chosen candidates' overhang options.
    pub fn select_and_score(
        &self,
        mutation_options: &BTreeMap<SiteKey, Vec<Mutation>>,
        sink: &dyn ProgressSink,
    ) -> MutationSet {
        sink.report(STEP, "Selecting mutations per site", 0, &Extra::new());

        let mut chosen = BTreeMap::new();
        for (key, candidates) in mutation_options {
            let mut best: Option<&Mutation> = None;
            for candidate in candidates {
                let usage = candidate
                    .mut_codons
                    .first()
                    .map_or(0.0, |mc| mc.codon.usage);
                let best_usage = best
                    .and_then(|m| m.mut_codons.first())
                    .map_or(f64::MIN, |mc| mc.codon.usage);
                if best.is_none() || usage > best_usage {
                    best = Some(candidate);
                }
            }
            if let Some(best) = best {
                chosen.insert(key.clone(), best.clone());
            }
        }
        sink.report(
            STEP,
            &format!("Selected {} mutation(s), scoring overhangs", chosen.len()),
            50,
            &Extra::new(),
        );

        let dims: Vec<usize> = chosen.values().map(|m| m.overhang_options.len()).collect();
        let mut compatibility = CompatibilityMatrix::new(dims.clone());
        let mutations: Vec<&Mutation> = chosen.values().collect();
        for coords in dims.iter().map(|&d| 0..d).multi_cartesian_product() {
            let overhangs: Vec<&str> = coords
                .iter()
                .zip(&mutations)
                .map(|(&c, m)| m.overhang_options[c].top_overhang.as_str())
                .collect();
            if overhangs_compatible(&overhangs) {
                compatibility.set(&coords, 1);
            }
        }

        log::debug!(
            "compatibility matrix shape {:?}, {} valid combination(s)",
            compatibility.dims(),
            compatibility.ones()
        );
        sink.report(
            STEP,
            "Overhang compatibility scored",
            100,
            &fields(&[
                ("shape", json!(compatibility.dims())),
                ("validCombinations", json!(compatibility.ones())),
            ]),
        );
        MutationSet {
            chosen,
            compatibility,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codon_usage::CodonUsageTable;
    use crate::mutations::MutationAnalyzer;
    use crate::progress::NullSink;
    use crate::restriction_sites::RestrictionSiteDetector;

    #[test]
    fn test_matrix_indexing_row_major() {
        let mut m = CompatibilityMatrix::new(vec![2, 3]);
        m.set(&[0, 2], 1);
        m.set(&[1, 0], 1);
        assert_eq!(m.get(&[0, 2]), 1);
        assert_eq!(m.get(&[1, 0]), 1);
        assert_eq!(m.get(&[0, 0]), 0);
        assert_eq!(m.ones(), 2);
        assert_eq!(m.valid_coords(), vec![vec![0, 2], vec![1, 0]]);
    }

    #[test]
    fn test_matrix_out_of_range_reads_zero() {
        let m = CompatibilityMatrix::new(vec![2, 2]);
        assert_eq!(m.get(&[2, 0]), 0);
        assert_eq!(m.get(&[0]), 0);
    }

    #[test]
    fn test_zero_dimension_matrix_has_no_valid_coords() {
        let m = CompatibilityMatrix::new(vec![3, 0, 2]);
        assert_eq!(m.ones(), 0);
        assert!(m.valid_coords().is_empty());
    }

    #[test]
    fn test_overhang_duplicates_rejected() {
        assert!(!overhangs_compatible(&["ACTG", "ACTG"]));
    }

    #[test]
    fn test_overhang_homopolymer_rejected() {
        assert!(!overhangs_compatible(&["AAAA"]));
        assert!(!overhangs_compatible(&["GGGG", "ACTG"]));
    }

    #[test]
    fn test_overhang_extreme_gc_rejected() {
        assert!(!overhangs_compatible(&["ATAT"])); // 0% GC
        assert!(!overhangs_compatible(&["GCGC"])); // 100% GC
    }

    #[test]
    fn test_overhang_shared_triplet_rejected() {
        // ACT appears in both.
        assert!(!overhangs_compatible(&["ACTG", "TACT"]));
    }

    #[test]
    fn test_compatible_overhangs_accepted() {
        assert!(overhangs_compatible(&["ACTG"]));
        assert!(overhangs_compatible(&["ACTG", "GTCA"]));
    }

    #[test]
    fn test_selection_prefers_highest_usage() {
        let usage = CodonUsageTable::builtin_e_coli();
        let seq = format!("{}CGTCTC{}", "GCT".repeat(10), "GCT".repeat(10));
        let sites = RestrictionSiteDetector::new(&usage).find_sites(&seq, &NullSink);
        let options = MutationAnalyzer::new(&usage, 1)
            .generate_mutations(&sites, &NullSink)
            .unwrap();
        let set = MutationOptimizer.select_and_score(&options, &NullSink);
        assert_eq!(set.chosen.len(), 1);
        let best = set.chosen.values().next().unwrap();
        let best_usage = best.mut_codons[0].codon.usage;
        for candidate in options.values().next().unwrap() {
            assert!(candidate.mut_codons[0].codon.usage <= best_usage);
        }
    }

    #[test]
    fn test_matrix_axes_match_option_counts() {
        let usage = CodonUsageTable::builtin_e_coli();
        let seq = format!(
            "{}CGTCTC{}GGTCTC{}",
            "GCT".repeat(10),
            "GCT".repeat(10),
            "GCT".repeat(10)
        );
        let sites = RestrictionSiteDetector::new(&usage).find_sites(&seq, &NullSink);
        assert_eq!(sites.len(), 2);
        let options = MutationAnalyzer::new(&usage, 1)
            .generate_mutations(&sites, &NullSink)
            .unwrap();
        let set = MutationOptimizer.select_and_score(&options, &NullSink);
        let expected: Vec<usize> = set
            .chosen
            .values()
            .map(|m| m.overhang_options.len())
            .collect();
        assert_eq!(set.compatibility.dims(), expected.as_slice());
        // Every marked coordinate really is a compatible combination.
        let mutations: Vec<&Mutation> = set.chosen.values().collect();
        for coords in set.compatibility.valid_coords() {
            let overhangs: Vec<&str> = coords
                .iter()
                .zip(&mutations)
                .map(|(&c, m)| m.overhang_options[c].top_overhang.as_str())
                .collect();
            assert!(overhangs_compatible(&overhangs));
        }
    }

    #[test]
    fn test_matrix_serializes_snippet_shape_percentage() {
        let mut m = CompatibilityMatrix::new(vec![2, 2]);
        m.set(&[0, 0], 1);
        let value = serde_json::to_value(&m).unwrap();
        assert_eq!(value["shape"], serde_json::json!([2, 2]));
        assert_eq!(value["snippet"], serde_json::json!([1, 0, 0, 0]));
        assert_eq!(value["onesPercentage"], serde_json::json!(25.0));
    }
}
