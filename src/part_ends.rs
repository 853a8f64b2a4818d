//! MTK part-end tails prepended to edge primers. Each tail carries a BsmBI
//! site plus the 4-nt fusion overhang of the part boundary.

use crate::dna::Direction;
use crate::error::{DomesticationError, Result};
use anyhow::Context;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

const PARTEND_JSON: &str = include_str!("../assets/mtk_partend_sequences.json");

/// Parts whose forward boundary has a Kozak variant carrying GCCACC + ATG.
const KOZAK_STAR_PARTS: [&str; 3] = ["2", "3", "3a"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Kozak {
    #[default]
    Mtk,
    Canonical,
}

impl FromStr for Kozak {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mtk" => Ok(Kozak::Mtk),
            "canonical" => Ok(Kozak::Canonical),
            other => anyhow::bail!("unknown Kozak setting '{other}' (expected MTK or canonical)"),
        }
    }
}

impl fmt::Display for Kozak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kozak::Mtk => write!(f, "MTK"),
            Kozak::Canonical => write!(f, "canonical"),
        }
    }
}

pub struct PartEnds {
    map: HashMap<String, String>,
}

impl Default for PartEnds {
    // The bundled table ships with the crate; failing to parse it is a
    // packaging defect.
    fn default() -> Self {
        Self::bundled().expect("bundled MTK part-end table")
    }
}

impl PartEnds {
    pub fn bundled() -> anyhow::Result<Self> {
        let map: HashMap<String, String> =
            serde_json::from_str(PARTEND_JSON).context("MTK part-end table is not valid JSON")?;
        Ok(Self { map })
    }

    /// Tail for a part boundary. With canonical Kozak the forward tails of
    /// parts 2/3/3a switch to the star variant; other lookups are the plain
    /// `<part><direction>` key.
    pub fn tail(&self, part: &str, direction: Direction, kozak: Kozak) -> Result<&str> {
        let part = part.to_ascii_lowercase();
        if kozak == Kozak::Canonical
            && direction == Direction::Forward
            && KOZAK_STAR_PARTS.contains(&part.as_str())
        {
            let star = format!("{part}star{}", direction.as_str());
            if let Some(tail) = self.map.get(&star) {
                return Ok(tail);
            }
        }
        self.map
            .get(&format!("{part}{}", direction.as_str()))
            .map(String::as_str)
            .ok_or_else(|| DomesticationError::UnknownPart {
                part,
                direction: direction.as_str(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ends() -> PartEnds {
        PartEnds::bundled().unwrap()
    }

    #[test]
    fn test_plain_lookup() {
        let ends = ends();
        assert_eq!(
            ends.tail("3", Direction::Forward, Kozak::Mtk).unwrap(),
            "GCACGTCTCATATG"
        );
        assert_eq!(
            ends.tail("3", Direction::Reverse, Kozak::Mtk).unwrap(),
            "GCACGTCTCAGGAT"
        );
    }

    #[test]
    fn test_canonical_kozak_uses_star_variant_forward_only() {
        let ends = ends();
        assert_eq!(
            ends.tail("3", Direction::Forward, Kozak::Canonical).unwrap(),
            "GCACGTCTCAGCCACCATG"
        );
        assert_eq!(
            ends.tail("3a", Direction::Forward, Kozak::Canonical).unwrap(),
            "GCACGTCTCAGCCACCATG"
        );
        // Reverse tails and non-star parts are unaffected.
        assert_eq!(
            ends.tail("3", Direction::Reverse, Kozak::Canonical).unwrap(),
            "GCACGTCTCAGGAT"
        );
        assert_eq!(
            ends.tail("4", Direction::Forward, Kozak::Canonical).unwrap(),
            "GCACGTCTCAATCC"
        );
    }

    #[test]
    fn test_unknown_part_is_an_error() {
        let err = ends().tail("9", Direction::Forward, Kozak::Mtk).unwrap_err();
        assert!(matches!(err, DomesticationError::UnknownPart { .. }));
    }

    #[test]
    fn test_part_keys_case_insensitive() {
        let ends = ends();
        assert_eq!(
            ends.tail("3A", Direction::Reverse, Kozak::Mtk).unwrap(),
            "GCACGTCTCAAGAA"
        );
    }

    #[test]
    fn test_kozak_parses() {
        assert_eq!("MTK".parse::<Kozak>().unwrap(), Kozak::Mtk);
        assert_eq!("canonical".parse::<Kozak>().unwrap(), Kozak::Canonical);
        assert!("other".parse::<Kozak>().is_err());
    }

    #[test]
    fn test_every_tail_carries_a_bsmbi_site() {
        let ends = ends();
        for tail in ends.map.values() {
            assert!(tail.contains("CGTCTC"));
        }
    }
}
