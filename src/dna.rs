// Small DNA helpers shared across the pipeline.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
        }
    }
}

#[inline(always)]
pub fn complement(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        b'U' => b'A',
        _ => b'N',
    }
}

pub fn reverse_complement(seq: &str) -> String {
    String::from_utf8_lossy(&bio::alphabets::dna::revcomp(seq.as_bytes())).into_owned()
}

/// GC fraction of a sequence, rounded to 3 decimal places.
pub fn gc_content(seq: &str) -> f64 {
    if seq.is_empty() {
        return 0.0;
    }
    let gc = seq
        .bytes()
        .map(|c| c.to_ascii_uppercase())
        .filter(|&c| c == b'G' || c == b'C')
        .count() as f64;
    (gc / seq.len() as f64 * 1000.0).round() / 1000.0
}

/// Approximate melting temperature.
///
/// Wallace rule (2*(A+T) + 4*(G+C)) below 14 nt, the GC-count formula
/// 64.9 + 41*(GC - 16.4)/len otherwise. Rounded to 2 decimal places.
/// Not a nearest-neighbor model; do not expect laboratory-grade accuracy.
pub fn melting_temperature(seq: &str) -> f64 {
    if seq.is_empty() {
        return 0.0;
    }
    let upper = seq.to_ascii_uppercase();
    let length = upper.len();
    let at = upper.bytes().filter(|&c| c == b'A' || c == b'T').count() as f64;
    let gc = upper.bytes().filter(|&c| c == b'G' || c == b'C').count() as f64;
    let tm = if length < 14 {
        at * 2.0 + gc * 4.0
    } else {
        64.9 + (41.0 * (gc - 16.4)) / length as f64
    };
    (tm * 100.0).round() / 100.0
}

const EDGE_MIN_LENGTH: usize = 18;
const EDGE_MAX_LENGTH: usize = 30;
const EDGE_TARGET_TM: f64 = 60.0;

/// Primer length for an edge primer anchored at `position`, grown from 18 nt
/// until the approximate Tm reaches 60 C (capped at 30 nt, falling back to
/// 18 nt when the target is never reached).
pub fn optimal_primer_length(sequence: &str, position: usize, direction: Direction) -> usize {
    let mut optimal = EDGE_MIN_LENGTH;
    match direction {
        Direction::Forward => {
            let limit = (EDGE_MAX_LENGTH + 1).min(sequence.len().saturating_sub(position));
            for length in EDGE_MIN_LENGTH..limit {
                let window = &sequence[position..position + length];
                if melting_temperature(window) >= EDGE_TARGET_TM {
                    optimal = length;
                    break;
                }
            }
        }
        Direction::Reverse => {
            let limit = (EDGE_MAX_LENGTH + 1).min(position + 1);
            for length in EDGE_MIN_LENGTH..limit {
                let window = &sequence[position - length..position];
                if melting_temperature(window) >= EDGE_TARGET_TM {
                    optimal = length;
                    break;
                }
            }
        }
    }
    optimal
}
