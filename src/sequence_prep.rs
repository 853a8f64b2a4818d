//! Trims an input sequence to a clean open reading frame before detection.

use crate::progress::{Extra, ProgressSink, fields};
use serde_json::json;

const STOP_CODONS: [&str; 3] = ["TAA", "TAG", "TGA"];

/// Left-side MTK parts whose fusion context carries its own start codon, so a
/// leading ATG in the insert is redundant and gets stripped.
const N_TERMINAL_PARTS: [&str; 2] = ["3", "3a"];

pub const STEP: &str = "Preprocessing";

pub struct SequencePreparator;

impl SequencePreparator {
    /// Upper-cases the input, strips a leading start codon (for N-terminal
    /// fusion parts) and a trailing stop codon, then trims any frame
    /// remainder from the end opposite the codon that was removed.
    ///
    /// A sequence that stays out of frame with nothing to trim is reported
    /// as a warning and passed through unchanged; no input is rejected.
    pub fn prepare(
        &self,
        sequence: &str,
        mtk_part_left: &str,
        sink: &dyn ProgressSink,
    ) -> (String, bool) {
        sink.report(STEP, "Starting sequence preprocessing", 0, &Extra::new());

        let mut cleaned = sequence.to_ascii_uppercase();
        let in_frame = cleaned.len() % 3 == 0;
        sink.report(
            STEP,
            "Frame checked, looking for start/stop codons",
            20,
            &Extra::new(),
        );

        let mut trimmed_start = false;
        if N_TERMINAL_PARTS.contains(&mtk_part_left) && cleaned.starts_with("ATG") {
            cleaned.drain(..3);
            trimmed_start = true;
            sink.report(STEP, "Start codon detected and removed", 40, &Extra::new());
        } else {
            sink.report(
                STEP,
                "No start codon detected or removal needed",
                40,
                &Extra::new(),
            );
        }

        let mut trimmed_stop = false;
        if cleaned.len() >= 3 && STOP_CODONS.contains(&&cleaned[cleaned.len() - 3..]) {
            cleaned.truncate(cleaned.len() - 3);
            trimmed_stop = true;
            sink.report(STEP, "Stop codon detected and removed", 60, &Extra::new());
        } else {
            sink.report(
                STEP,
                "No stop codon detected or removal needed",
                60,
                &Extra::new(),
            );
        }

        let remainder = cleaned.len() % 3;
        if remainder != 0 {
            if trimmed_start {
                cleaned.truncate(cleaned.len() - remainder);
                sink.report(
                    STEP,
                    &format!("Adjusting frame by trimming {remainder} bases from the end"),
                    80,
                    &Extra::new(),
                );
            } else if trimmed_stop {
                cleaned.drain(..remainder);
                sink.report(
                    STEP,
                    &format!("Adjusting frame by trimming {remainder} bases from the beginning"),
                    80,
                    &Extra::new(),
                );
            } else {
                sink.report(
                    STEP,
                    "Warning: Sequence not in frame and no codons to trim",
                    80,
                    &Extra::new(),
                );
            }
        } else {
            sink.report(
                STEP,
                "Sequence already in frame, no adjustment needed",
                80,
                &Extra::new(),
            );
        }

        let (message, notification_count, notification_type) = if !in_frame {
            match (trimmed_start, trimmed_stop) {
                (true, true) => (
                    "Provided sequence does not appear to be in frame, using provided start \
                     codon to infer translation frame. Stop and start codons detected and have \
                     been removed."
                        .to_string(),
                    3,
                    "info",
                ),
                (true, false) => (
                    "Provided sequence does not appear to be in frame, using provided start \
                     codon to infer translation frame. Start codon has been removed."
                        .to_string(),
                    2,
                    "info",
                ),
                (false, true) => (
                    "Provided sequence does not appear to be in frame, using provided stop \
                     codon to infer frame. Stop codon has been removed."
                        .to_string(),
                    2,
                    "info",
                ),
                (false, false) => {
                    let message = "Provided sequence does not appear to be in frame. If this \
                                   is not intended, please check the sequence."
                        .to_string();
                    log::warn!("sequence not in frame and no codons to trim");
                    sink.report(
                        STEP,
                        "Sequence not in frame and cannot be corrected",
                        100,
                        &fields(&[
                            ("notificationCount", json!(1)),
                            ("notificationType", json!("warning")),
                            ("processedSequence", json!(cleaned)),
                            (
                                "callout",
                                json!(
                                    "Warning: Sequence not in frame and cannot be corrected. \
                                     Be sure this is what you intended."
                                ),
                            ),
                        ]),
                    );
                    return (cleaned, true);
                }
            }
        } else {
            match (trimmed_start, trimmed_stop) {
                (true, true) => (
                    "Start and stop codons detected and removed.".to_string(),
                    2,
                    "info",
                ),
                (true, false) => ("Start codon detected and removed.".to_string(), 1, "info"),
                (false, true) => ("Stop codon detected and removed.".to_string(), 1, "info"),
                (false, false) => (
                    "Sequence is in frame, no codon adjustments needed.".to_string(),
                    0,
                    "info",
                ),
            }
        };

        sink.report(
            STEP,
            &format!("Preprocessing complete: {message}"),
            100,
            &fields(&[
                ("notificationCount", json!(notification_count)),
                ("notificationType", json!(notification_type)),
                ("callout", json!(message)),
                ("processedSequence", json!(cleaned)),
            ]),
        );
        (cleaned, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::MemorySink;

    fn prepare(sequence: &str, part: &str) -> (String, bool, MemorySink) {
        let sink = MemorySink::new();
        let (out, ok) = SequencePreparator.prepare(sequence, part, &sink);
        (out, ok, sink)
    }

    #[test]
    fn test_in_frame_sequence_unchanged() {
        let seq = "GCTGCAGCGGCT"; // 4 codons, no start/stop at the termini
        let (out, ok, _) = prepare(seq, "4");
        assert!(ok);
        assert_eq!(out, seq);
    }

    #[test]
    fn test_strips_start_and_stop() {
        let (out, ok, _) = prepare("ATGGCTGCATAA", "3");
        assert!(ok);
        assert_eq!(out, "GCTGCA");
    }

    #[test]
    fn test_start_codon_kept_outside_n_terminal_parts() {
        let (out, _, _) = prepare("ATGGCTGCATAA", "4");
        assert_eq!(out, "ATGGCTGCA");
    }

    #[test]
    fn test_frame_remainder_trimmed_from_end_after_start_trim() {
        // After ATG removal length is 7; the trailing remainder goes.
        let (out, _, _) = prepare("ATGGCTGCAG", "3");
        assert_eq!(out, "GCTGCA");
    }

    #[test]
    fn test_frame_remainder_trimmed_from_front_after_stop_trim() {
        // After TAA removal length is 7; the leading remainder goes.
        let (out, _, _) = prepare("GGCTGCATAA", "4");
        assert_eq!(out, "GCTGCA");
    }

    #[test]
    fn test_out_of_frame_without_trims_passes_through_with_warning() {
        let (out, ok, sink) = prepare("GCTGCAG", "4");
        assert!(ok);
        assert_eq!(out, "GCTGCAG");
        let last = sink.events().last().cloned().unwrap();
        assert_eq!(last.percent, 100);
        assert_eq!(
            last.extra.get("notificationType"),
            Some(&serde_json::json!("warning"))
        );
    }

    #[test]
    fn test_progress_checkpoints_in_order() {
        let (_, _, sink) = prepare("ATGGCTGCATAA", "3");
        assert_eq!(sink.percents_for_step(STEP), vec![0, 20, 40, 60, 80, 100]);
    }

    #[test]
    fn test_lower_case_input_is_normalized() {
        let (out, _, _) = prepare("atggctgcataa", "3a");
        assert_eq!(out, "GCTGCA");
    }
}
