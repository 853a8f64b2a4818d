//! Progress reporting from the pipeline to the caller.
//!
//! The pipeline emits fire-and-forget updates after each meaningful step and
//! never waits on the sink. Callers that do not care pass a [`NullSink`].

use serde_json::Value;
use std::sync::Mutex;

/// Optional structured fields attached to an update (e.g. `restrictionSites`,
/// `mutationCount`, `callout`).
pub type Extra = serde_json::Map<String, Value>;

pub fn fields(pairs: &[(&str, Value)]) -> Extra {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub trait ProgressSink: Send + Sync {
    /// `percent` is 0..=100; a step may report 100 more than once.
    fn report(&self, step: &str, message: &str, percent: u8, extra: &Extra);
}

/// Discards all updates.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&self, _step: &str, _message: &str, _percent: u8, _extra: &Extra) {}
}

/// Writes one line per update to stderr; used by the CLI.
pub struct StderrSink;

impl ProgressSink for StderrSink {
    fn report(&self, step: &str, message: &str, percent: u8, extra: &Extra) {
        if extra.is_empty() {
            eprintln!("[{step} {percent:>3}%] {message}");
        } else {
            let keys: Vec<&str> = extra.keys().map(|k| k.as_str()).collect();
            eprintln!("[{step} {percent:>3}%] {message} ({})", keys.join(", "));
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    pub step: String,
    pub message: String,
    pub percent: u8,
    pub extra: Extra,
}

/// Records every update; handy in tests and for callers that forward
/// updates elsewhere after the run.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().expect("progress sink poisoned").clone()
    }

    pub fn percents_for_step(&self, step: &str) -> Vec<u8> {
        self.events()
            .iter()
            .filter(|e| e.step == step)
            .map(|e| e.percent)
            .collect()
    }
}

impl ProgressSink for MemorySink {
    fn report(&self, step: &str, message: &str, percent: u8, extra: &Extra) {
        self.events
            .lock()
            .expect("progress sink poisoned")
            .push(ProgressEvent {
                step: step.to_string(),
                message: message.to_string(),
                percent,
                extra: extra.clone(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.report("Prep", "start", 0, &Extra::new());
        sink.report("Prep", "done", 100, &fields(&[("callout", json!("ok"))]));
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].percent, 0);
        assert_eq!(events[1].extra.get("callout"), Some(&json!("ok")));
        assert_eq!(sink.percents_for_step("Prep"), vec![0, 100]);
    }
}
