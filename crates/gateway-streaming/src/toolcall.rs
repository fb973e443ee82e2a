//! Partial tool-call marker detection (spec §4.7): scans the accumulated
//! delta text of a stream for the textual markers a provider might emit
//! mid-stream, plus brace-depth tracking for JSON-framed calls.

use std::collections::HashSet;

const MARKERS: [&str; 3] = ["tool_call", "function_call", "<tool_call>"];

/// Stateful per-stream detector. Each marker is reported at most once;
/// brace depth tracks whether the stream is currently inside a JSON
/// object (depth > 0), which callers use to decide whether a
/// newly-detected marker is actually inside a structured call payload.
#[derive(Debug, Default)]
pub struct ToolCallDetector {
    accumulated: String,
    brace_depth: i32,
    seen_markers: HashSet<&'static str>,
}

impl ToolCallDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one content delta, returning markers newly observed in this
    /// call (empty if none, or if all matching markers were already
    /// reported for this stream).
    pub fn observe(&mut self, delta: &str) -> Vec<&'static str> {
        self.accumulated.push_str(delta);
        for ch in delta.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => self.brace_depth = (self.brace_depth - 1).max(0),
                _ => {}
            }
        }

        MARKERS
            .iter()
            .copied()
            .filter(|marker| self.seen_markers.insert(marker) && self.accumulated.contains(marker))
            .collect()
    }

    /// True while brace depth indicates the stream is inside a
    /// JSON-framed call payload.
    pub fn in_json_call(&self) -> bool {
        self.brace_depth > 0
    }
}
