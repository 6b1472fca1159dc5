//! Weighbridge scale protocol.
//!
//! The scale emits newline-delimited ASCII; a stable-weight line looks
//! like `ST,GS,+  10.00kg`. Parsing is incremental so hosts can feed raw
//! serial chunks as they arrive.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Connection state of the scale, as surfaced to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
    Mock,
}

/// Incremental parser for the scale's line protocol.
///
/// Chunks are buffered until a newline completes a line; the trailing
/// partial line waits for the next chunk. Lines that do not carry a
/// stable-weight reading are ignored.
pub struct FrameParser {
    buffer: String,
    pattern: Regex,
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            pattern: Regex::new(r"ST,GS,\s*\+\s*([0-9.]+)").expect("Invalid regex"),
        }
    }

    /// Feed a chunk of bytes, returning every weight reading the chunk
    /// completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<f64> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut readings = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            if let Some(captures) = self.pattern.captures(&line) {
                if let Ok(weight) = captures[1].parse::<f64>() {
                    readings.push(weight);
                }
            }
        }
        readings
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}
