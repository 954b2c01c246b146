// src/gate.rs
//! Quality gate: decides whether extracted text is worth a summarization call.

use std::fmt;

pub const DEFAULT_MIN_CHARS: usize = 50;

/// Reason string recorded on entries the gate turns away.
pub const INSUFFICIENT_CONTENT: &str = "insufficient content";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentTooShort {
    pub len: usize,
    pub min: usize,
}

impl fmt::Display for ContentTooShort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "content too short ({} < {} chars)", self.len, self.min)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Accept,
    Reject(ContentTooShort),
}

impl GateDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, GateDecision::Accept)
    }
}

/// Length threshold measured in characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityGate {
    min_chars: usize,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CHARS)
    }
}

impl QualityGate {
    /// `min_chars` of 0 is treated as 1 so empty text is always rejected.
    pub fn new(min_chars: usize) -> Self {
        Self {
            min_chars: min_chars.max(1),
        }
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    pub fn check(&self, text: &str) -> GateDecision {
        let len = text.chars().count();
        if len < self.min_chars {
            GateDecision::Reject(ContentTooShort {
                len,
                min: self.min_chars,
            })
        } else {
            GateDecision::Accept
        }
    }
}
