//! Reference handles of the form `$<step-id>.<output-name>`.
//!
//! The run context is keyed by the rendered form of a [`Reference`], so
//! parsing and rendering must round-trip exactly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::plan::StepId;

/// Sigil that marks a string as a run-context lookup.
pub const REFERENCE_SIGIL: char = '$';

/// Output name used when a step declares no outputs.
pub const DEFAULT_OUTPUT: &str = "result";

/// A parsed `(step, field)` handle into the run context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference {
    pub step: StepId,
    pub field: String,
}

impl Reference {
    pub fn new(step: StepId, field: impl Into<String>) -> Self {
        Self {
            step,
            field: field.into(),
        }
    }

    /// The key under which a step without declared outputs records its result.
    pub fn default_output(step: StepId) -> Self {
        Self::new(step, DEFAULT_OUTPUT)
    }

    /// Parse a whole string as a step reference. Anything else (including
    /// seed keys such as `$campaign`) yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(REFERENCE_SIGIL)?;
        let (digits, field) = rest.split_once('.')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if field.is_empty() || !field.bytes().all(is_field_byte) {
            return None;
        }
        let id = digits.parse::<u32>().ok()?;
        Some(Self::new(StepId(id), field))
    }

    /// Find every step reference embedded in a piece of text, in order of
    /// appearance.
    pub fn scan(text: &str) -> Vec<Self> {
        let bytes = text.as_bytes();
        let mut found = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] != b'$' {
                i += 1;
                continue;
            }
            let start = i;
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > start + 1 && j < bytes.len() && bytes[j] == b'.' {
                let mut k = j + 1;
                while k < bytes.len() && is_field_byte(bytes[k]) {
                    k += 1;
                }
                if let Some(reference) = Self::parse(&text[start..k]) {
                    found.push(reference);
                    i = k;
                    continue;
                }
            }
            i = start + 1;
        }
        found
    }

    /// The exact run-context key this reference reads.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}.{}", REFERENCE_SIGIL, self.step.0, self.field)
    }
}

fn is_field_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Returns true if a string value is a run-context lookup: a step reference
/// or a seed key such as `$campaign`.
pub fn is_reference_like(value: &str) -> bool {
    value.starts_with(REFERENCE_SIGIL)
}
