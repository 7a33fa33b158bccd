use serde::{Deserialize, Serialize};
use std::fmt;

/// Tyre compound as presented to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compound {
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
    Unknown,
}

impl Compound {
    /// Resolve the integer code used by the telemetry assembler.
    /// Codes outside 0..=4 resolve to `Unknown`.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Compound::Soft,
            1 => Compound::Medium,
            2 => Compound::Hard,
            3 => Compound::Intermediate,
            4 => Compound::Wet,
            _ => Compound::Unknown,
        }
    }

    /// Resolve an already-named compound (case-insensitive).
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "SOFT" => Compound::Soft,
            "MEDIUM" => Compound::Medium,
            "HARD" => Compound::Hard,
            "INTERMEDIATE" => Compound::Intermediate,
            "WET" => Compound::Wet,
            _ => Compound::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Compound::Soft => "SOFT",
            Compound::Medium => "MEDIUM",
            Compound::Hard => "HARD",
            Compound::Intermediate => "INTERMEDIATE",
            Compound::Wet => "WET",
            Compound::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
