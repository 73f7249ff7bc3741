use serde::{Deserialize, Serialize};

use crate::rest::MAX_DENOMINATOR;

/// Starting state and error policy for [`crate::SimaiDecoder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Tempo assumed until the first `(bpm)` token.
    #[serde(default = "default_initial_bpm")]
    pub initial_bpm: f64,
    /// Beats per measure until the first `{n}` token.
    #[serde(default = "default_initial_divisor")]
    pub initial_divisor: u32,
    /// Log and drop malformed fragments instead of failing the whole chart.
    #[serde(default)]
    pub skip_invalid_fragments: bool,
}

fn default_initial_bpm() -> f64 {
    120.0
}

fn default_initial_divisor() -> u32 {
    4
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            initial_bpm: default_initial_bpm(),
            initial_divisor: default_initial_divisor(),
            skip_invalid_fragments: false,
        }
    }
}

/// Output settings for [`crate::SimaiEncoder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Largest denominator used for durations and rests.
    #[serde(default = "default_max_denominator")]
    pub max_denominator: u64,
    /// Start a new line whenever the whole measure number advances.
    #[serde(default = "default_measure_line_breaks")]
    pub measure_line_breaks: bool,
}

fn default_max_denominator() -> u64 {
    MAX_DENOMINATOR
}

fn default_measure_line_breaks() -> bool {
    true
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            max_denominator: default_max_denominator(),
            measure_line_breaks: default_measure_line_breaks(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimaiConfig {
    #[serde(default)]
    pub parse: ParseOptions,
    #[serde(default)]
    pub export: ExportOptions,
}

impl SimaiConfig {
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
