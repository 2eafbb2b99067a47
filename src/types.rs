//! Run records: segments and results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::heuristics::estimate_tokens;
use crate::tendency::TendencyState;

/// One generated chunk of reasoning under one voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtSegment {
    /// Catalog id of the voice that produced this segment.
    pub voice_id: String,
    /// Trimmed generated text.
    pub content: String,
    /// Approximate token count (`ceil(chars / 4)`).
    pub token_count: usize,
}

impl ThoughtSegment {
    /// Build a segment from raw generated text: trims it and estimates tokens.
    pub fn new(voice_id: impl Into<String>, raw: &str) -> Self {
        let content = raw.trim().to_string();
        let token_count = estimate_tokens(&content);
        Self {
            voice_id: voice_id.into(),
            content,
            token_count,
        }
    }
}

/// Outcome of one full run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingResult {
    /// Unique id of the run.
    pub run_id: String,
    /// Segments in generation order.
    pub segments: Vec<ThoughtSegment>,
    /// All segment contents joined by a blank line.
    pub final_thought: String,
    /// Tendency state at the end of the run, when a tendency mode was active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_tendency: Option<TendencyState>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ThinkingResult {
    /// Sum of the approximate token counts of all segments.
    pub fn total_tokens(&self) -> usize {
        self.segments.iter().map(|s| s.token_count).sum()
    }

    /// Voice ids in segment order.
    pub fn voice_sequence(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.voice_id.as_str()).collect()
    }
}
