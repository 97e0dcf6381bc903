//! Structured generator input and output validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{RiftError, RiftResult};
use crate::scoring::ParticipantScore;

/// Stable prompt text per prompt version. Part of the cache key.
pub fn system_prompt(version: &str) -> String {
    format!(
        "You are a concise esports analyst (prompt {version}). \
         Write a short spoken recap of one player's match from the JSON you receive. \
         Use only the numbers present in the input. Do not invent events, \
         do not describe crowd-control effects, and refer to the player only by the given subject name. \
         Plain prose, no markdown, at most three sentences."
    )
}

/// Everything the generator may use, and nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeInput {
    pub match_id: String,
    pub subject: String,
    pub participant_id: u8,
    #[serde(default)]
    pub team_id: Option<u16>,
    #[serde(default)]
    pub win: Option<bool>,
    pub overall_score: f64,
    pub dimensions: BTreeMap<String, f64>,
    pub strongest: String,
    pub weakest: String,
    pub raw_stats: BTreeMap<String, f64>,
}

impl NarrativeInput {
    pub fn from_score(match_id: &str, score: &ParticipantScore) -> Self {
        Self {
            match_id: match_id.to_string(),
            subject: score.display_subject(),
            participant_id: score.participant_id,
            team_id: score.team_id,
            win: score.win,
            overall_score: score.overall_score,
            dimensions: score
                .dimensions
                .iter()
                .map(|(d, v)| (d.label().to_string(), v))
                .collect(),
            strongest: score.strongest().0.display_name().to_string(),
            weakest: score.weakest().0.display_name().to_string(),
            raw_stats: score.raw_stats.clone(),
        }
    }

    pub fn to_json(&self) -> RiftResult<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Reject output that cannot be narrated: empty, oversized, or a bare
/// structured blob instead of prose.
pub fn validate_output(text: &str, max_chars: usize) -> RiftResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(RiftError::validation("narrative is empty"));
    }
    if trimmed.chars().count() > max_chars {
        return Err(RiftError::validation(format!(
            "narrative exceeds {max_chars} characters"
        )));
    }
    let looks_structured = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
        || (trimmed.starts_with('<') && trimmed.ends_with('>'));
    if looks_structured {
        return Err(RiftError::validation(
            "narrative is structured data, not prose",
        ));
    }
    if !trimmed.chars().any(char::is_alphabetic) {
        return Err(RiftError::validation("narrative contains no words"));
    }
    Ok(trimmed.to_string())
}
