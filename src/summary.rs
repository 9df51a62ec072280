//! Helpers for consuming run results: the judge's JSON verdicts and the
//! simulation marker on provider answers.

use crate::error::{Error, Result};
use crate::llm::simulation::SIMULATION_MARKER;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub analysis: Vec<Verdict>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub model_name: String,
    #[serde(deserialize_with = "score_from_number_or_string")]
    pub score: f64,
    #[serde(default)]
    pub verdict: String,
}

impl Verdict {
    /// Five-star rating, one star per 20 points.
    pub fn stars(&self) -> u8 {
        (self.score / 20.0).round().clamp(0.0, 5.0) as u8
    }
}

impl Analysis {
    /// Scores given to more than one provider.
    pub fn duplicate_scores(&self) -> Vec<f64> {
        let mut counts: BTreeMap<u64, (f64, usize)> = BTreeMap::new();
        for v in &self.analysis {
            counts.entry(v.score.to_bits()).or_insert((v.score, 0)).1 += 1;
        }
        counts
            .into_values()
            .filter(|(_, n)| *n > 1)
            .map(|(score, _)| score)
            .collect()
    }

    pub fn scores_in_range(&self) -> bool {
        self.analysis
            .iter()
            .all(|v| (1.0..=100.0).contains(&v.score))
    }
}

// The judging prompt shows `score` as a quoted string, so accept both.
fn score_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Score {
        Number(f64),
        Text(String),
    }

    match Score::deserialize(deserializer)? {
        Score::Number(n) => Ok(n),
        Score::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("score '{s}' is not a number"))),
    }
}

/// Remove a leading ```json fence and a trailing ``` fence, if present.
pub fn strip_json_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest.strip_prefix('\n').unwrap_or(rest);
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Parse the judge's reply. Fails on anything that is not the analysis object.
pub fn parse_analysis(summary_text: &str) -> Result<Analysis> {
    serde_json::from_str(strip_json_fences(summary_text))
        .map_err(|e| Error::parse(format!("summary JSON: {e}")))
}

/// Split off the simulation marker: `(is_simulated, display_text)`.
pub fn split_simulation_marker(content: &str) -> (bool, &str) {
    match content.strip_prefix(SIMULATION_MARKER) {
        Some(rest) => (true, rest.trim()),
        None => (false, content),
    }
}
