//! AI puzzle generation.

use super::{validate, LibraryError, LibraryResult};
use crate::llm::{GenerateRequest, LlmManager};
use crate::types::*;
use serde::Deserialize;
use std::time::Duration;

const MAX_PER_REQUEST: u32 = 20;

const SYSTEM_PROMPT: &str = r#"You write puzzles for a "Wheel of Fortune" style word game played by students learning English.

Rules:
- Each puzzle is a short, common English phrase of 1 to 6 words.
- Use only letters and spaces; an apostrophe is allowed.
- Difficulty 1 is beginner vocabulary, 4 is idioms and longer phrases.
- No names of real people, nothing violent or unkind.

Reply with a JSON array only, no explanation:
[{"category": "Food", "phrase": "Apple pie", "difficulty": 1}]"#;

/// What to ask the model for
#[derive(Debug, Clone)]
pub struct GenerateSpec {
    pub category: Option<String>,
    pub difficulty: Option<u8>,
    pub count: u32,
}

impl GenerateSpec {
    fn prompt(&self) -> String {
        let count = self.count.clamp(1, MAX_PER_REQUEST);
        let mut prompt = format!("Write {} new puzzles.", count);
        if let Some(category) = self.category.as_deref().filter(|c| !c.trim().is_empty()) {
            prompt.push_str(&format!(" Category: {}.", category.trim()));
        }
        if let Some(difficulty) = self.difficulty {
            prompt.push_str(&format!(
                " Difficulty: {}.",
                difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
            ));
        }
        prompt
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedPuzzle {
    #[serde(default)]
    category: Option<String>,
    phrase: String,
    #[serde(default)]
    difficulty: Option<u8>,
}

/// Strip a surrounding markdown code fence, if any
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a model reply into valid puzzles. Entries that fail validation are dropped.
pub fn parse_generated(text: &str, fallback_category: Option<&str>) -> Vec<Puzzle> {
    let body = strip_fence(text);
    // Tolerate chatter around the array
    let body = match (body.find('['), body.rfind(']')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => body,
    };

    let raw: Vec<serde_json::Value> = match serde_json::from_str(body) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Generated puzzles are not a JSON array: {}", e);
            return Vec::new();
        }
    };

    raw.into_iter()
        .filter_map(|value| serde_json::from_value::<GeneratedPuzzle>(value).ok())
        .filter_map(|g| {
            let category = g
                .category
                .or_else(|| fallback_category.map(str::to_string))
                .unwrap_or_default();
            validate(Puzzle {
                id: None,
                category,
                phrase: g.phrase,
                difficulty: g.difficulty,
            })
            .map_err(|e| tracing::debug!("Dropping generated puzzle: {}", e))
            .ok()
        })
        .collect()
}

/// Ask the first working provider for new puzzles
pub async fn generate_puzzles(
    manager: &LlmManager,
    spec: &GenerateSpec,
    timeout: Duration,
    max_tokens: u32,
) -> LibraryResult<Vec<Puzzle>> {
    let request = GenerateRequest {
        prompt: spec.prompt(),
        system_prompt: Some(SYSTEM_PROMPT.to_string()),
        max_tokens: Some(max_tokens),
        // Varied phrasing across repeated requests
        temperature: Some(0.9),
        timeout,
        model_override: None,
    };

    let response = manager.generate_first(request).await?;
    let puzzles = parse_generated(&response.text, spec.category.as_deref());
    tracing::info!(
        "{} produced {} usable puzzles",
        response.metadata.provider,
        puzzles.len()
    );

    if puzzles.is_empty() {
        return Err(LibraryError::NothingGenerated);
    }
    Ok(puzzles)
}
