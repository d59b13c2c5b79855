//! Plan extraction through the generation collaborator.
//!
//! The collaborator is asked for a strict `{exercises: [...]}` document; the
//! values it returns are coerced into [`ExerciseEntry`] so callers cannot
//! tell which strategy ran.

use std::time::Duration;

use serde_json::Value;

use super::{ExerciseEntry, SetEntry, normalize_reps, parse_rest_seconds, parse_weight_value};
use crate::error::GenerationError;
use crate::generation::{ChatMessage, CompletionRequest, Generator, extract_json_block};
use crate::prompts;

pub const EXTRACTION_TEMPERATURE: f32 = 0.1;
pub const EXTRACTION_MAX_TOKENS: u32 = 600;

#[derive(Debug, thiserror::Error)]
pub enum AssistedParseError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("plan extraction timed out after {0:?}")]
    Timeout(Duration),
    #[error("plan extraction returned invalid JSON: {0}")]
    InvalidJson(String),
    #[error("plan extraction response has no exercises array")]
    MissingExercises,
    #[error("plan extraction found no exercises")]
    NoExercises,
}

pub fn extraction_request(plan_text: &str) -> CompletionRequest {
    CompletionRequest {
        messages: vec![
            ChatMessage::system(prompts::plan_extraction_system_prompt()),
            ChatMessage::user(prompts::plan_extraction_user_prompt(plan_text)),
        ],
        temperature: EXTRACTION_TEMPERATURE,
        max_tokens: EXTRACTION_MAX_TOKENS,
    }
}

/// Ask the collaborator for exercises, bounded by `timeout`.
pub async fn extract_exercises(
    generator: &dyn Generator,
    plan_text: &str,
    timeout: Duration,
) -> Result<Vec<ExerciseEntry>, AssistedParseError> {
    let request = extraction_request(plan_text);
    let raw = tokio::time::timeout(timeout, generator.complete(&request))
        .await
        .map_err(|_| AssistedParseError::Timeout(timeout))??;
    let exercises = exercises_from_completion(&raw)?;
    if exercises.is_empty() {
        return Err(AssistedParseError::NoExercises);
    }
    Ok(exercises)
}

/// Decode and normalise a raw extraction completion.
pub fn exercises_from_completion(raw: &str) -> Result<Vec<ExerciseEntry>, AssistedParseError> {
    let block = extract_json_block(raw)
        .ok_or_else(|| AssistedParseError::InvalidJson("no JSON object in response".into()))?;
    let document: Value = serde_json::from_str(block)
        .map_err(|error| AssistedParseError::InvalidJson(error.to_string()))?;
    let items = document
        .get("exercises")
        .and_then(Value::as_array)
        .ok_or(AssistedParseError::MissingExercises)?;

    Ok(items.iter().filter_map(exercise_from_value).collect())
}

fn exercise_from_value(value: &Value) -> Option<ExerciseEntry> {
    let name = value.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let mut exercise = ExerciseEntry::new(name);
    if let Some(sets) = value.get("sets").and_then(Value::as_array) {
        exercise.sets = sets
            .iter()
            .enumerate()
            .map(|(index, set)| set_from_value(set, index as u32 + 1))
            .collect();
    }
    Some(exercise.finalize_by_number())
}

fn set_from_value(value: &Value, position: u32) -> SetEntry {
    let number = value
        .get("number")
        .and_then(coerce_u32)
        .filter(|number| *number > 0)
        .unwrap_or(position);
    SetEntry {
        number,
        reps: value
            .get("reps")
            .map(|reps| normalize_reps(&coerce_text(reps)))
            .unwrap_or_default(),
        weight_kg: value.get("weight_kg").and_then(coerce_weight),
        rpe: value
            .get("rpe")
            .map(coerce_text)
            .filter(|rpe| !rpe.is_empty()),
        rest_sec: value.get("rest_sec").and_then(coerce_rest),
    }
}

fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    }
}

fn coerce_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Numbers pass through; strings like "80кг" or "82,5" keep their leading number.
fn coerce_weight(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|kg| kg.is_finite() && *kg >= 0.0),
        Value::String(text) => {
            let numeric: String = text
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || matches!(c, '.' | ','))
                .collect();
            parse_weight_value(&numeric)
        }
        _ => None,
    }
}

fn coerce_rest(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| secs.round() as u32),
        Value::String(text) => parse_rest_seconds(text),
        _ => None,
    }
}
