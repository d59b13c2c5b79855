//! The text-completion collaborator and the parse boundary for its output.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GenerationError;
use crate::normalize::strip_markup;
use crate::notes::{NoteKind, NoteWrite, WriteMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Arbitrary text-completion capability.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Raw completion text. Callers parse and validate it themselves.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError>;
}

/// Write candidate as emitted by the collaborator, before validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawWrite {
    #[serde(default)]
    pub d: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Collaborator output, decided once at the parse boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResponse {
    WellFormed { reply: String, writes: Vec<RawWrite> },
    Malformed { raw: String, reason: String },
}

impl GenerationResponse {
    pub fn is_well_formed(&self) -> bool {
        matches!(self, GenerationResponse::WellFormed { .. })
    }
}

/// First `{` through last `}` of `text`, if any.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse raw completion text into the tagged response.
///
/// Accepts a bare JSON object or one embedded in surrounding prose. Anything
/// that is not an object, or an object carrying neither `reply` nor
/// `writes`, is malformed.
pub fn parse_generation_response(raw: &str) -> GenerationResponse {
    let malformed = |reason: &str| GenerationResponse::Malformed {
        raw: raw.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return malformed("empty completion");
    }

    let value = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => value,
        Err(_) => match extract_json_block(trimmed).map(serde_json::from_str::<Value>) {
            Some(Ok(value)) => value,
            Some(Err(_)) => return malformed("embedded JSON block does not parse"),
            None => return malformed("no JSON object in completion"),
        },
    };

    let Value::Object(object) = value else {
        return malformed("completion is not a JSON object");
    };

    let reply = object.get("reply");
    let writes = object.get("writes");
    if reply.is_none() && writes.is_none() {
        return malformed("object has neither reply nor writes");
    }

    let reply = reply.and_then(Value::as_str).unwrap_or_default().to_string();
    let writes = match writes {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value::<RawWrite>(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    };

    GenerationResponse::WellFormed { reply, writes }
}

/// Turn a raw write into a [`NoteWrite`], or explain why it was dropped.
///
/// Unknown kinds and empty text are rejected. The mode always follows the
/// kind (logs append, plans replace) whatever the collaborator asked for, and
/// a missing or unparseable date falls back to `today`.
pub fn validate_write(raw: &RawWrite, today: NaiveDate) -> Result<NoteWrite, String> {
    let kind = raw
        .kind
        .as_deref()
        .ok_or_else(|| "write has no kind".to_string())?
        .parse::<NoteKind>()?;

    let mode = kind.default_write_mode();
    if let Some(requested) = raw.mode.as_deref() {
        if requested.parse::<WriteMode>().ok() != Some(mode) {
            tracing::debug!(
                %kind,
                requested,
                applied = mode.as_str(),
                "overriding proposed write mode"
            );
        }
    }

    let d = raw
        .d
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
        .unwrap_or(today);

    let text = strip_markup(raw.text.as_deref().unwrap_or_default());
    if text.is_empty() {
        return Err(format!("write for {kind} has empty text"));
    }

    Ok(NoteWrite { d, kind, mode, text })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    #[test]
    fn bare_object_is_well_formed() {
        let raw = r#"{"reply":"Записал","writes":[{"d":"2026-03-14","kind":"meals","mode":"append","text":"овсянка"}]}"#;
        match parse_generation_response(raw) {
            GenerationResponse::WellFormed { reply, writes } => {
                assert_eq!(reply, "Записал");
                assert_eq!(writes.len(), 1);
                assert_eq!(writes[0].kind.as_deref(), Some("meals"));
            }
            other => panic!("expected well-formed, got {other:?}"),
        }
    }

    #[test]
    fn object_embedded_in_prose_is_extracted() {
        let raw = "Конечно! Вот ответ:\n```json\n{\"reply\":\"Ок\",\"writes\":[]}\n```";
        assert!(parse_generation_response(raw).is_well_formed());
    }

    #[test]
    fn non_object_json_is_malformed() {
        assert!(!parse_generation_response("[1, 2, 3]").is_well_formed());
        assert!(!parse_generation_response("\"just text\"").is_well_formed());
    }

    #[test]
    fn object_missing_both_fields_is_malformed() {
        assert!(!parse_generation_response(r#"{"answer":"hi"}"#).is_well_formed());
    }

    #[test]
    fn plain_prose_and_empty_text_are_malformed() {
        assert!(!parse_generation_response("Записал тренировку").is_well_formed());
        assert!(!parse_generation_response("   ").is_well_formed());
    }

    #[test]
    fn empty_reply_with_no_writes_is_still_well_formed() {
        match parse_generation_response(r#"{"reply":"","writes":[]}"#) {
            GenerationResponse::WellFormed { reply, writes } => {
                assert!(reply.is_empty());
                assert!(writes.is_empty());
            }
            other => panic!("expected well-formed, got {other:?}"),
        }
    }

    #[test]
    fn validate_write_defaults_mode_and_date() {
        let raw = RawWrite {
            kind: Some("workouts".into()),
            text: Some("**жим** 4х8".into()),
            ..RawWrite::default()
        };
        let write = validate_write(&raw, today()).unwrap();
        assert_eq!(write.mode, WriteMode::Append);
        assert_eq!(write.d, today());
        assert_eq!(write.text, "жим 4х8");
    }

    #[test]
    fn validate_write_rejects_unknown_kind_and_empty_text() {
        let unknown = RawWrite {
            kind: Some("sleep".into()),
            text: Some("8 часов".into()),
            ..RawWrite::default()
        };
        assert!(validate_write(&unknown, today()).is_err());

        let empty = RawWrite {
            kind: Some("meals".into()),
            text: Some("  ".into()),
            ..RawWrite::default()
        };
        assert!(validate_write(&empty, today()).is_err());
    }

    #[test]
    fn validate_write_forces_the_mode_of_each_kind() {
        let log_replace = RawWrite {
            kind: Some("workouts".into()),
            mode: Some("replace".into()),
            text: Some("жим 4х8 80кг".into()),
            ..RawWrite::default()
        };
        assert_eq!(validate_write(&log_replace, today()).unwrap().mode, WriteMode::Append);

        let meals_garbage = RawWrite {
            kind: Some("meals".into()),
            mode: Some("overwrite".into()),
            text: Some("овсянка".into()),
            ..RawWrite::default()
        };
        assert_eq!(validate_write(&meals_garbage, today()).unwrap().mode, WriteMode::Append);

        let plan_append = RawWrite {
            kind: Some("plan".into()),
            mode: Some("append".into()),
            text: Some("Присед: 5х5 100кг".into()),
            ..RawWrite::default()
        };
        assert_eq!(validate_write(&plan_append, today()).unwrap().mode, WriteMode::Replace);
    }

    #[test]
    fn validate_write_keeps_explicit_date_and_replace_mode() {
        let raw = RawWrite {
            d: Some("2026-03-15".into()),
            kind: Some("plan".into()),
            mode: Some("replace".into()),
            text: Some("1. Присед: 5х5 100кг".into()),
        };
        let write = validate_write(&raw, today()).unwrap();
        assert_eq!(write.d, NaiveDate::from_ymd_opt(2026, 3, 15).unwrap());
        assert_eq!(write.mode, WriteMode::Replace);
    }
}
