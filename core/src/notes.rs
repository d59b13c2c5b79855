//! Per-user, per-day, per-kind note blobs and the store protocol over them.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use utoipa::ToSchema;

use crate::error::StoreError;

/// Separator placed between an existing note and an appended chunk.
pub const APPEND_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    Workouts,
    Meals,
    Plan,
}

impl NoteKind {
    pub const ALL: [NoteKind; 3] = [NoteKind::Workouts, NoteKind::Meals, NoteKind::Plan];

    pub fn as_str(self) -> &'static str {
        match self {
            NoteKind::Workouts => "workouts",
            NoteKind::Meals => "meals",
            NoteKind::Plan => "plan",
        }
    }

    /// Workout and meal logs accumulate over the day; a plan supersedes the previous one.
    pub fn default_write_mode(self) -> WriteMode {
        match self {
            NoteKind::Workouts | NoteKind::Meals => WriteMode::Append,
            NoteKind::Plan => WriteMode::Replace,
        }
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "workouts" => Ok(NoteKind::Workouts),
            "meals" => Ok(NoteKind::Meals),
            "plan" => Ok(NoteKind::Plan),
            other => Err(format!(
                "unknown note kind '{other}', expected one of: workouts, meals, plan"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    Append,
    Replace,
}

impl WriteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteMode::Append => "append",
            WriteMode::Replace => "replace",
        }
    }
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "append" => Ok(WriteMode::Append),
            "replace" => Ok(WriteMode::Replace),
            other => Err(format!("unknown write mode '{other}', expected append or replace")),
        }
    }
}

/// One validated write produced by a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NoteWrite {
    pub d: NaiveDate,
    pub kind: NoteKind,
    pub mode: WriteMode,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Note {
    pub d: NaiveDate,
    pub kind: NoteKind,
    pub text: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Textual append: the chunk alone for an empty note, otherwise
/// `existing + "\n\n" + chunk`.
pub fn merge_append(existing: &str, chunk: &str) -> String {
    let existing = existing.trim_end();
    let chunk = chunk.trim();
    if existing.trim().is_empty() {
        return chunk.to_string();
    }
    if chunk.is_empty() {
        return existing.to_string();
    }
    format!("{existing}{APPEND_SEPARATOR}{chunk}")
}

/// Key-value document store holding one text blob per (user, date, kind).
///
/// Implementations only need atomic single-key `get`/`put`; `append` is a
/// read-then-write on top of them and offers no protection against two
/// concurrent appends to the same key.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Current text, empty when the note was never written.
    async fn get(&self, user_id: &str, d: NaiveDate, kind: NoteKind) -> Result<String, StoreError>;

    async fn put(
        &self,
        user_id: &str,
        d: NaiveDate,
        kind: NoteKind,
        text: &str,
    ) -> Result<(), StoreError>;

    async fn append(
        &self,
        user_id: &str,
        d: NaiveDate,
        kind: NoteKind,
        chunk: &str,
    ) -> Result<String, StoreError> {
        let existing = self.get(user_id, d, kind).await?;
        let merged = merge_append(&existing, chunk);
        self.put(user_id, d, kind, &merged).await?;
        Ok(merged)
    }

    /// Apply a write with its own mode's semantics.
    async fn apply(&self, user_id: &str, write: &NoteWrite) -> Result<(), StoreError> {
        match write.mode {
            WriteMode::Append => self
                .append(user_id, write.d, write.kind, &write.text)
                .await
                .map(|_| ()),
            WriteMode::Replace => self.put(user_id, write.d, write.kind, &write.text).await,
        }
    }
}

type NoteKey = (String, NaiveDate, NoteKind);

/// Process-local store for tests and offline tooling.
#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    notes: Mutex<HashMap<NoteKey, String>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn get(&self, user_id: &str, d: NaiveDate, kind: NoteKind) -> Result<String, StoreError> {
        let notes = self.notes.lock().await;
        Ok(notes
            .get(&(user_id.to_string(), d, kind))
            .cloned()
            .unwrap_or_default())
    }

    async fn put(
        &self,
        user_id: &str,
        d: NaiveDate,
        kind: NoteKind,
        text: &str,
    ) -> Result<(), StoreError> {
        let mut notes = self.notes.lock().await;
        notes.insert((user_id.to_string(), d, kind), text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    #[test]
    fn appending_to_empty_note_yields_chunk_without_separator() {
        assert_eq!(merge_append("", "жим 4х8 80кг"), "жим 4х8 80кг");
        assert_eq!(merge_append("  \n", "жим 4х8 80кг"), "жим 4х8 80кг");
    }

    #[test]
    fn appending_to_existing_note_inserts_blank_line() {
        assert_eq!(merge_append("завтрак", "обед"), "завтрак\n\nобед");
        assert_eq!(merge_append("завтрак\n", "обед"), "завтрак\n\nобед");
    }

    #[test]
    fn note_kind_parses_literal_strings_only() {
        assert_eq!("workouts".parse::<NoteKind>().unwrap(), NoteKind::Workouts);
        assert_eq!(" Meals ".parse::<NoteKind>().unwrap(), NoteKind::Meals);
        assert_eq!("plan".parse::<NoteKind>().unwrap(), NoteKind::Plan);
        assert!("sets".parse::<NoteKind>().is_err());
    }

    #[test]
    fn note_kind_serializes_lowercase() {
        let json = serde_json::to_string(&NoteKind::Workouts).unwrap();
        assert_eq!(json, "\"workouts\"");
    }

    #[test]
    fn default_write_modes_follow_kind() {
        assert_eq!(NoteKind::Workouts.default_write_mode(), WriteMode::Append);
        assert_eq!(NoteKind::Meals.default_write_mode(), WriteMode::Append);
        assert_eq!(NoteKind::Plan.default_write_mode(), WriteMode::Replace);
    }

    #[tokio::test]
    async fn memory_store_returns_empty_for_unwritten_note() {
        let store = MemoryNoteStore::new();
        let text = store.get("u1", day(), NoteKind::Meals).await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn memory_store_append_then_put_follows_write_semantics() {
        let store = MemoryNoteStore::new();
        store.append("u1", day(), NoteKind::Meals, "завтрак").await.unwrap();
        let merged = store.append("u1", day(), NoteKind::Meals, "обед").await.unwrap();
        assert_eq!(merged, "завтрак\n\nобед");

        store.put("u1", day(), NoteKind::Meals, "только ужин").await.unwrap();
        assert_eq!(
            store.get("u1", day(), NoteKind::Meals).await.unwrap(),
            "только ужин"
        );
    }

    #[tokio::test]
    async fn memory_store_keys_are_isolated_per_user_and_kind() {
        let store = MemoryNoteStore::new();
        store.put("u1", day(), NoteKind::Plan, "план").await.unwrap();
        assert_eq!(store.get("u2", day(), NoteKind::Plan).await.unwrap(), "");
        assert_eq!(store.get("u1", day(), NoteKind::Meals).await.unwrap(), "");
    }

    #[tokio::test]
    async fn apply_dispatches_on_write_mode() {
        let store = MemoryNoteStore::new();
        let append = NoteWrite {
            d: day(),
            kind: NoteKind::Workouts,
            mode: WriteMode::Append,
            text: "присед 5х5 100кг".to_string(),
        };
        store.apply("u1", &append).await.unwrap();
        store.apply("u1", &append).await.unwrap();
        assert_eq!(
            store.get("u1", day(), NoteKind::Workouts).await.unwrap(),
            "присед 5х5 100кг\n\nприсед 5х5 100кг"
        );

        let replace = NoteWrite {
            mode: WriteMode::Replace,
            text: "заново".to_string(),
            ..append
        };
        store.apply("u1", &replace).await.unwrap();
        assert_eq!(
            store.get("u1", day(), NoteKind::Workouts).await.unwrap(),
            "заново"
        );
    }
}
