//! PostgreSQL persistence: the note store, per-set checklist progress and
//! user profiles.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use trener_core::checklist::{ProgressKey, SetProgress, SetStateUpdate};
use trener_core::error::StoreError;
use trener_core::notes::{Note, NoteKind, NoteStore};
use trener_core::profile::{ProfileUpdate, UserProfile};

#[derive(Clone)]
pub struct PgNoteStore {
    db: PgPool,
}

impl PgNoteStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Full note row; a note never written comes back empty with no timestamp.
    pub async fn fetch(
        &self,
        user_id: &str,
        d: NaiveDate,
        kind: NoteKind,
    ) -> Result<Note, sqlx::Error> {
        let row = sqlx::query_as::<_, NoteRow>(
            "SELECT text, updated_at FROM notes WHERE user_id = $1 AND d = $2 AND kind = $3",
        )
        .bind(user_id)
        .bind(d)
        .bind(kind.as_str())
        .fetch_optional(&self.db)
        .await?;

        Ok(match row {
            Some(row) => Note {
                d,
                kind,
                text: row.text,
                updated_at: row.updated_at,
            },
            None => Note {
                d,
                kind,
                text: String::new(),
                updated_at: None,
            },
        })
    }
}

#[derive(sqlx::FromRow)]
struct NoteRow {
    text: String,
    updated_at: Option<DateTime<Utc>>,
}

fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => StoreError::Unavailable,
        other => StoreError::Backend(other.to_string()),
    }
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn get(&self, user_id: &str, d: NaiveDate, kind: NoteKind) -> Result<String, StoreError> {
        sqlx::query_scalar::<_, String>(
            "SELECT text FROM notes WHERE user_id = $1 AND d = $2 AND kind = $3",
        )
        .bind(user_id)
        .bind(d)
        .bind(kind.as_str())
        .fetch_optional(&self.db)
        .await
        .map(Option::unwrap_or_default)
        .map_err(store_error)
    }

    async fn put(
        &self,
        user_id: &str,
        d: NaiveDate,
        kind: NoteKind,
        text: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO notes (user_id, d, kind, text, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (user_id, d, kind)
            DO UPDATE SET text = EXCLUDED.text, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(d)
        .bind(kind.as_str())
        .bind(text)
        .execute(&self.db)
        .await
        .map(|_| ())
        .map_err(store_error)
    }

    /// Single-statement append, so concurrent appends to one note both land.
    async fn append(
        &self,
        user_id: &str,
        d: NaiveDate,
        kind: NoteKind,
        chunk: &str,
    ) -> Result<String, StoreError> {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            return self.get(user_id, d, kind).await;
        }

        sqlx::query_scalar::<_, String>(
            r#"
            INSERT INTO notes (user_id, d, kind, text, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (user_id, d, kind)
            DO UPDATE SET
                text = CASE
                    WHEN btrim(notes.text, E' \t\r\n') = '' THEN EXCLUDED.text
                    ELSE rtrim(notes.text, E' \t\r\n') || E'\n\n' || EXCLUDED.text
                END,
                updated_at = NOW()
            RETURNING text
            "#,
        )
        .bind(user_id)
        .bind(d)
        .bind(kind.as_str())
        .bind(chunk)
        .fetch_one(&self.db)
        .await
        .map_err(store_error)
    }
}

#[derive(sqlx::FromRow)]
struct SetStateRow {
    exercise_name: String,
    set_number: i32,
    weight: Option<f64>,
    reps: Option<String>,
    completed: bool,
    skipped: bool,
}

impl SetStateRow {
    fn into_entry(self) -> (ProgressKey, SetProgress) {
        let number = u32::try_from(self.set_number).unwrap_or_default();
        (
            (self.exercise_name, number),
            SetProgress {
                completed: self.completed,
                skipped: self.skipped,
                performed_reps: self.reps,
                performed_weight: self.weight,
            },
        )
    }
}

/// Stored progress for every set of the user's plan on `d`.
pub async fn load_progress(
    db: &PgPool,
    user_id: &str,
    d: NaiveDate,
) -> Result<HashMap<ProgressKey, SetProgress>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SetStateRow>(
        r#"
        SELECT exercise_name, set_number, weight, reps, completed, skipped
        FROM workout_set_state
        WHERE user_id = $1 AND d = $2
        "#,
    )
    .bind(user_id)
    .bind(d)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(SetStateRow::into_entry).collect())
}

/// Merge a partial update into one set's stored progress.
pub async fn save_progress(
    db: &PgPool,
    user_id: &str,
    d: NaiveDate,
    update: &SetStateUpdate,
) -> Result<SetProgress, sqlx::Error> {
    let set_number = i32::try_from(update.set_number).unwrap_or(i32::MAX);
    let mut tx = db.begin().await?;

    let existing = sqlx::query_as::<_, SetStateRow>(
        r#"
        SELECT exercise_name, set_number, weight, reps, completed, skipped
        FROM workout_set_state
        WHERE user_id = $1 AND d = $2 AND exercise_name = $3 AND set_number = $4
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .bind(d)
    .bind(&update.exercise_name)
    .bind(set_number)
    .fetch_optional(&mut *tx)
    .await?;

    let mut progress = existing
        .map(|row| row.into_entry().1)
        .unwrap_or_default();
    progress.apply(update);

    sqlx::query(
        r#"
        INSERT INTO workout_set_state
            (user_id, d, exercise_name, set_number, weight, reps, completed, skipped, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
        ON CONFLICT (user_id, d, exercise_name, set_number)
        DO UPDATE SET
            weight = EXCLUDED.weight,
            reps = EXCLUDED.reps,
            completed = EXCLUDED.completed,
            skipped = EXCLUDED.skipped,
            updated_at = NOW()
        "#,
    )
    .bind(user_id)
    .bind(d)
    .bind(&update.exercise_name)
    .bind(set_number)
    .bind(progress.performed_weight)
    .bind(progress.performed_reps.as_deref())
    .bind(progress.completed)
    .bind(progress.skipped)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(progress)
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    height_cm: Option<i32>,
    weight_kg: Option<f64>,
    age: Option<i32>,
    sex: Option<String>,
    goal: Option<String>,
    experience: Option<String>,
    injuries: Option<String>,
    equipment: Option<String>,
    schedule: Option<String>,
    target_weight_kg: Option<f64>,
    workouts_per_week: Option<i32>,
    updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            height_cm: row.height_cm,
            weight_kg: row.weight_kg,
            age: row.age,
            sex: row.sex,
            goal: row.goal,
            experience: row.experience,
            injuries: row.injuries,
            equipment: row.equipment,
            schedule: row.schedule,
            target_weight_kg: row.target_weight_kg,
            workouts_per_week: row.workouts_per_week,
            updated_at: Some(row.updated_at),
        }
    }
}

const PROFILE_COLUMNS: &str = "height_cm, weight_kg, age, sex, goal, experience, injuries, \
     equipment, schedule, target_weight_kg, workouts_per_week, updated_at";

/// The user's profile; empty when none was saved.
pub async fn load_profile(db: &PgPool, user_id: &str) -> Result<UserProfile, sqlx::Error> {
    let row = sqlx::query_as::<_, ProfileRow>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM user_profile WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(row.map(UserProfile::from).unwrap_or_default())
}

/// Merge a partial update into the stored profile.
pub async fn save_profile(
    db: &PgPool,
    user_id: &str,
    update: &ProfileUpdate,
) -> Result<UserProfile, sqlx::Error> {
    let mut tx = db.begin().await?;

    let existing = sqlx::query_as::<_, ProfileRow>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM user_profile WHERE user_id = $1 FOR UPDATE"
    ))
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let mut profile = existing.map(UserProfile::from).unwrap_or_default();
    profile.apply(update);

    let updated_at = sqlx::query_scalar::<_, DateTime<Utc>>(
        r#"
        INSERT INTO user_profile
            (user_id, height_cm, weight_kg, age, sex, goal, experience, injuries,
             equipment, schedule, target_weight_kg, workouts_per_week, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW())
        ON CONFLICT (user_id)
        DO UPDATE SET
            height_cm = EXCLUDED.height_cm,
            weight_kg = EXCLUDED.weight_kg,
            age = EXCLUDED.age,
            sex = EXCLUDED.sex,
            goal = EXCLUDED.goal,
            experience = EXCLUDED.experience,
            injuries = EXCLUDED.injuries,
            equipment = EXCLUDED.equipment,
            schedule = EXCLUDED.schedule,
            target_weight_kg = EXCLUDED.target_weight_kg,
            workouts_per_week = EXCLUDED.workouts_per_week,
            updated_at = NOW()
        RETURNING updated_at
        "#,
    )
    .bind(user_id)
    .bind(profile.height_cm)
    .bind(profile.weight_kg)
    .bind(profile.age)
    .bind(profile.sex.as_deref())
    .bind(profile.goal.as_deref())
    .bind(profile.experience.as_deref())
    .bind(profile.injuries.as_deref())
    .bind(profile.equipment.as_deref())
    .bind(profile.schedule.as_deref())
    .bind(profile.target_weight_kg)
    .bind(profile.workouts_per_week)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    profile.updated_at = Some(updated_at);
    Ok(profile)
}

/// Rendered profile block for a turn prompt. A failed lookup is logged and
/// treated as no profile.
pub async fn profile_prompt(db: &PgPool, user_id: &str) -> Option<String> {
    match load_profile(db, user_id).await {
        Ok(profile) => profile.prompt_block(),
        Err(err) => {
            tracing::warn!(user_id, error = %err, "profile lookup failed, continuing without it");
            None
        }
    }
}
