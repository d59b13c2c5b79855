//! Completion and skip state layered over a freshly parsed plan.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::plan::{ExerciseEntry, ParsedPlan, PlanParseStrategy, SetEntry};

/// Stored progress of one planned set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SetProgress {
    pub completed: bool,
    pub skipped: bool,
    pub performed_reps: Option<String>,
    pub performed_weight: Option<f64>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SetStateUpdate {
    pub exercise_name: String,
    pub set_number: u32,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub skipped: Option<bool>,
    #[serde(default)]
    pub reps: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
}

impl SetProgress {
    /// Merge an update. Completing a set clears its skip flag and vice versa.
    pub fn apply(&mut self, update: &SetStateUpdate) {
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
        if let Some(skipped) = update.skipped {
            self.skipped = skipped;
        }
        if update.completed == Some(true) {
            self.skipped = false;
        } else if update.skipped == Some(true) {
            self.completed = false;
        }
        if let Some(reps) = &update.reps {
            self.performed_reps = Some(reps.trim().to_string()).filter(|r| !r.is_empty());
        }
        if let Some(weight) = update.weight {
            self.performed_weight = Some(weight).filter(|w| w.is_finite() && *w >= 0.0);
        }
    }
}

pub type ProgressKey = (String, u32);

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChecklistSet {
    #[serde(flatten)]
    pub planned: SetEntry,
    #[serde(flatten)]
    pub progress: SetProgress,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChecklistExercise {
    pub name: String,
    pub sets: Vec<ChecklistSet>,
    /// Every set completed (and there is at least one)
    pub completed: bool,
    pub all_skipped: bool,
    pub working_weight: f64,
    pub max_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Checklist {
    pub d: NaiveDate,
    pub has_plan: bool,
    pub strategy: PlanParseStrategy,
    pub exercises: Vec<ChecklistExercise>,
}

/// Common weight when every weighted set agrees, otherwise the truncated
/// mean; `(working, max)`, both 0 without weighted sets.
pub fn weight_summary(sets: &[SetEntry]) -> (f64, f64) {
    let weights: Vec<f64> = sets.iter().filter_map(|set| set.weight_kg).collect();
    let Some(&first) = weights.first() else {
        return (0.0, 0.0);
    };
    let max = weights.iter().copied().fold(f64::MIN, f64::max);
    let working = if weights.iter().all(|weight| *weight == first) {
        first
    } else {
        (weights.iter().sum::<f64>() / weights.len() as f64).trunc()
    };
    (working, max)
}

fn overlay_exercise(
    exercise: ExerciseEntry,
    progress: &HashMap<ProgressKey, SetProgress>,
) -> ChecklistExercise {
    let (working_weight, max_weight) = weight_summary(&exercise.sets);
    let sets: Vec<ChecklistSet> = exercise
        .sets
        .into_iter()
        .map(|planned| {
            let progress = progress
                .get(&(exercise.name.clone(), planned.number))
                .cloned()
                .unwrap_or_default();
            ChecklistSet { planned, progress }
        })
        .collect();

    let has_sets = !sets.is_empty();
    ChecklistExercise {
        completed: has_sets && sets.iter().all(|set| set.progress.completed),
        all_skipped: has_sets && sets.iter().all(|set| set.progress.skipped),
        name: exercise.name,
        sets,
        working_weight,
        max_weight,
    }
}

/// Join a parsed plan with stored per-set progress.
pub fn build_checklist(
    d: NaiveDate,
    plan_text: &str,
    parsed: ParsedPlan,
    progress: &HashMap<ProgressKey, SetProgress>,
) -> Checklist {
    let exercises: Vec<ChecklistExercise> = parsed
        .exercises
        .into_iter()
        .map(|exercise| overlay_exercise(exercise, progress))
        .collect();

    Checklist {
        d,
        has_plan: !plan_text.trim().is_empty() && !exercises.is_empty(),
        strategy: parsed.strategy,
        exercises,
    }
}
