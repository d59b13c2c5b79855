//! Training profile and goals that personalise generated replies and plans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::normalize::head_chars;
use crate::plan::format_weight;

/// Rendered profile blocks are cut to this many characters.
pub const PROFILE_PROMPT_CHARS: usize = 600;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub height_cm: Option<i32>,
    pub weight_kg: Option<f64>,
    pub age: Option<i32>,
    pub sex: Option<String>,
    /// Free text, e.g. "набор массы"
    pub goal: Option<String>,
    pub experience: Option<String>,
    pub injuries: Option<String>,
    pub equipment: Option<String>,
    pub schedule: Option<String>,
    pub target_weight_kg: Option<f64>,
    pub workouts_per_week: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial update; absent fields keep their stored value and blank text clears one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ProfileUpdate {
    pub height_cm: Option<i32>,
    pub weight_kg: Option<f64>,
    pub age: Option<i32>,
    pub sex: Option<String>,
    pub goal: Option<String>,
    pub experience: Option<String>,
    pub injuries: Option<String>,
    pub equipment: Option<String>,
    pub schedule: Option<String>,
    pub target_weight_kg: Option<f64>,
    pub workouts_per_week: Option<i32>,
}

/// A field outside its plausible range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFieldError {
    pub field: &'static str,
    pub message: String,
}

fn check_range<T: PartialOrd + Copy + std::fmt::Display>(
    field: &'static str,
    value: Option<T>,
    min: T,
    max: T,
) -> Result<(), ProfileFieldError> {
    match value {
        Some(value) if !(min..=max).contains(&value) => Err(ProfileFieldError {
            field,
            message: format!("{field} must be between {min} and {max}"),
        }),
        _ => Ok(()),
    }
}

fn merge_text(slot: &mut Option<String>, update: &Option<String>) {
    if let Some(text) = update {
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        *slot = Some(text).filter(|t| !t.is_empty());
    }
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ProfileUpdate::default()
    }

    pub fn validate(&self) -> Result<(), ProfileFieldError> {
        check_range("height_cm", self.height_cm, 50, 260)?;
        check_range("weight_kg", self.weight_kg, 20.0, 400.0)?;
        check_range("age", self.age, 5, 120)?;
        check_range("target_weight_kg", self.target_weight_kg, 20.0, 400.0)?;
        check_range("workouts_per_week", self.workouts_per_week, 1, 14)
    }
}

impl UserProfile {
    pub fn apply(&mut self, update: &ProfileUpdate) {
        self.height_cm = update.height_cm.or(self.height_cm);
        self.weight_kg = update.weight_kg.or(self.weight_kg);
        self.age = update.age.or(self.age);
        self.target_weight_kg = update.target_weight_kg.or(self.target_weight_kg);
        self.workouts_per_week = update.workouts_per_week.or(self.workouts_per_week);
        merge_text(&mut self.sex, &update.sex);
        merge_text(&mut self.goal, &update.goal);
        merge_text(&mut self.experience, &update.experience);
        merge_text(&mut self.injuries, &update.injuries);
        merge_text(&mut self.equipment, &update.equipment);
        merge_text(&mut self.schedule, &update.schedule);
    }

    /// Compact one-fact-per-line summary for generation prompts, or `None`
    /// when nothing is known about the user.
    pub fn prompt_block(&self) -> Option<String> {
        let mut lines = Vec::new();
        if let Some(age) = self.age {
            lines.push(format!("Возраст: {age}"));
        }
        if let Some(sex) = &self.sex {
            lines.push(format!("Пол: {sex}"));
        }
        if let Some(height) = self.height_cm {
            lines.push(format!("Рост: {height} см"));
        }
        if let Some(weight) = self.weight_kg {
            lines.push(format!("Вес: {} кг", format_weight(weight)));
        }
        if let Some(goal) = &self.goal {
            lines.push(format!("Цель: {goal}"));
        }
        if let Some(target) = self.target_weight_kg {
            lines.push(format!("Целевой вес: {} кг", format_weight(target)));
        }
        if let Some(per_week) = self.workouts_per_week {
            lines.push(format!("Тренировок в неделю: {per_week}"));
        }
        if let Some(experience) = &self.experience {
            lines.push(format!("Опыт: {experience}"));
        }
        if let Some(injuries) = &self.injuries {
            lines.push(format!("Травмы/ограничения: {injuries}"));
        }
        if let Some(equipment) = &self.equipment {
            lines.push(format!("Оборудование: {equipment}"));
        }
        if let Some(schedule) = &self.schedule {
            lines.push(format!("График: {schedule}"));
        }

        if lines.is_empty() {
            return None;
        }
        Some(head_chars(&lines.join("\n"), PROFILE_PROMPT_CHARS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_profile_renders_nothing() {
        assert_eq!(UserProfile::default().prompt_block(), None);
    }

    #[test]
    fn prompt_block_lists_known_facts_in_order() {
        let profile = UserProfile {
            age: Some(31),
            weight_kg: Some(82.5),
            goal: Some("набор массы".into()),
            injuries: Some("колено".into()),
            ..UserProfile::default()
        };
        assert_eq!(
            profile.prompt_block().as_deref(),
            Some("Возраст: 31\nВес: 82.5 кг\nЦель: набор массы\nТравмы/ограничения: колено")
        );
    }

    #[test]
    fn apply_keeps_absent_fields_and_clears_blank_text() {
        let mut profile = UserProfile {
            age: Some(30),
            goal: Some("похудение".into()),
            equipment: Some("гантели".into()),
            ..UserProfile::default()
        };
        profile.apply(&ProfileUpdate {
            weight_kg: Some(90.0),
            goal: Some("  набор   массы ".into()),
            equipment: Some("  ".into()),
            ..ProfileUpdate::default()
        });

        assert_eq!(profile.age, Some(30));
        assert_eq!(profile.weight_kg, Some(90.0));
        assert_eq!(profile.goal.as_deref(), Some("набор массы"));
        assert_eq!(profile.equipment, None);
    }

    #[test]
    fn validate_rejects_implausible_values() {
        let update = ProfileUpdate {
            age: Some(300),
            ..ProfileUpdate::default()
        };
        assert_eq!(update.validate().unwrap_err().field, "age");

        let ok = ProfileUpdate {
            height_cm: Some(180),
            workouts_per_week: Some(3),
            ..ProfileUpdate::default()
        };
        assert!(ok.validate().is_ok());
        assert!(ProfileUpdate::default().is_empty());
        assert!(!ok.is_empty());
    }
}
