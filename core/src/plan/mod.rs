//! Recovers exercises and sets from free-form plan text.
//!
//! Two strategies produce the same [`ExerciseEntry`] shape: a deterministic
//! line matcher chain ([`matchers`]) that is always available, and an
//! AI-assisted extraction ([`assisted`]) that falls back to it on any failure.

pub mod assisted;
pub mod matchers;

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::generation::Generator;

/// Name given to sets that appear before any exercise name.
pub const DEFAULT_EXERCISE_NAME: &str = "Упражнение";

/// Plan texts shorter than this skip AI extraction entirely.
pub const ASSISTED_MIN_PLAN_CHARS: usize = 50;

const TRUNCATED_FAILURE: &str = "до о";
const FAILURE: &str = "до отказа";

static REST_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(мин|min|m\b|м\b)?").expect("valid rest value regex")
});
static DASH_SPACING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*-\s*").expect("valid dash spacing regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SetEntry {
    /// 1-based, contiguous within an exercise
    pub number: u32,
    /// Count, range ("8-10") or qualitative value ("до отказа")
    pub reps: String,
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_sec: Option<u32>,
}

impl SetEntry {
    pub fn new(number: u32, reps: impl Into<String>, weight_kg: Option<f64>) -> Self {
        Self {
            number,
            reps: reps.into(),
            weight_kg,
            rpe: None,
            rest_sec: None,
        }
    }

    /// Stand-in for an exercise named without any parseable set detail.
    pub fn placeholder() -> Self {
        Self::new(1, "", None)
    }

    pub fn weight_label(&self) -> Option<String> {
        self.weight_kg.map(format_weight)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExerciseEntry {
    pub name: String,
    pub sets: Vec<SetEntry>,
}

impl ExerciseEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sets: Vec::new(),
        }
    }

    /// Renumber sets 1..=n in the order they were added and make sure at
    /// least one set exists.
    pub fn finalize(mut self) -> Self {
        if self.sets.is_empty() {
            self.sets.push(SetEntry::placeholder());
        }
        for (index, set) in self.sets.iter_mut().enumerate() {
            set.number = index as u32 + 1;
        }
        self
    }

    /// Like [`finalize`](Self::finalize), but orders sets by their stated
    /// number first. Only for sets that all carry a number of their own.
    pub fn finalize_by_number(mut self) -> Self {
        self.sets.sort_by_key(|set| set.number);
        self.finalize()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlanParseStrategy {
    #[default]
    Deterministic,
    Assisted,
}

impl PlanParseStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanParseStrategy::Deterministic => "deterministic",
            PlanParseStrategy::Assisted => "assisted",
        }
    }
}

impl fmt::Display for PlanParseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanParseStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "deterministic" | "regex" | "fallback" => Ok(PlanParseStrategy::Deterministic),
            "assisted" | "ai" => Ok(PlanParseStrategy::Assisted),
            other => Err(format!(
                "unknown parse strategy '{other}', expected deterministic or assisted"
            )),
        }
    }
}

/// Parser output plus the strategy that actually produced it.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ParsedPlan {
    pub exercises: Vec<ExerciseEntry>,
    pub strategy: PlanParseStrategy,
}

/// Deterministic parse. Never fails; empty input yields no exercises.
pub fn parse_plan_text(text: &str) -> Vec<ExerciseEntry> {
    matchers::parse_lines(text)
}

/// Parse with the requested strategy.
///
/// The assisted strategy needs a generator and a plan of at least
/// [`ASSISTED_MIN_PLAN_CHARS`] characters; otherwise, and on any extraction
/// failure, the deterministic parser runs instead.
pub async fn parse_plan(
    text: &str,
    strategy: PlanParseStrategy,
    generator: Option<&dyn Generator>,
    timeout: Duration,
) -> ParsedPlan {
    let deterministic = || ParsedPlan {
        exercises: parse_plan_text(text),
        strategy: PlanParseStrategy::Deterministic,
    };

    let Some(generator) = generator else {
        return deterministic();
    };
    if strategy != PlanParseStrategy::Assisted
        || text.trim().chars().count() < ASSISTED_MIN_PLAN_CHARS
    {
        return deterministic();
    }

    match assisted::extract_exercises(generator, text, timeout).await {
        Ok(exercises) => ParsedPlan {
            exercises,
            strategy: PlanParseStrategy::Assisted,
        },
        Err(error) => {
            tracing::warn!(error = %error, "assisted plan parse failed, using line parser");
            deterministic()
        }
    }
}

/// Whole numbers print without a fractional part: `80.0 -> "80"`, `82.5 -> "82.5"`.
pub fn format_weight(kg: f64) -> String {
    if kg.fract() == 0.0 {
        format!("{}", kg as i64)
    } else {
        let formatted = format!("{kg:.2}");
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// Parse a numeric weight token, accepting a decimal comma.
/// Malformed, negative or non-finite values yield `None`.
pub fn parse_weight_value(raw: &str) -> Option<f64> {
    let value = raw.trim().replace(',', ".").parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Rest time in seconds from free text: `"90 sec" -> 90`, `"2 min" -> 120`,
/// `"1,5 мин" -> 90`. The first number wins for ranges.
pub fn parse_rest_seconds(raw: &str) -> Option<u32> {
    let captures = REST_VALUE_RE.captures(raw)?;
    let value = parse_weight_value(captures.get(1)?.as_str())?;
    let seconds = match captures.get(2) {
        Some(_) => value * 60.0,
        None => value,
    };
    Some(seconds.round() as u32)
}

/// Canonical rep text: dash variants unified, spacing around dashes
/// removed, and the truncated "до о" restored to "до отказа".
pub fn normalize_reps(raw: &str) -> String {
    let unified = raw.replace(['–', '—'], "-");
    let collapsed = unified.split_whitespace().collect::<Vec<_>>().join(" ");
    let tightened = DASH_SPACING_RE.replace_all(&collapsed, "-").to_string();
    repair_truncated_reps(tightened.trim())
}

fn repair_truncated_reps(reps: &str) -> String {
    if reps == TRUNCATED_FAILURE {
        return FAILURE.to_string();
    }
    match reps.strip_suffix(TRUNCATED_FAILURE) {
        Some(prefix) if prefix.ends_with(' ') => format!("{prefix}{FAILURE}"),
        _ => reps.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::generation::CompletionRequest;
    use async_trait::async_trait;

    struct FixedGenerator(Result<String, ()>);

    #[async_trait]
    impl Generator for FixedGenerator {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, GenerationError> {
            self.0
                .clone()
                .map_err(|_| GenerationError::Transport("connection refused".into()))
        }
    }

    const PLAN: &str = "1. Жим лёжа: 4х8-10 80кг\n2. Приседания: 3 подхода по 5 повторений, 100 кг";

    #[test]
    fn weight_formatting_drops_whole_fraction() {
        assert_eq!(format_weight(80.0), "80");
        assert_eq!(format_weight(82.5), "82.5");
        assert_eq!(format_weight(17.25), "17.25");
    }

    #[test]
    fn weight_values_accept_decimal_comma() {
        assert_eq!(parse_weight_value("82,5"), Some(82.5));
        assert_eq!(parse_weight_value("80"), Some(80.0));
        assert_eq!(parse_weight_value("8о"), None);
        assert_eq!(parse_weight_value(""), None);
    }

    #[test]
    fn rest_times_convert_to_seconds() {
        assert_eq!(parse_rest_seconds("90 sec"), Some(90));
        assert_eq!(parse_rest_seconds("90 сек"), Some(90));
        assert_eq!(parse_rest_seconds("2 min"), Some(120));
        assert_eq!(parse_rest_seconds("2 мин"), Some(120));
        assert_eq!(parse_rest_seconds("1,5 мин"), Some(90));
        assert_eq!(parse_rest_seconds("60-90 секунд"), Some(60));
        assert_eq!(parse_rest_seconds("отдых"), None);
    }

    #[test]
    fn truncated_failure_reps_are_repaired() {
        assert_eq!(normalize_reps("до о"), "до отказа");
        assert_eq!(normalize_reps("12 до о"), "12 до отказа");
        assert_eq!(normalize_reps("8 – 12"), "8-12");
        assert_eq!(normalize_reps("до отказа"), "до отказа");
    }

    #[test]
    fn finalize_adds_placeholder_and_renumbers() {
        let empty = ExerciseEntry::new("Планка").finalize();
        assert_eq!(empty.sets, vec![SetEntry::placeholder()]);

        let mut repeated = ExerciseEntry::new("Жим");
        repeated.sets.push(SetEntry::new(1, "8", Some(80.0)));
        repeated.sets.push(SetEntry::new(1, "10", Some(60.0)));
        let repeated = repeated.finalize();
        let numbers: Vec<u32> = repeated.sets.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(repeated.sets[0].weight_kg, Some(80.0));
    }

    #[test]
    fn finalize_by_number_sorts_stated_numbers() {
        let mut gapped = ExerciseEntry::new("Жим");
        gapped.sets.push(SetEntry::new(3, "8", Some(80.0)));
        gapped.sets.push(SetEntry::new(1, "10", Some(60.0)));
        let gapped = gapped.finalize_by_number();
        let numbers: Vec<u32> = gapped.sets.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(gapped.sets[0].weight_kg, Some(60.0));
    }

    #[test]
    fn strategy_parses_aliases() {
        assert_eq!("ai".parse::<PlanParseStrategy>().unwrap(), PlanParseStrategy::Assisted);
        assert_eq!(
            "regex".parse::<PlanParseStrategy>().unwrap(),
            PlanParseStrategy::Deterministic
        );
        assert!("magic".parse::<PlanParseStrategy>().is_err());
    }

    #[tokio::test]
    async fn assisted_strategy_falls_back_when_generator_fails() {
        let generator = FixedGenerator(Err(()));
        let parsed = parse_plan(
            PLAN,
            PlanParseStrategy::Assisted,
            Some(&generator),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(parsed.strategy, PlanParseStrategy::Deterministic);
        assert_eq!(parsed.exercises.len(), 2);
    }

    #[tokio::test]
    async fn assisted_strategy_uses_generator_output() {
        let generator = FixedGenerator(Ok(r#"{"exercises":[{"name":"Жим лёжа","sets":[{"number":1,"reps":"8-10","weight_kg":80}]}]}"#.to_string()));
        let parsed = parse_plan(
            PLAN,
            PlanParseStrategy::Assisted,
            Some(&generator),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(parsed.strategy, PlanParseStrategy::Assisted);
        assert_eq!(parsed.exercises.len(), 1);
    }

    #[tokio::test]
    async fn short_plans_skip_the_generator() {
        let generator = FixedGenerator(Ok("{\"exercises\":[]}".to_string()));
        let parsed = parse_plan(
            "Жим: 4х8 80кг",
            PlanParseStrategy::Assisted,
            Some(&generator),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(parsed.strategy, PlanParseStrategy::Deterministic);
        assert_eq!(parsed.exercises[0].sets.len(), 4);
    }

    #[tokio::test]
    async fn deterministic_strategy_ignores_generator() {
        let generator = FixedGenerator(Err(()));
        let parsed = parse_plan(
            PLAN,
            PlanParseStrategy::Deterministic,
            Some(&generator),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(parsed.strategy, PlanParseStrategy::Deterministic);
    }
}
