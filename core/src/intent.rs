//! Rule-based intent classification for free-text tracker messages.
//!
//! Scores a message across three categories (workout, nutrition, plan
//! request) from keyword hits, numeric set/rep/weight patterns and explicit
//! plan-creation phrasing. The classifier is total: every string, including
//! the empty one, yields a result.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::mode::ModeHint;
use crate::normalize::normalize_text;

/// Confidence at which the classifier's own suggestion is returned by [`mode_hint`].
pub const MODE_HINT_MIN_CONFIDENCE: f64 = 0.3;

const PATTERN_BOOST: u32 = 3;
const EXPLICIT_PLAN_PHRASE_BOOST: u32 = 5;
const PLAN_CREATION_BOOST: u32 = 5;
const VERB_STEM_BOOST: u32 = 2;
const MODE_STEM_BOOST: u32 = 3;

const WORKOUT_KEYWORDS: &[&str] = &[
    // exercises and equipment
    "жим", "присед", "тяга", "подтягивание", "отжимание", "планка", "бурпи", "гантел", "штанга",
    "гиря", "тренажер", "кроссовер", "блок", "скамья",
    // training vocabulary
    "подход", "повтор", "повторение", "раз", "кг", "килограмм", "вес", "сделал", "выполнил",
    "закончил", "завершил", "тренировка", "тренировался", "занятие", "зал", "спортзал", "фитнес",
    "качалка", "разминка", "заминка", "кардио", "силовая", "растяжка",
    // muscle groups
    "бицепс", "трицепс", "грудь", "спина", "ноги", "плечи", "пресс", "квадрицепс", "икры",
    "ягодицы", "дельты", "трапеция",
    // english
    "bench", "squat", "deadlift", "pull-up", "pullup", "push-up", "pushup", "dumbbell", "barbell",
    "kettlebell", "workout", "training", "exercise", "reps", "sets", "kg", "gym", "biceps",
    "triceps",
];

const NUTRITION_KEYWORDS: &[&str] = &[
    // meals
    "завтрак", "обед", "ужин", "перекус", "полдник", "ланч",
    // eating verbs
    "ел", "съел", "поел", "попил", "выпил", "съела", "поела", "питание", "еда", "кушал",
    "покушала",
    // nutrients and portions
    "калори", "белок", "углевод", "жир", "протеин", "ккал", "грамм", "гр", "мл", "литр",
    "порция", "тарелка", "чашка",
    // staple foods
    "курица", "рыба", "мясо", "овощ", "фрукт", "каша", "рис", "гречка", "овсянка", "творог",
    "йогурт", "молоко", "яйцо", "хлеб",
    // english
    "breakfast", "lunch", "dinner", "snack", "calorie", "protein", "carbs", "meal", "nutrition",
    "food", "chicken", "oatmeal", "i ate",
];

const PLAN_KEYWORDS: &[&str] = &[
    "план", "планируй", "составь", "распиши", "расписание", "программа", "на сегодня",
    "на завтра", "на неделю", "на месяц", "тренировочный план", "план тренировок",
    "план питания", "меню", "рацион", "диета", "создай", "придумай", "подбери", "рекомендуй",
    "предложи",
    // english
    "plan", "schedule", "program", "for today", "for tomorrow", "for the week", "create",
    "compose", "make me", "suggest", "diet", "menu",
];

const EXPLICIT_PLAN_PHRASES: &[&str] = &[
    "составь план",
    "создай план",
    "распиши план",
    "create a plan",
    "make a plan",
    "compose a plan",
    "write a plan",
];

const WORKOUT_VERB_STEMS: &[&str] = &[
    "тренировк", "упражнен", "подход", "повтор", "workout", "exercise",
];
const WORKOUT_MODE_STEMS: &[&str] = &["тренировк", "упражнен", "workout", "exercise"];

const EATING_VERB_STEMS: &[&str] = &[
    "ел", "съел", "поел", "питание", "завтрак", "обед", "ужин", "breakfast", "lunch", "dinner",
    "i ate",
];
const EATING_MODE_STEMS: &[&str] = &["питани", "еда", "nutrition", "food"];

const PLAN_WORDS: &[&str] = &["план", "plan"];
const PLAN_CREATION_VERBS: &[&str] = &["составь", "создай", "create", "compose"];

static PARTIAL_WORKOUT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\d+\s*(?:кг|kg|килограмм)",
        r"\d+\s*(?:раз|повтор|reps?\b)",
        r"\d+\s*[хx×]\s*\d+",
        r"\d+\s*(?:подход|sets?\b)",
        r"(?:подход|\bset)\s*\d+",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("valid partial workout regex"))
    .collect()
});

static PLAN_REQUEST_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"составь.*план",
        r"создай.*план",
        r"распиши.*план",
        r"план.*на\s+(?:сегодня|завтра|неделю)",
        r"тренировк[ау].*на\s+(?:сегодня|завтра)",
        r"питани[ея].*на\s+(?:сегодня|завтра)",
        r"(?:create|make|compose|write).*plan",
        r"plan.*for\s+(?:today|tomorrow|the week|next week)",
        r"workout.*for\s+(?:today|tomorrow)",
        r"(?:meals?|nutrition).*for\s+(?:today|tomorrow)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("valid plan request regex"))
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Workout,
    Nutrition,
    Plan,
    Unknown,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Workout => "workout",
            Intent::Nutrition => "nutrition",
            Intent::Plan => "plan",
            Intent::Unknown => "unknown",
        }
    }

    /// The persistence mode this intent asks for, if any.
    pub fn mode_hint(self) -> Option<ModeHint> {
        match self {
            Intent::Workout => Some(ModeHint::Sets),
            Intent::Nutrition => Some(ModeHint::Meals),
            Intent::Plan => Some(ModeHint::Plan),
            Intent::Unknown => None,
        }
    }
}

/// Raw per-category scores, kept for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct IntentScores {
    pub workout: u32,
    pub nutrition: u32,
    pub plan: u32,
}

impl IntentScores {
    pub fn total(&self) -> u32 {
        self.workout + self.nutrition + self.plan
    }
}

/// Transient classification of one message. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct IntentClassification {
    pub intent: Intent,
    /// Winner score over total score, in [0, 1]
    pub confidence: f64,
    pub scores: IntentScores,
}

impl IntentClassification {
    fn unknown(scores: IntentScores) -> Self {
        Self {
            intent: Intent::Unknown,
            confidence: 0.0,
            scores,
        }
    }
}

fn count_keywords(normalized: &str, keywords: &[&str]) -> u32 {
    keywords
        .iter()
        .filter(|keyword| normalized.contains(*keyword))
        .count() as u32
}

fn contains_any(normalized: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| normalized.contains(needle))
}

fn matches_any(normalized: &str, patterns: &[Regex]) -> bool {
    patterns.iter().any(|pattern| pattern.is_match(normalized))
}

fn score(normalized: &str) -> IntentScores {
    let mut scores = IntentScores {
        workout: count_keywords(normalized, WORKOUT_KEYWORDS),
        nutrition: count_keywords(normalized, NUTRITION_KEYWORDS),
        plan: count_keywords(normalized, PLAN_KEYWORDS),
    };

    if matches_any(normalized, &PARTIAL_WORKOUT_PATTERNS) {
        scores.workout += PATTERN_BOOST;
    }
    if matches_any(normalized, &PLAN_REQUEST_PATTERNS) {
        scores.plan += PATTERN_BOOST;
    }

    if contains_any(normalized, EXPLICIT_PLAN_PHRASES) {
        scores.plan += EXPLICIT_PLAN_PHRASE_BOOST;
    }
    if contains_any(normalized, WORKOUT_VERB_STEMS) {
        scores.workout += VERB_STEM_BOOST;
    }
    if contains_any(normalized, EATING_VERB_STEMS) {
        scores.nutrition += VERB_STEM_BOOST;
    }

    if contains_any(normalized, WORKOUT_MODE_STEMS) {
        scores.workout += MODE_STEM_BOOST;
    }
    if contains_any(normalized, EATING_MODE_STEMS) {
        scores.nutrition += MODE_STEM_BOOST;
    }
    // Stacks with the phrase and pattern boosts above on purpose.
    if contains_any(normalized, PLAN_WORDS) && contains_any(normalized, PLAN_CREATION_VERBS) {
        scores.plan += PLAN_CREATION_BOOST;
    }

    scores
}

/// Classify a message into workout / nutrition / plan / unknown.
///
/// Ties on the maximum score resolve in the order workout, nutrition, plan.
/// `_current_mode` is accepted for call-site symmetry with [`mode_hint`];
/// the score itself never depends on prior context.
pub fn classify_intent(text: &str, _current_mode: Option<ModeHint>) -> IntentClassification {
    let normalized = normalize_text(text);
    if normalized.is_empty() {
        return IntentClassification::unknown(IntentScores::default());
    }

    let scores = score(&normalized);
    let total = scores.total();
    if total == 0 {
        return IntentClassification::unknown(scores);
    }

    let max = scores.workout.max(scores.nutrition).max(scores.plan);
    let ranked = [
        (Intent::Workout, scores.workout),
        (Intent::Nutrition, scores.nutrition),
        (Intent::Plan, scores.plan),
    ];
    let Some((intent, winner)) = ranked
        .into_iter()
        .find(|(_, value)| *value == max && *value > 0)
    else {
        return IntentClassification::unknown(scores);
    };

    IntentClassification {
        intent,
        confidence: (f64::from(winner) / f64::from(total)).min(1.0),
        scores,
    }
}

/// Mode hint for this message: the classifier's suggestion when it is at
/// least [`MODE_HINT_MIN_CONFIDENCE`] sure, otherwise the caller's current mode.
pub fn mode_hint(text: &str, current_mode: Option<ModeHint>) -> Option<ModeHint> {
    let classification = classify_intent(text, current_mode);
    if classification.confidence >= MODE_HINT_MIN_CONFIDENCE {
        if let Some(hint) = classification.intent.mode_hint() {
            return Some(hint);
        }
    }
    current_mode
}

/// True when the text carries numeric set/rep/weight notation, whatever the
/// overall classification says.
pub fn is_partial_workout_record(text: &str) -> bool {
    matches_any(&normalize_text(text), &PARTIAL_WORKOUT_PATTERNS)
}

/// True when the text explicitly asks for a plan to be created.
pub fn is_plan_request(text: &str) -> bool {
    let normalized = normalize_text(text);
    if normalized.is_empty() {
        return false;
    }
    matches_any(&normalized, &PLAN_REQUEST_PATTERNS)
        || contains_any(&normalized, EXPLICIT_PLAN_PHRASES)
        || (contains_any(&normalized, PLAN_WORDS)
            && contains_any(&normalized, PLAN_CREATION_VERBS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_message_is_unknown_with_zero_confidence() {
        let result = classify_intent("", None);
        assert_eq!(result.intent, Intent::Unknown);
        assert_eq!(result.confidence, 0.0);

        let blank = classify_intent("   \n ", Some(ModeHint::Meals));
        assert_eq!(blank.intent, Intent::Unknown);
        assert_eq!(blank.confidence, 0.0);
    }

    #[test]
    fn non_domain_text_is_unknown() {
        let result = classify_intent("hello there", None);
        assert_eq!(result.intent, Intent::Unknown);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn weight_and_reps_notation_is_a_confident_workout() {
        for message in [
            "жим 80кг 4х8",
            "bench 80kg 4x8",
            "жим лежа 4х8 80кг",
            "присед 100 кг 5x5",
        ] {
            let result = classify_intent(message, None);
            assert_eq!(result.intent, Intent::Workout, "message: {message}");
            assert!(result.confidence > 0.5, "message: {message}");
        }
    }

    #[test]
    fn bench_press_scenario_reaches_high_confidence() {
        let result = classify_intent("жим лежа 4х8 80кг", None);
        assert_eq!(result.intent, Intent::Workout);
        assert!(result.confidence >= 0.6);
    }

    #[test]
    fn explicit_plan_creation_is_a_plan() {
        for message in ["составь план на завтра", "create a plan for tomorrow"] {
            let result = classify_intent(message, None);
            assert_eq!(result.intent, Intent::Plan, "message: {message}");
        }
    }

    #[test]
    fn plan_boosts_stack_for_the_same_phrase() {
        let result = classify_intent("составь план на завтра", None);
        // keywords (план, составь, на завтра) + pattern + phrase + co-occurrence
        assert_eq!(result.scores.plan, 3 + 3 + 5 + 5);
    }

    #[test]
    fn meal_description_is_nutrition() {
        let result = classify_intent("На завтрак съел овсянку и творог", None);
        assert_eq!(result.intent, Intent::Nutrition);
        assert!(result.confidence > 0.5);
    }

    #[test]
    fn ties_prefer_workout_then_nutrition() {
        // "вес" is a workout keyword, "рыба" a nutrition keyword: 1 vs 1.
        let result = classify_intent("вес рыба", None);
        assert_eq!(result.scores.workout, result.scores.nutrition);
        assert_eq!(result.intent, Intent::Workout);
        assert_eq!(result.confidence, 0.5);

        // "рыба" vs "меню": nutrition beats a tied plan.
        let result = classify_intent("рыба меню", None);
        assert_eq!(result.scores.nutrition, result.scores.plan);
        assert_eq!(result.intent, Intent::Nutrition);
    }

    #[test]
    fn classification_is_deterministic() {
        let first = classify_intent("обед: курица с рисом 300 гр", None);
        for _ in 0..10 {
            assert_eq!(classify_intent("обед: курица с рисом 300 гр", None), first);
        }
    }

    #[test]
    fn confidence_never_exceeds_one() {
        let result = classify_intent("составь план тренировок на завтра", None);
        assert!(result.confidence <= 1.0);
        assert!(result.confidence > 0.0);
    }

    #[test]
    fn mode_hint_follows_confident_classification() {
        assert_eq!(mode_hint("жим 80кг 4х8", Some(ModeHint::Meals)), Some(ModeHint::Sets));
        assert_eq!(mode_hint("съел на обед гречку", None), Some(ModeHint::Meals));
        assert_eq!(mode_hint("составь план на завтра", None), Some(ModeHint::Plan));
    }

    #[test]
    fn mode_hint_keeps_current_mode_for_noise() {
        assert_eq!(mode_hint("ок спасибо", Some(ModeHint::Meals)), Some(ModeHint::Meals));
        assert_eq!(mode_hint("ок спасибо", None), None);
    }

    #[test]
    fn partial_workout_records_are_detected_independently() {
        assert!(is_partial_workout_record("3х10 60кг"));
        assert!(is_partial_workout_record("12 повторений"));
        assert!(is_partial_workout_record("3 подхода"));
        assert!(is_partial_workout_record("подход 2"));
        assert!(is_partial_workout_record("4 sets of 8"));
        assert!(!is_partial_workout_record("съел яблоко"));
    }

    #[test]
    fn plan_request_requires_explicit_phrasing() {
        assert!(is_plan_request("Составь план на завтра"));
        assert!(is_plan_request("create a plan for tomorrow"));
        assert!(is_plan_request("план на неделю"));
        assert!(!is_plan_request("сделал жим 4х8"));
        assert!(!is_plan_request("какой план?"));
        assert!(!is_plan_request(""));
    }
}
