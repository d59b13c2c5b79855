//! Reconciles a conversation's sticky mode with the classification of the
//! current message to decide which note a message writes, and how.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::intent::{self, IntentClassification};
use crate::notes::{NoteKind, WriteMode};

/// Confidence at which a message's own intent overrides the sticky mode.
pub const OVERRIDE_MIN_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ModeHint {
    Sets,
    Meals,
    Plan,
}

impl ModeHint {
    pub fn as_str(self) -> &'static str {
        match self {
            ModeHint::Sets => "sets",
            ModeHint::Meals => "meals",
            ModeHint::Plan => "plan",
        }
    }

    pub fn kind(self) -> NoteKind {
        match self {
            ModeHint::Sets => NoteKind::Workouts,
            ModeHint::Meals => NoteKind::Meals,
            ModeHint::Plan => NoteKind::Plan,
        }
    }

    pub fn from_kind(kind: NoteKind) -> Self {
        match kind {
            NoteKind::Workouts => ModeHint::Sets,
            NoteKind::Meals => ModeHint::Meals,
            NoteKind::Plan => ModeHint::Plan,
        }
    }
}

impl fmt::Display for ModeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModeHint {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "sets" | "workouts" => Ok(ModeHint::Sets),
            "meals" => Ok(ModeHint::Meals),
            "plan" => Ok(ModeHint::Plan),
            other => Err(format!(
                "unknown mode '{other}', expected one of: sets, meals, plan"
            )),
        }
    }
}

/// Sticky per-conversation state, owned by whoever drives the turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub mode: Option<ModeHint>,
}

impl SessionContext {
    pub fn new(mode: Option<ModeHint>) -> Self {
        Self { mode }
    }

    /// An explicit mode choice by the user.
    pub fn select(&mut self, mode: ModeHint) {
        self.mode = Some(mode);
    }

    /// Carry a confidently classified mode into the next turn. Inherited
    /// modes and the partial-record fallback leave the session unchanged.
    pub fn observe(&mut self, resolution: &ModeResolution) {
        if resolution.is_confident() {
            self.mode = resolution.hint;
        }
    }
}

/// Outcome of mode resolution for one message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeResolution {
    /// Mode in effect for this message, possibly inherited from the session.
    pub hint: Option<ModeHint>,
    /// Note this message writes to. `None` when nothing was resolved or a
    /// plan write was suppressed.
    pub kind: Option<NoteKind>,
    pub write_mode: Option<WriteMode>,
    /// `None` when classification was bypassed by a forced hint.
    pub classification: Option<IntentClassification>,
    pub plan_request: bool,
    /// The message's intent replaced a different sticky mode.
    pub overridden: bool,
}

impl ModeResolution {
    /// The message's own classification decided the mode.
    pub fn is_confident(&self) -> bool {
        self.classification.is_some_and(|classification| {
            classification.confidence >= OVERRIDE_MIN_CONFIDENCE
                && classification.intent.mode_hint().is_some()
        })
    }
}

/// Resolve the authoritative note kind for `text`.
///
/// With `force_hint` and a sticky mode present, classification is skipped
/// entirely and the sticky mode is authoritative.
pub fn resolve_mode(text: &str, sticky: Option<ModeHint>, force_hint: bool) -> ModeResolution {
    let forced = force_hint && sticky.is_some();

    let (hint, classification, overridden) = if forced {
        (sticky, None, false)
    } else {
        let classification = intent::classify_intent(text, sticky);
        let suggested = classification.intent.mode_hint();
        match suggested {
            Some(suggested) if classification.confidence >= OVERRIDE_MIN_CONFIDENCE => {
                let overridden = sticky.is_some_and(|current| current != suggested);
                (Some(suggested), Some(classification), overridden)
            }
            _ => {
                let fallback = sticky.or_else(|| {
                    intent::is_partial_workout_record(text).then_some(ModeHint::Sets)
                });
                (fallback, Some(classification), false)
            }
        }
    };

    let plan_request =
        intent::is_plan_request(text) || (forced && hint == Some(ModeHint::Plan));

    let kind = match hint.map(ModeHint::kind) {
        Some(NoteKind::Plan) if !plan_request => None,
        other => other,
    };

    ModeResolution {
        hint,
        kind,
        write_mode: kind.map(NoteKind::default_write_mode),
        classification,
        plan_request,
        overridden,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{Intent, IntentScores};

    #[test]
    fn confident_intent_overrides_stale_sticky_hint() {
        let resolution = resolve_mode("жим лежа 4х8 80кг", Some(ModeHint::Meals), false);
        assert_eq!(resolution.kind, Some(NoteKind::Workouts));
        assert_eq!(resolution.write_mode, Some(WriteMode::Append));
        assert!(resolution.overridden);
    }

    #[test]
    fn low_confidence_message_keeps_sticky_hint() {
        let resolution = resolve_mode("ещё банан", Some(ModeHint::Meals), false);
        assert_eq!(resolution.hint, Some(ModeHint::Meals));
        assert_eq!(resolution.kind, Some(NoteKind::Meals));
        assert!(!resolution.overridden);
    }

    #[test]
    fn no_signal_and_no_sticky_hint_resolves_nothing() {
        let resolution = resolve_mode("привет", None, false);
        assert_eq!(resolution.hint, None);
        assert_eq!(resolution.kind, None);
        assert_eq!(resolution.write_mode, None);
    }

    #[test]
    fn plan_requests_replace() {
        let resolution = resolve_mode("составь план на завтра", None, false);
        assert_eq!(resolution.kind, Some(NoteKind::Plan));
        assert_eq!(resolution.write_mode, Some(WriteMode::Replace));
        assert!(resolution.plan_request);
    }

    #[test]
    fn sticky_plan_hint_without_plan_request_suppresses_write() {
        let resolution = resolve_mode("спасибо, понял", Some(ModeHint::Plan), false);
        assert_eq!(resolution.hint, Some(ModeHint::Plan));
        assert_eq!(resolution.kind, None);
        assert!(!resolution.plan_request);
    }

    #[test]
    fn forced_hint_bypasses_classification() {
        let resolution = resolve_mode("жим 4х8 80кг", Some(ModeHint::Plan), true);
        assert!(resolution.classification.is_none());
        assert_eq!(resolution.kind, Some(NoteKind::Plan));
        assert!(resolution.plan_request);
    }

    #[test]
    fn force_without_hint_falls_back_to_classification() {
        let resolution = resolve_mode("жим 4х8 80кг", None, true);
        let classification = resolution.classification.unwrap();
        assert_eq!(classification.intent, Intent::Workout);
        assert_eq!(resolution.kind, Some(NoteKind::Workouts));
    }

    #[test]
    fn session_context_remembers_resolved_mode() {
        let mut session = SessionContext::default();
        session.observe(&resolve_mode("съел овсянку на завтрак", None, false));
        assert_eq!(session.mode, Some(ModeHint::Meals));

        session.observe(&resolve_mode("присед 5х5 100кг", session.mode, false));
        assert_eq!(session.mode, Some(ModeHint::Sets));

        session.observe(&resolve_mode("привет", session.mode, false));
        assert_eq!(session.mode, Some(ModeHint::Sets));
    }

    #[test]
    fn session_ignores_fallback_and_inherited_modes() {
        let fallback = ModeResolution {
            hint: Some(ModeHint::Sets),
            kind: Some(NoteKind::Workouts),
            write_mode: Some(WriteMode::Append),
            classification: Some(IntentClassification {
                intent: Intent::Workout,
                confidence: 0.4,
                scores: IntentScores::default(),
            }),
            plan_request: false,
            overridden: false,
        };
        assert!(!fallback.is_confident());

        let mut session = SessionContext::default();
        session.observe(&fallback);
        assert_eq!(session.mode, None);

        session.select(ModeHint::Meals);
        session.observe(&resolve_mode("ещё банан", session.mode, false));
        assert_eq!(session.mode, Some(ModeHint::Meals));

        session.observe(&resolve_mode("жим", Some(ModeHint::Plan), true));
        assert_eq!(session.mode, Some(ModeHint::Meals));
    }

    #[test]
    fn mode_hint_parses_kind_aliases() {
        assert_eq!("sets".parse::<ModeHint>().unwrap(), ModeHint::Sets);
        assert_eq!("workouts".parse::<ModeHint>().unwrap(), ModeHint::Sets);
        assert_eq!("plan".parse::<ModeHint>().unwrap().kind(), NoteKind::Plan);
        assert!("chat".parse::<ModeHint>().is_err());
    }
}
