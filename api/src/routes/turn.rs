use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use trener_core::error::ApiError;
use trener_core::intent::Intent;
use trener_core::mode::ModeHint;
use trener_core::notes::NoteWrite;
use trener_core::orchestrator::{Orchestrator, TurnOutcome, TurnRequest};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;
use crate::store;
use crate::user::UserId;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/turn", post(run_turn))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TurnBody {
    pub text: String,
    /// Overrides the mode remembered for this user
    #[serde(default)]
    pub mode_hint: Option<ModeHint>,
    /// Skip classification and trust the mode hint
    #[serde(default)]
    pub force_hint: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TurnResponse {
    pub reply: String,
    pub writes: Vec<NoteWrite>,
    pub mode_hint: Option<ModeHint>,
    /// Absent when classification was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    pub confidence: f64,
    /// Generation failed; the reply is a fallback and nothing generated was stored
    pub degraded: bool,
}

impl From<TurnOutcome> for TurnResponse {
    fn from(outcome: TurnOutcome) -> Self {
        let classification = outcome.resolution.classification;
        Self {
            reply: outcome.reply,
            writes: outcome.writes,
            mode_hint: outcome.resolution.hint,
            intent: classification.map(|c| c.intent),
            confidence: classification.map_or(0.0, |c| c.confidence),
            degraded: outcome.degraded,
        }
    }
}

/// Run one conversational turn
///
/// Classifies the message, lets the generation collaborator propose note
/// writes, repairs them and stores them. Collaborator failures never fail
/// the request; they produce a degraded reply instead.
#[utoipa::path(
    post,
    path = "/v1/turn",
    request_body = TurnBody,
    responses(
        (status = 200, description = "Turn result", body = TurnResponse),
        (status = 400, description = "Invalid body", body = ApiError),
        (status = 401, description = "Missing x-user-id", body = ApiError),
        (status = 429, description = "Rate limited", body = ApiError)
    ),
    tag = "turns"
)]
pub async fn run_turn(
    State(state): State<AppState>,
    user: UserId,
    AppJson(body): AppJson<TurnBody>,
) -> Result<Json<TurnResponse>, AppError> {
    if body.text.trim().is_empty() {
        return Err(AppError::validation("text", "Message text must not be empty"));
    }

    let sticky = match body.mode_hint {
        Some(hint) => {
            state.sessions.select(user.as_str(), hint).await;
            Some(hint)
        }
        None => state.sessions.mode(user.as_str()).await,
    };

    let now = Utc::now();
    let now_label = state.config.now_label(now);
    let profile = store::profile_prompt(&state.db, user.as_str()).await;
    let orchestrator = Orchestrator::new(
        state.note_store(),
        state.generator.as_ref(),
        state.orchestrator_config(),
    );
    let outcome = orchestrator
        .run_turn(TurnRequest {
            user_id: user.as_str(),
            text: &body.text,
            mode_hint: sticky,
            force_hint: body.force_hint,
            today: state.config.today(now),
            now_label: &now_label,
            profile: profile.as_deref(),
        })
        .await;

    state.sessions.observe(user.as_str(), &outcome.resolution).await;
    tracing::info!(
        user_id = %user.as_str(),
        mode = ?outcome.resolution.hint,
        writes = outcome.writes.len(),
        applied = outcome.applied,
        degraded = outcome.degraded,
        "turn completed"
    );

    Ok(Json(outcome.into()))
}

#[cfg(test)]
mod tests {
    use trener_core::mode::resolve_mode;

    use super::*;

    #[test]
    fn forced_turn_reports_no_intent() {
        let outcome = TurnOutcome {
            reply: "Ок.".into(),
            writes: Vec::new(),
            applied: 0,
            degraded: true,
            resolution: resolve_mode("что угодно", Some(ModeHint::Plan), true),
        };
        let response = TurnResponse::from(outcome);
        assert_eq!(response.mode_hint, Some(ModeHint::Plan));
        assert_eq!(response.intent, None);
        assert_eq!(response.confidence, 0.0);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("intent").is_none());
        assert_eq!(json["mode_hint"], "plan");
    }
}
