use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use trener_core::error::ApiError;
use trener_core::mode::ModeHint;
use trener_core::notes::NoteKind;
use trener_core::orchestrator::{Orchestrator, TurnRequest};
use trener_core::prompts;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;
use crate::store;
use crate::user::UserId;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/plans/generate", post(generate_plan))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GeneratePlanRequest {
    /// Day the plan is for; defaults to today
    #[serde(default)]
    pub d: Option<NaiveDate>,
    /// `workouts` or `meals`
    pub kind: NoteKind,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GeneratedPlan {
    pub d: NaiveDate,
    pub kind: NoteKind,
    /// Plan note text as stored
    pub text: String,
    pub degraded: bool,
}

/// Generate and store a plan for a day
///
/// Runs a forced plan-mode turn. The stored plan is never empty: when the
/// collaborator's plan is missing or too short, a template plan is stored.
#[utoipa::path(
    post,
    path = "/v1/plans/generate",
    request_body = GeneratePlanRequest,
    responses(
        (status = 200, description = "Generated plan", body = GeneratedPlan),
        (status = 400, description = "Invalid body", body = ApiError),
        (status = 401, description = "Missing x-user-id", body = ApiError),
        (status = 429, description = "Rate limited", body = ApiError)
    ),
    tag = "turns"
)]
pub async fn generate_plan(
    State(state): State<AppState>,
    user: UserId,
    AppJson(request): AppJson<GeneratePlanRequest>,
) -> Result<Json<GeneratedPlan>, AppError> {
    if request.kind == NoteKind::Plan {
        return Err(AppError::Validation {
            message: "Plans are generated for workouts or meals".to_string(),
            field: Some("kind".to_string()),
            received: Some(serde_json::json!(request.kind)),
            docs_hint: Some("Use kind 'workouts' or 'meals'.".to_string()),
        });
    }

    let now = Utc::now();
    let d = request.d.unwrap_or_else(|| state.config.today(now));
    let profile = store::profile_prompt(&state.db, user.as_str()).await;
    let message = prompts::plan_generation_request(d, request.kind, profile.is_some());
    let now_label = state.config.now_label(now);

    let orchestrator = Orchestrator::new(
        state.note_store(),
        state.generator.as_ref(),
        state.orchestrator_config(),
    );
    let outcome = orchestrator
        .run_turn(TurnRequest {
            user_id: user.as_str(),
            text: &message,
            mode_hint: Some(ModeHint::Plan),
            force_hint: true,
            today: d,
            now_label: &now_label,
            profile: profile.as_deref(),
        })
        .await;

    let plan = outcome
        .writes
        .into_iter()
        .find(|write| write.kind == NoteKind::Plan)
        .ok_or_else(|| AppError::Internal("forced plan turn produced no plan write".into()))?;

    tracing::info!(
        user_id = %user.as_str(),
        d = %plan.d,
        kind = %request.kind,
        degraded = outcome.degraded,
        "plan generated"
    );

    Ok(Json(GeneratedPlan {
        d: plan.d,
        kind: request.kind,
        text: plan.text,
        degraded: outcome.degraded,
    }))
}
