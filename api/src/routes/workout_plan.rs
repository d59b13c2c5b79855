use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use trener_core::checklist::{self, Checklist, SetProgress, SetStateUpdate};
use trener_core::error::ApiError;
use trener_core::notes::{NoteKind, NoteStore};
use trener_core::plan::{self, ParsedPlan, PlanParseStrategy};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;
use crate::store;
use crate::user::UserId;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/workout-plan/today", get(today_checklist))
        .route("/v1/workout-plan/set-state", post(update_set_state))
        .route("/v1/workout-plan/parse", post(parse_plan_text))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ParsePlanRequest {
    pub text: String,
    /// Defaults to the server's configured strategy
    #[serde(default)]
    pub strategy: Option<PlanParseStrategy>,
}

async fn parse_with(state: &AppState, text: &str, strategy: PlanParseStrategy) -> ParsedPlan {
    plan::parse_plan(
        text,
        strategy,
        Some(state.generator.as_ref()),
        state.config.plan_parse_timeout,
    )
    .await
}

/// Today's plan as a checklist
///
/// Parses today's plan note and overlays stored set completion state.
#[utoipa::path(
    get,
    path = "/v1/workout-plan/today",
    responses(
        (status = 200, description = "Checklist; `has_plan` is false without a usable plan", body = Checklist),
        (status = 401, description = "Missing x-user-id", body = ApiError)
    ),
    tag = "workout-plan"
)]
pub async fn today_checklist(
    State(state): State<AppState>,
    user: UserId,
) -> Result<Json<Checklist>, AppError> {
    let d = state.config.today(Utc::now());
    let plan_text = state.notes.get(user.as_str(), d, NoteKind::Plan).await?;
    let parsed = parse_with(&state, &plan_text, state.config.plan_parse_strategy).await;
    let progress = store::load_progress(&state.db, user.as_str(), d).await?;
    Ok(Json(checklist::build_checklist(d, &plan_text, parsed, &progress)))
}

/// Mark a planned set completed or skipped, or record what was performed
#[utoipa::path(
    post,
    path = "/v1/workout-plan/set-state",
    request_body = SetStateUpdate,
    responses(
        (status = 200, description = "Stored progress of the set", body = SetProgress),
        (status = 400, description = "Invalid body", body = ApiError),
        (status = 401, description = "Missing x-user-id", body = ApiError)
    ),
    tag = "workout-plan"
)]
pub async fn update_set_state(
    State(state): State<AppState>,
    user: UserId,
    AppJson(update): AppJson<SetStateUpdate>,
) -> Result<Json<SetProgress>, AppError> {
    if update.exercise_name.trim().is_empty() {
        return Err(AppError::validation("exercise_name", "Exercise name must not be empty"));
    }
    if update.set_number == 0 {
        return Err(AppError::Validation {
            message: "Set numbers start at 1".to_string(),
            field: Some("set_number".to_string()),
            received: Some(serde_json::json!(update.set_number)),
            docs_hint: None,
        });
    }

    let d = state.config.today(Utc::now());
    let progress = store::save_progress(&state.db, user.as_str(), d, &update).await?;
    tracing::debug!(
        user_id = %user.as_str(),
        exercise = %update.exercise_name,
        set_number = update.set_number,
        completed = progress.completed,
        skipped = progress.skipped,
        "set state updated"
    );
    Ok(Json(progress))
}

/// Parse arbitrary plan text into exercises
///
/// The response names the strategy that actually ran, which is
/// `deterministic` whenever assisted extraction was unavailable or failed.
#[utoipa::path(
    post,
    path = "/v1/workout-plan/parse",
    request_body = ParsePlanRequest,
    responses(
        (status = 200, description = "Parsed exercises", body = ParsedPlan),
        (status = 400, description = "Invalid body", body = ApiError)
    ),
    tag = "workout-plan"
)]
pub async fn parse_plan_text(
    State(state): State<AppState>,
    AppJson(request): AppJson<ParsePlanRequest>,
) -> Result<Json<ParsedPlan>, AppError> {
    let strategy = request
        .strategy
        .unwrap_or(state.config.plan_parse_strategy);
    Ok(Json(parse_with(&state, &request.text, strategy).await))
}
