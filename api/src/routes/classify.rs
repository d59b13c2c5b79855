use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use trener_core::error::ApiError;
use trener_core::intent::{self, Intent, IntentScores};
use trener_core::mode::ModeHint;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/classify", post(classify))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClassifyRequest {
    pub text: String,
    /// Mode the conversation is currently in
    #[serde(default)]
    pub current_mode: Option<ModeHint>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClassifyResponse {
    pub intent: Intent,
    /// Winning score share, 0.0 to 1.0
    pub confidence: f64,
    pub scores: IntentScores,
    /// Suggested mode, or `current_mode` when the classifier is unsure
    pub mode_hint: Option<ModeHint>,
    pub partial_workout: bool,
    pub plan_request: bool,
}

fn classify_text(request: &ClassifyRequest) -> ClassifyResponse {
    let classification = intent::classify_intent(&request.text, request.current_mode);
    ClassifyResponse {
        intent: classification.intent,
        confidence: classification.confidence,
        scores: classification.scores,
        mode_hint: intent::mode_hint(&request.text, request.current_mode),
        partial_workout: intent::is_partial_workout_record(&request.text),
        plan_request: intent::is_plan_request(&request.text),
    }
}

/// Classify a message without running a turn
#[utoipa::path(
    post,
    path = "/v1/classify",
    request_body = ClassifyRequest,
    responses(
        (status = 200, description = "Classification", body = ClassifyResponse),
        (status = 400, description = "Invalid body", body = ApiError)
    ),
    tag = "turns"
)]
pub async fn classify(
    AppJson(request): AppJson<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, AppError> {
    Ok(Json(classify_text(&request)))
}
