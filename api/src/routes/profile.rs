use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use trener_core::error::ApiError;
use trener_core::profile::{ProfileUpdate, UserProfile};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;
use crate::store;
use crate::user::UserId;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/profile", get(get_profile).put(update_profile))
}

/// Read the user's training profile and goals
///
/// A user who never saved a profile gets every field null.
#[utoipa::path(
    get,
    path = "/v1/profile",
    responses(
        (status = 200, description = "The profile", body = UserProfile),
        (status = 401, description = "Missing x-user-id", body = ApiError)
    ),
    tag = "profile"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: UserId,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(store::load_profile(&state.db, user.as_str()).await?))
}

/// Update part of the profile
///
/// Fields left out keep their value; an empty string clears a text field.
/// The profile is fed into chat turns and plan generation.
#[utoipa::path(
    put,
    path = "/v1/profile",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile after the update", body = UserProfile),
        (status = 400, description = "Empty update or implausible value", body = ApiError),
        (status = 401, description = "Missing x-user-id", body = ApiError)
    ),
    tag = "profile"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: UserId,
    AppJson(update): AppJson<ProfileUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    if update.is_empty() {
        return Err(AppError::Validation {
            message: "No profile fields to update".to_string(),
            field: None,
            received: None,
            docs_hint: Some("Send at least one field, e.g. {\"goal\": \"набор массы\"}.".to_string()),
        });
    }
    update
        .validate()
        .map_err(|err| AppError::validation(err.field, err.message))?;

    let profile = store::save_profile(&state.db, user.as_str(), &update).await?;
    tracing::debug!(user_id = %user.as_str(), "profile updated");
    Ok(Json(profile))
}
