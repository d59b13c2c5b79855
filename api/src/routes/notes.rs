use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use trener_core::error::ApiError;
use trener_core::notes::{Note, NoteKind, NoteStore};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::extract::{AppJson, AppQuery};
use crate::state::AppState;
use crate::user::UserId;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/notes", get(get_note).put(put_note))
        .route("/v1/notes/append", post(append_note))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct NoteQuery {
    /// Calendar date (YYYY-MM-DD); defaults to today in the deployment timezone
    pub d: Option<NaiveDate>,
    pub kind: NoteKind,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NoteBody {
    /// Calendar date (YYYY-MM-DD); defaults to today in the deployment timezone
    #[serde(default)]
    pub d: Option<NaiveDate>,
    pub kind: NoteKind,
    pub text: String,
}

/// Read one note
///
/// A note that was never written is returned with empty text and no
/// `updated_at`.
#[utoipa::path(
    get,
    path = "/v1/notes",
    params(NoteQuery),
    responses(
        (status = 200, description = "The note", body = Note),
        (status = 400, description = "Invalid date or kind", body = ApiError),
        (status = 401, description = "Missing x-user-id", body = ApiError)
    ),
    tag = "notes"
)]
pub async fn get_note(
    State(state): State<AppState>,
    user: UserId,
    AppQuery(query): AppQuery<NoteQuery>,
) -> Result<Json<Note>, AppError> {
    let d = query.d.unwrap_or_else(|| state.config.today(Utc::now()));
    let note = state.notes.fetch(user.as_str(), d, query.kind).await?;
    Ok(Json(note))
}

/// Replace a note's text
#[utoipa::path(
    put,
    path = "/v1/notes",
    request_body = NoteBody,
    responses(
        (status = 200, description = "Note after the write", body = Note),
        (status = 400, description = "Invalid body", body = ApiError),
        (status = 401, description = "Missing x-user-id", body = ApiError)
    ),
    tag = "notes"
)]
pub async fn put_note(
    State(state): State<AppState>,
    user: UserId,
    AppJson(body): AppJson<NoteBody>,
) -> Result<Json<Note>, AppError> {
    let d = body.d.unwrap_or_else(|| state.config.today(Utc::now()));
    state.notes.put(user.as_str(), d, body.kind, &body.text).await?;
    tracing::info!(user_id = %user.as_str(), %d, kind = %body.kind, "note replaced");
    Ok(Json(state.notes.fetch(user.as_str(), d, body.kind).await?))
}

/// Append a chunk to a note
///
/// An empty note takes the chunk as-is; otherwise the chunk follows a blank line.
#[utoipa::path(
    post,
    path = "/v1/notes/append",
    request_body = NoteBody,
    responses(
        (status = 200, description = "Note after the write", body = Note),
        (status = 400, description = "Invalid body", body = ApiError),
        (status = 401, description = "Missing x-user-id", body = ApiError)
    ),
    tag = "notes"
)]
pub async fn append_note(
    State(state): State<AppState>,
    user: UserId,
    AppJson(body): AppJson<NoteBody>,
) -> Result<Json<Note>, AppError> {
    if body.text.trim().is_empty() {
        return Err(AppError::validation("text", "Appended text must not be empty"));
    }
    let d = body.d.unwrap_or_else(|| state.config.today(Utc::now()));
    state
        .notes
        .append(user.as_str(), d, body.kind, &body.text)
        .await?;
    tracing::info!(user_id = %user.as_str(), %d, kind = %body.kind, "note appended");
    Ok(Json(state.notes.fetch(user.as_str(), d, body.kind).await?))
}
