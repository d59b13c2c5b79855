//! Extractors that turn axum rejections into structured `AppError` responses.
//!
//! `AppJson<T>` and `AppQuery<T>` replace `axum::Json<T>` and
//! `axum::extract::Query<T>` in handler signatures, so malformed bodies and
//! query strings answer with the JSON error body instead of plain text.

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Query, Request,
        rejection::{JsonRejection, QueryRejection},
    },
    http::request::Parts,
};

use crate::error::AppError;

const SCHEMA_HINT: &str = "Check the request against the endpoint's schema (GET /api-doc/openapi.json).";

/// Markers serde puts in front of the offending field name.
const FIELD_MARKERS: [&str; 2] = ["missing field `", "unknown field `"];

pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| AppJson(value))
            .map_err(|rejection| validation_error("body", "request body", &rejection.body_text()))
    }
}

pub struct AppQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| AppQuery(value))
            .map_err(|rejection| validation_error("query", "query string", &rejection.body_text()))
    }
}

fn validation_error(fallback_field: &str, what: &str, detail: &str) -> AppError {
    AppError::Validation {
        message: format!("Invalid {what}: {detail}"),
        field: Some(field_from_serde_message(detail).unwrap_or_else(|| fallback_field.to_string())),
        received: None,
        docs_hint: Some(SCHEMA_HINT.to_string()),
    }
}

/// Field named by a serde error message, if any.
fn field_from_serde_message(message: &str) -> Option<String> {
    FIELD_MARKERS.iter().find_map(|marker| {
        let start = message.find(marker)? + marker.len();
        let rest = &message[start..];
        rest.find('`').map(|end| rest[..end].to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_missing_field_name() {
        let msg = "Failed to deserialize: missing field `text` at line 1 column 31";
        assert_eq!(field_from_serde_message(msg), Some("text".to_string()));
    }

    #[test]
    fn extracts_unknown_field_name() {
        let msg = "unknown field `note`, expected one of `d`, `kind`, `text`";
        assert_eq!(field_from_serde_message(msg), Some("note".to_string()));
    }

    #[test]
    fn returns_none_for_generic_error() {
        let msg = "invalid type: string, expected u32";
        assert_eq!(field_from_serde_message(msg), None);
    }
}
