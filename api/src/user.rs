use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity taken from the `x-user-id` header.
///
/// Authentication is delegated to whatever fronts the service (the chat
/// gateway); this only requires the header to carry a non-empty id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn user_id_from_parts(parts: &Parts) -> Result<UserId, AppError> {
    parts
        .headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| UserId(value.to_string()))
        .ok_or_else(|| AppError::Unauthorized {
            message: "Missing x-user-id header".to_string(),
            docs_hint: Some("Send the chat user's id in the 'x-user-id' header.".to_string()),
        })
}

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_id_from_parts(parts)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/v1/notes");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn reads_trimmed_user_id() {
        let parts = parts_with(Some("  tg-42 "));
        assert_eq!(user_id_from_parts(&parts).unwrap(), UserId("tg-42".into()));
    }

    #[test]
    fn missing_or_blank_header_is_unauthorized() {
        assert!(matches!(
            user_id_from_parts(&parts_with(None)),
            Err(AppError::Unauthorized { .. })
        ));
        assert!(matches!(
            user_id_from_parts(&parts_with(Some("   "))),
            Err(AppError::Unauthorized { .. })
        ));
    }
}
