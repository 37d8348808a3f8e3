use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{header, request::Parts},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{AppError, FieldErrors};
use crate::models::user;
use crate::tokens::resolve_token;
use crate::AppState;

/// The authenticated caller. Rejects with 401 when the request carries no
/// usable `Authorization: Token <key>` (or `Bearer <key>`) header.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub user::Model);

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

/// Pulls the key out of an `Authorization` header value.
pub fn token_from_header(value: &str) -> Option<&str> {
    let (scheme, key) = value.trim().split_once(' ')?;
    if !(scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer")) {
        return None;
    }
    let key = key.trim();
    (!key.is_empty() && !key.contains(' ')).then_some(key)
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(header::AUTHORIZATION) else {
            return Err(AppError::NotAuthenticated);
        };
        let key = raw
            .to_str()
            .ok()
            .and_then(token_from_header)
            .ok_or(AppError::InvalidToken)?;

        let user = resolve_token(&state.db, key).await?;
        Ok(CurrentUser(user))
    }
}

/// Numeric `{id}` path segment. Anything that is not an integer cannot name a
/// row, so it answers 404 like an unknown id.
#[derive(Clone, Copy, Debug)]
pub struct RecordId(pub i64);

impl<S> FromRequestParts<S> for RecordId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::NotFound)?;
        Ok(RecordId(id))
    }
}

/// JSON body that has been deserialized and passed its `validator` rules.
/// Every failure is rendered as a 400 with field-keyed messages.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value
            .validate()
            .map_err(|e| AppError::Validation(FieldErrors::from(e)))?;
        Ok(ValidJson(value))
    }
}
