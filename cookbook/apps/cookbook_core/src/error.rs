use std::collections::BTreeMap;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

/// Field-keyed validation messages, rendered as `{"field": ["msg", ...]}`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_owned()).or_default().push(message.into());
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = Self::new();
        for (field, errs) in errors.field_errors() {
            for e in errs {
                let msg = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({}).", e.code));
                out.add(&field, msg);
            }
        }
        out
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication credentials were not provided.")]
    NotAuthenticated,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("User inactive or deleted.")]
    InactiveUser,

    #[error("Unable to authenticate with provided credentials.")]
    InvalidCredentials,

    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    Malformed(String),

    #[error("Not found.")]
    NotFound,

    #[error("Method \"{0}\" not allowed.")]
    MethodNotAllowed(String),

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error("Request body is too large.")]
    PayloadTooLarge,

    #[error("database error: {0}")]
    Db(#[from] DbErr),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotAuthenticated | AppError::InvalidToken | AppError::InactiveUser => {
                StatusCode::UNAUTHORIZED
            }
            AppError::InvalidCredentials | AppError::Validation(_) | AppError::Malformed(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Db(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// True when the database rejected a write on a unique constraint.
    pub fn is_unique_violation(err: &DbErr) -> bool {
        matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(fields) => json!(fields),
            AppError::InvalidCredentials => json!({ "non_field_errors": [self.to_string()] }),
            AppError::Db(_) | AppError::Io(_) | AppError::Internal(_) => {
                error!(error = %self, "request failed");
                json!({ "detail": "Internal server error." })
            }
            _ => json!({ "detail": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(r) => AppError::UnsupportedMediaType(r.body_text()),
            JsonRejection::BytesRejection(r) if r.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                AppError::PayloadTooLarge
            }
            JsonRejection::JsonDataError(r) => data_error(&r.body_text()),
            other => AppError::Malformed(other.body_text()),
        }
    }
}

/// Turns a serde data error into a field error keyed by the top-level field
/// in its path, e.g. `time_minutes: invalid type: ...` or `tags[0]: ...`.
/// Errors without a path stay a `detail` message.
fn data_error(text: &str) -> AppError {
    let detail = text
        .split_once("target type: ")
        .map_or(text, |(_, rest)| rest);
    let detail = detail.split(" at line ").next().unwrap_or(detail);

    if let Some(field) = detail
        .strip_prefix("missing field `")
        .and_then(|rest| rest.strip_suffix('`'))
    {
        return AppError::field(field, "This field is required.");
    }
    match detail.split_once(": ") {
        Some((path, message)) if !path.is_empty() && !path.contains(' ') => {
            let field = path.split(['.', '[']).next().unwrap_or(path);
            AppError::field(field, sentence(message))
        }
        _ => AppError::Malformed(text.to_owned()),
    }
}

fn sentence(message: &str) -> String {
    let mut chars = message.chars();
    let mut out: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    if !out.ends_with('.') {
        out.push('.');
    }
    out
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Malformed(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        match rejection {
            MultipartRejection::InvalidBoundary(r) => AppError::UnsupportedMediaType(r.body_text()),
            other => AppError::Malformed(other.body_text()),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::Malformed(err.body_text())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = http_body_util::BodyExt::collect(resp.into_body())
            .await
            .unwrap()
            .to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_renders_field_keyed_lists() {
        let mut errors = FieldErrors::new();
        errors.add("title", "This field may not be blank.");
        errors.add("price", "This field is required.");
        errors.add("price", "Ensure that there are no more than 5 digits in total.");

        let resp = AppError::Validation(errors).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(resp).await,
            json!({
                "price": ["This field is required.", "Ensure that there are no more than 5 digits in total."],
                "title": ["This field may not be blank."],
            })
        );
    }

    #[tokio::test]
    async fn invalid_credentials_use_non_field_errors() {
        let resp = AppError::InvalidCredentials.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert!(body["non_field_errors"][0]
            .as_str()
            .unwrap()
            .starts_with("Unable to authenticate"));
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_details() {
        let resp = AppError::Db(DbErr::Custom("secret table exploded".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await, json!({ "detail": "Internal server error." }));
    }

    #[test]
    fn json_type_errors_are_keyed_by_field() {
        let err = data_error(
            "Failed to deserialize the JSON body into the target type: time_minutes: \
             invalid type: string \"abc\", expected i32 at line 1 column 25",
        );
        let AppError::Validation(fields) = err else {
            panic!("expected a field error, got {err:?}");
        };
        assert_eq!(
            fields.get("time_minutes"),
            Some(&["Invalid type: string \"abc\", expected i32.".to_owned()][..])
        );

        let err = data_error(
            "Failed to deserialize the JSON body into the target type: tags[1]: \
             invalid type: string \"x\", expected i64 at line 1 column 12",
        );
        assert!(matches!(err, AppError::Validation(ref f) if f.get("tags").is_some()));

        let err = data_error(
            "Failed to deserialize the JSON body into the target type: \
             missing field `email` at line 1 column 2",
        );
        assert!(matches!(err, AppError::Validation(ref f) if f.get("email").is_some()));
    }

    #[test]
    fn json_errors_without_a_path_stay_detail() {
        let err = data_error(
            "Failed to deserialize the JSON body into the target type: \
             invalid type: integer `3`, expected struct RecipeIn at line 1 column 1",
        );
        assert!(matches!(err, AppError::Malformed(_)));
    }

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(AppError::NotAuthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::MethodNotAllowed("DELETE".into()).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            AppError::MethodNotAllowed("DELETE".into()).to_string(),
            "Method \"DELETE\" not allowed."
        );
    }
}
