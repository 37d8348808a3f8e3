pub mod user;

use axum::http::Method;

use crate::error::AppError;

/// Shared 405 handler so unsupported verbs answer in the same JSON shape as
/// every other error.
pub async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed(method.to_string())
}
