use axum::{
    routing::{get, post},
    Router,
};

use crate::views::{
    method_not_allowed,
    user::{me, obtain_token, patch_me, replace_me, revoke, signup},
};
use crate::AppState;

/// Mounted under `/api/user`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(signup))
        .route("/token", post(obtain_token).delete(revoke))
        .route("/me", get(me).put(replace_me).patch(patch_me))
        .method_not_allowed_fallback(method_not_allowed)
}
