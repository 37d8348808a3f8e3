use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::error::AppError;
use crate::extract::{CurrentUser, ValidJson};
use crate::serializers::user::{LoginReq, ProfilePatch, SignupReq, TokenResp, UserPublic};
use crate::tokens::{get_or_create_token, revoke_token};
use crate::users::{authenticate, create_user, update_user, NewUser, UserChanges};
use crate::AppState;

// ---------- public ----------
pub async fn signup(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SignupReq>,
) -> Result<(StatusCode, Json<UserPublic>), AppError> {
    // `required` has already been checked by the validator
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    let created = create_user(
        &state.db,
        &state.settings.password,
        NewUser {
            email: &email,
            password: &password,
            name: &req.name,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn obtain_token(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginReq>,
) -> Result<Json<TokenResp>, AppError> {
    let user = authenticate(
        &state.db,
        req.email.as_deref().unwrap_or_default(),
        req.password.as_deref().unwrap_or_default(),
    )
    .await?;

    let token = get_or_create_token(&state.db, user.id).await?;
    info!(user_id = user.id, "token handed out");
    Ok(Json(TokenResp { token }))
}

// ---------- authenticated ----------
pub async fn revoke(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<StatusCode, AppError> {
    revoke_token(&state.db, user.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserPublic> {
    Json(user.into())
}

pub async fn replace_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidJson(req): ValidJson<SignupReq>,
) -> Result<Json<UserPublic>, AppError> {
    let changes = UserChanges {
        email: req.email,
        password: req.password,
        name: Some(req.name),
    };
    let updated = update_user(&state.db, &state.settings.password, user, changes).await?;
    Ok(Json(updated.into()))
}

pub async fn patch_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidJson(req): ValidJson<ProfilePatch>,
) -> Result<Json<UserPublic>, AppError> {
    let changes = UserChanges {
        email: req.email,
        password: req.password,
        name: req.name,
    };
    let updated = update_user(&state.db, &state.settings.password, user, changes).await?;
    Ok(Json(updated.into()))
}
