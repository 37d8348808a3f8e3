//! Handlers shared by `/tags` and `/ingredients`, instantiated per
//! [`AttrKind`] in the router.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use cookbook_core::{AppError, AppState, CurrentUser, RecordId, ValidJson};

use crate::filters::{parse_assigned_only, AttrListQuery};
use crate::kinds::AttrKind;
use crate::serializers::attr::{clean_title, AttrIn, AttrOut, AttrPatch};

pub async fn list<K: AttrKind>(
    State(state): State<AppState>,
    user: CurrentUser,
    query: Result<Query<AttrListQuery>, QueryRejection>,
) -> Result<Json<Vec<AttrOut>>, AppError> {
    let Query(query) = query?;
    let assigned_only = parse_assigned_only(query.assigned_only.as_deref())?;
    Ok(Json(K::list(&state.db, user.id(), assigned_only).await?))
}

pub async fn create<K: AttrKind>(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(req): ValidJson<AttrIn>,
) -> Result<(StatusCode, Json<AttrOut>), AppError> {
    let title = clean_title(req.title.as_deref().unwrap_or_default())?;
    let created = K::create(&state.db, user.id(), title).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn retrieve<K: AttrKind>(
    State(state): State<AppState>,
    user: CurrentUser,
    RecordId(id): RecordId,
) -> Result<Json<AttrOut>, AppError> {
    let found = K::get(&state.db, user.id(), id).await?;
    found.map(Json).ok_or(AppError::NotFound)
}

pub async fn update<K: AttrKind>(
    State(state): State<AppState>,
    user: CurrentUser,
    RecordId(id): RecordId,
    ValidJson(req): ValidJson<AttrIn>,
) -> Result<Json<AttrOut>, AppError> {
    rename::<K>(&state, user.id(), id, req.title).await
}

pub async fn partial_update<K: AttrKind>(
    State(state): State<AppState>,
    user: CurrentUser,
    RecordId(id): RecordId,
    ValidJson(req): ValidJson<AttrPatch>,
) -> Result<Json<AttrOut>, AppError> {
    rename::<K>(&state, user.id(), id, req.title).await
}

pub async fn destroy<K: AttrKind>(
    State(state): State<AppState>,
    user: CurrentUser,
    RecordId(id): RecordId,
) -> Result<StatusCode, AppError> {
    if K::delete(&state.db, user.id(), id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

/// `None` leaves the row as it is (an empty PATCH).
async fn rename<K: AttrKind>(
    state: &AppState,
    owner: i64,
    id: i64,
    title: Option<String>,
) -> Result<Json<AttrOut>, AppError> {
    let found = match title {
        Some(raw) => {
            let title = clean_title(&raw)?;
            K::rename(&state.db, owner, id, title).await?
        }
        None => K::get(&state.db, owner, id).await?,
    };
    found.map(Json).ok_or(AppError::NotFound)
}
