use std::collections::HashMap;

use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::QueryRejection,
        Query, State,
    },
    http::StatusCode,
    Json,
};
use cookbook_core::models::recipe;
use cookbook_core::{AppError, AppState, CurrentUser, FieldErrors, RecordId, ValidJson};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::info;

use crate::filters::{parse_ids, RecipeListQuery};
use crate::kinds::{AttrKind, Ingredients, Tags};
use crate::media::{check_image, image_file_path, store};
use crate::serializers::attr::AttrOut;
use crate::serializers::recipe::{
    field_checks, RecipeDetailOut, RecipeImageOut, RecipeIn, RecipeOut, RecipePatch,
};

// ---------- reads ----------
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    query: Result<Query<RecipeListQuery>, QueryRejection>,
) -> Result<Json<Vec<RecipeOut>>, AppError> {
    let Query(query) = query?;
    let mut select = recipe::Entity::find().filter(recipe::Column::UserId.eq(user.id()));

    let (tag_ids, ingredient_ids) = match (
        parse_ids(Tags::FIELD, query.tags.as_deref()),
        parse_ids(Ingredients::FIELD, query.ingredients.as_deref()),
    ) {
        (Ok(t), Ok(i)) => (t, i),
        (t, i) => {
            let mut errors = FieldErrors::new();
            errors.merge(t.err().unwrap_or_default());
            errors.merge(i.err().unwrap_or_default());
            return Err(AppError::Validation(errors));
        }
    };

    if let Some(ids) = tag_ids {
        select = select.filter(recipe::Column::Id.in_subquery(Tags::recipes_linked_to(&ids)));
    }
    if let Some(ids) = ingredient_ids {
        select = select.filter(recipe::Column::Id.in_subquery(Ingredients::recipes_linked_to(&ids)));
    }

    let rows = select.order_by_desc(recipe::Column::Id).all(&state.db).await?;
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut tags = grouped::<Tags, _>(&state.db, &ids).await?;
    let mut ingredients = grouped::<Ingredients, _>(&state.db, &ids).await?;

    let out = rows
        .into_iter()
        .map(|r| {
            let t = ids_of(tags.remove(&r.id));
            let i = ids_of(ingredients.remove(&r.id));
            RecipeOut::new(r, t, i)
        })
        .collect();
    Ok(Json(out))
}

pub async fn retrieve(
    State(state): State<AppState>,
    user: CurrentUser,
    RecordId(id): RecordId,
) -> Result<Json<RecipeDetailOut>, AppError> {
    let found = find_owned(&state.db, user.id(), id).await?;
    let tags = grouped::<Tags, _>(&state.db, &[found.id]).await?.remove(&found.id);
    let ingredients = grouped::<Ingredients, _>(&state.db, &[found.id])
        .await?
        .remove(&found.id);

    let image = found.image.as_deref().map(|p| state.settings.media_url_for(p));
    Ok(Json(RecipeDetailOut {
        id: found.id,
        title: found.title,
        ingredients: ingredients.unwrap_or_default(),
        tags: tags.unwrap_or_default(),
        time_minutes: found.time_minutes,
        price: found.price,
        link: found.link,
        image,
    }))
}

// ---------- writes ----------
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(req): ValidJson<RecipeIn>,
) -> Result<(StatusCode, Json<RecipeOut>), AppError> {
    let owner = user.id();
    let mut errors = field_checks(req.title.as_deref(), req.price.as_ref());
    let tag_ids = owned_links::<Tags, _>(&state.db, owner, req.tags, &mut errors).await?;
    let ingredient_ids =
        owned_links::<Ingredients, _>(&state.db, owner, req.ingredients, &mut errors).await?;
    errors.into_result()?;

    let txn = state.db.begin().await?;
    let created = recipe::ActiveModel {
        title: Set(req.title.unwrap_or_default().trim().to_owned()),
        time_minutes: Set(req.time_minutes.unwrap_or_default()),
        price: Set(req.price.unwrap_or_default()),
        link: Set(req.link),
        image: Set(None),
        user_id: Set(owner),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    let tag_ids = tag_ids.unwrap_or_default();
    let ingredient_ids = ingredient_ids.unwrap_or_default();
    Tags::set_links(&txn, created.id, &tag_ids).await?;
    Ingredients::set_links(&txn, created.id, &ingredient_ids).await?;
    txn.commit().await?;

    info!(recipe_id = created.id, user_id = owner, "recipe created");
    Ok((
        StatusCode::CREATED,
        Json(RecipeOut::new(created, tag_ids, ingredient_ids)),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    RecordId(id): RecordId,
    ValidJson(req): ValidJson<RecipeIn>,
) -> Result<Json<RecipeOut>, AppError> {
    let changes = RecipePatch {
        title: req.title,
        time_minutes: req.time_minutes,
        price: req.price,
        link: Some(req.link),
        tags: req.tags,
        ingredients: req.ingredients,
    };
    apply(&state, user.id(), id, changes).await.map(Json)
}

pub async fn partial_update(
    State(state): State<AppState>,
    user: CurrentUser,
    RecordId(id): RecordId,
    ValidJson(req): ValidJson<RecipePatch>,
) -> Result<Json<RecipeOut>, AppError> {
    apply(&state, user.id(), id, req).await.map(Json)
}

pub async fn destroy(
    State(state): State<AppState>,
    user: CurrentUser,
    RecordId(id): RecordId,
) -> Result<StatusCode, AppError> {
    let owner = user.id();
    let found = find_owned(&state.db, owner, id).await?;

    let txn = state.db.begin().await?;
    Tags::set_links(&txn, found.id, &[]).await?;
    Ingredients::set_links(&txn, found.id, &[]).await?;
    recipe::Entity::delete_by_id(found.id).exec(&txn).await?;
    txn.commit().await?;

    info!(recipe_id = id, user_id = owner, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_image(
    State(state): State<AppState>,
    user: CurrentUser,
    RecordId(id): RecordId,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RecipeImageOut>, AppError> {
    let found = find_owned(&state.db, user.id(), id).await?;
    let mut multipart = multipart?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().map(str::to_owned);
        let bytes = field.bytes().await?;
        if !bytes.is_empty() {
            upload = Some((file_name, bytes.to_vec()));
        }
        break;
    }
    let Some((file_name, bytes)) = upload else {
        return Err(AppError::field("image", "No file was submitted."));
    };

    let (bytes, format) = check_image(bytes).await?;
    let relative = image_file_path(file_name.as_deref(), format);
    store(&state.settings.media_root, &relative, &bytes).await?;

    let mut am = found.into_active_model();
    am.image = Set(Some(relative.clone()));
    let saved = am.update(&state.db).await?;

    info!(recipe_id = saved.id, path = %relative, "recipe image stored");
    Ok(Json(RecipeImageOut {
        id: saved.id,
        image: Some(state.settings.media_url_for(&relative)),
    }))
}

// ---------- helpers ----------
async fn find_owned<C: ConnectionTrait>(
    db: &C,
    owner: i64,
    id: i64,
) -> Result<recipe::Model, AppError> {
    recipe::Entity::find_by_id(id)
        .filter(recipe::Column::UserId.eq(owner))
        .one(db)
        .await?
        .ok_or(AppError::NotFound)
}

/// Shared body of PUT and PATCH. Only the fields present are written; a
/// provided id list replaces the recipe's links, an absent one keeps them.
async fn apply(
    state: &AppState,
    owner: i64,
    id: i64,
    changes: RecipePatch,
) -> Result<RecipeOut, AppError> {
    let found = find_owned(&state.db, owner, id).await?;

    let mut errors = field_checks(changes.title.as_deref(), changes.price.as_ref());
    let tag_ids = owned_links::<Tags, _>(&state.db, owner, changes.tags, &mut errors).await?;
    let ingredient_ids =
        owned_links::<Ingredients, _>(&state.db, owner, changes.ingredients, &mut errors).await?;
    errors.into_result()?;

    let txn = state.db.begin().await?;
    let mut am = found.into_active_model();
    if let Some(title) = changes.title {
        am.title = Set(title.trim().to_owned());
    }
    if let Some(minutes) = changes.time_minutes {
        am.time_minutes = Set(minutes);
    }
    if let Some(price) = changes.price {
        am.price = Set(price);
    }
    if let Some(link) = changes.link {
        am.link = Set(link);
    }
    let saved = if am.is_changed() {
        am.update(&txn).await?
    } else {
        find_owned(&txn, owner, id).await?
    };
    if let Some(ids) = &tag_ids {
        Tags::set_links(&txn, saved.id, ids).await?;
    }
    if let Some(ids) = &ingredient_ids {
        Ingredients::set_links(&txn, saved.id, ids).await?;
    }
    let tags = ids_of(grouped::<Tags, _>(&txn, &[saved.id]).await?.remove(&saved.id));
    let ingredients = ids_of(
        grouped::<Ingredients, _>(&txn, &[saved.id])
            .await?
            .remove(&saved.id),
    );
    txn.commit().await?;

    info!(recipe_id = saved.id, user_id = owner, "recipe updated");
    Ok(RecipeOut::new(saved, tags, ingredients))
}

/// Dedupes `requested` and records a field error for every id the caller
/// does not own. `None` passes through so callers can tell "absent" apart.
async fn owned_links<K: AttrKind, C: ConnectionTrait>(
    db: &C,
    owner: i64,
    requested: Option<Vec<i64>>,
    errors: &mut FieldErrors,
) -> Result<Option<Vec<i64>>, AppError> {
    let Some(mut ids) = requested else {
        return Ok(None);
    };
    ids.sort_unstable();
    ids.dedup();

    let owned = K::owned_ids(db, owner, &ids).await?;
    for id in ids.iter().filter(|id| !owned.contains(id)) {
        errors.add(K::FIELD, format!("Invalid pk \"{id}\" - object does not exist."));
    }
    Ok(Some(ids))
}

async fn grouped<K: AttrKind, C: ConnectionTrait>(
    db: &C,
    recipe_ids: &[i64],
) -> Result<HashMap<i64, Vec<AttrOut>>, AppError> {
    let mut out: HashMap<i64, Vec<AttrOut>> = HashMap::new();
    for (recipe_id, row) in K::links(db, recipe_ids).await? {
        out.entry(recipe_id).or_default().push(row);
    }
    Ok(out)
}

fn ids_of(rows: Option<Vec<AttrOut>>) -> Vec<i64> {
    rows.unwrap_or_default().into_iter().map(|r| r.id).collect()
}
