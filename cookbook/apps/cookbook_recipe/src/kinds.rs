//! Tags and ingredients share one shape (`id`, `title`, owner) and one join
//! table pattern, so both are served through the [`AttrKind`] trait.
//!
//! Every query here carries the owner predicate; nothing reads or writes
//! another user's rows.

use async_trait::async_trait;
use cookbook_core::models::{ingredient, recipe, recipe_ingredient, recipe_tag, tag};
use sea_orm::sea_query::{Expr, Query, SelectStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::serializers::attr::AttrOut;

#[async_trait]
pub trait AttrKind: Send + Sync + 'static {
    /// Field name on the recipe wire shape and the recipe list filter key.
    const FIELD: &'static str;

    /// Owned rows, title descending. With `assigned_only`, only rows used by
    /// at least one of the owner's recipes.
    async fn list<C: ConnectionTrait>(
        db: &C,
        owner: i64,
        assigned_only: bool,
    ) -> Result<Vec<AttrOut>, DbErr>;

    async fn create<C: ConnectionTrait>(db: &C, owner: i64, title: String) -> Result<AttrOut, DbErr>;

    async fn get<C: ConnectionTrait>(db: &C, owner: i64, id: i64) -> Result<Option<AttrOut>, DbErr>;

    async fn rename<C: ConnectionTrait>(
        db: &C,
        owner: i64,
        id: i64,
        title: String,
    ) -> Result<Option<AttrOut>, DbErr>;

    /// Returns whether an owned row was deleted.
    async fn delete<C: ConnectionTrait>(db: &C, owner: i64, id: i64) -> Result<bool, DbErr>;

    /// The subset of `ids` that exist and belong to `owner`.
    async fn owned_ids<C: ConnectionTrait>(db: &C, owner: i64, ids: &[i64]) -> Result<Vec<i64>, DbErr>;

    /// `(recipe_id, row)` pairs for every link of the given recipes.
    async fn links<C: ConnectionTrait>(db: &C, recipe_ids: &[i64]) -> Result<Vec<(i64, AttrOut)>, DbErr>;

    /// Replaces the recipe's links with `ids`.
    async fn set_links<C: ConnectionTrait>(db: &C, recipe_id: i64, ids: &[i64]) -> Result<(), DbErr>;

    /// `SELECT recipe_id` of recipes linked to any of `ids`.
    fn recipes_linked_to(ids: &[i64]) -> SelectStatement;
}

macro_rules! attr_kind {
    ($kind:ident, $field:literal, $model:ident, $link:ident, $link_col:ident, $link_field:ident) => {
        pub struct $kind;

        #[async_trait]
        impl AttrKind for $kind {
            const FIELD: &'static str = $field;

            async fn list<C: ConnectionTrait>(
                db: &C,
                owner: i64,
                assigned_only: bool,
            ) -> Result<Vec<AttrOut>, DbErr> {
                let mut query = $model::Entity::find().filter($model::Column::UserId.eq(owner));
                if assigned_only {
                    let used = Query::select()
                        .column(($link::Entity, $link::Column::$link_col))
                        .from($link::Entity)
                        .inner_join(
                            recipe::Entity,
                            Expr::col((recipe::Entity, recipe::Column::Id))
                                .equals(($link::Entity, $link::Column::RecipeId)),
                        )
                        .and_where(Expr::col((recipe::Entity, recipe::Column::UserId)).eq(owner))
                        .to_owned();
                    query = query.filter($model::Column::Id.in_subquery(used));
                }
                let rows = query
                    .order_by_desc($model::Column::Title)
                    .order_by_desc($model::Column::Id)
                    .all(db)
                    .await?;
                Ok(rows.into_iter().map(AttrOut::from).collect())
            }

            async fn create<C: ConnectionTrait>(
                db: &C,
                owner: i64,
                title: String,
            ) -> Result<AttrOut, DbErr> {
                let row = $model::ActiveModel {
                    title: Set(title),
                    user_id: Set(owner),
                    ..Default::default()
                }
                .insert(db)
                .await?;
                Ok(row.into())
            }

            async fn get<C: ConnectionTrait>(
                db: &C,
                owner: i64,
                id: i64,
            ) -> Result<Option<AttrOut>, DbErr> {
                let found = $model::Entity::find_by_id(id)
                    .filter($model::Column::UserId.eq(owner))
                    .one(db)
                    .await?;
                Ok(found.map(AttrOut::from))
            }

            async fn rename<C: ConnectionTrait>(
                db: &C,
                owner: i64,
                id: i64,
                title: String,
            ) -> Result<Option<AttrOut>, DbErr> {
                let found = $model::Entity::find_by_id(id)
                    .filter($model::Column::UserId.eq(owner))
                    .one(db)
                    .await?;
                let Some(found) = found else {
                    return Ok(None);
                };
                let mut am = found.into_active_model();
                am.title = Set(title);
                Ok(Some(am.update(db).await?.into()))
            }

            async fn delete<C: ConnectionTrait>(db: &C, owner: i64, id: i64) -> Result<bool, DbErr> {
                let res = $model::Entity::delete_many()
                    .filter($model::Column::Id.eq(id))
                    .filter($model::Column::UserId.eq(owner))
                    .exec(db)
                    .await?;
                Ok(res.rows_affected > 0)
            }

            async fn owned_ids<C: ConnectionTrait>(
                db: &C,
                owner: i64,
                ids: &[i64],
            ) -> Result<Vec<i64>, DbErr> {
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                $model::Entity::find()
                    .select_only()
                    .column($model::Column::Id)
                    .filter($model::Column::UserId.eq(owner))
                    .filter($model::Column::Id.is_in(ids.iter().copied()))
                    .into_tuple::<i64>()
                    .all(db)
                    .await
            }

            async fn links<C: ConnectionTrait>(
                db: &C,
                recipe_ids: &[i64],
            ) -> Result<Vec<(i64, AttrOut)>, DbErr> {
                if recipe_ids.is_empty() {
                    return Ok(Vec::new());
                }
                let rows = $link::Entity::find()
                    .filter($link::Column::RecipeId.is_in(recipe_ids.iter().copied()))
                    .find_also_related($model::Entity)
                    .order_by_asc($link::Column::$link_col)
                    .all(db)
                    .await?;
                Ok(rows
                    .into_iter()
                    .filter_map(|(link, row)| row.map(|r| (link.recipe_id, AttrOut::from(r))))
                    .collect())
            }

            async fn set_links<C: ConnectionTrait>(
                db: &C,
                recipe_id: i64,
                ids: &[i64],
            ) -> Result<(), DbErr> {
                $link::Entity::delete_many()
                    .filter($link::Column::RecipeId.eq(recipe_id))
                    .exec(db)
                    .await?;
                if ids.is_empty() {
                    return Ok(());
                }
                let rows = ids.iter().map(|&id| $link::ActiveModel {
                    recipe_id: Set(recipe_id),
                    $link_field: Set(id),
                });
                $link::Entity::insert_many(rows)
                    .exec_without_returning(db)
                    .await?;
                Ok(())
            }

            fn recipes_linked_to(ids: &[i64]) -> SelectStatement {
                Query::select()
                    .column($link::Column::RecipeId)
                    .from($link::Entity)
                    .and_where($link::Column::$link_col.is_in(ids.iter().copied()))
                    .to_owned()
            }
        }
    };
}

attr_kind!(Tags, "tags", tag, recipe_tag, TagId, tag_id);
attr_kind!(Ingredients, "ingredients", ingredient, recipe_ingredient, IngredientId, ingredient_id);
