use axum::{
    routing::{get, post},
    Router,
};
use cookbook_core::views::method_not_allowed;
use cookbook_core::AppState;

use crate::kinds::{Ingredients, Tags};
use crate::views::{attr, recipe};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(attr::list::<Tags>).post(attr::create::<Tags>))
        .route(
            "/tags/{id}",
            get(attr::retrieve::<Tags>)
                .put(attr::update::<Tags>)
                .patch(attr::partial_update::<Tags>)
                .delete(attr::destroy::<Tags>),
        )
        .route(
            "/ingredients",
            get(attr::list::<Ingredients>).post(attr::create::<Ingredients>),
        )
        .route(
            "/ingredients/{id}",
            get(attr::retrieve::<Ingredients>)
                .put(attr::update::<Ingredients>)
                .patch(attr::partial_update::<Ingredients>)
                .delete(attr::destroy::<Ingredients>),
        )
        .route("/recipes", get(recipe::list).post(recipe::create))
        .route(
            "/recipes/{id}",
            get(recipe::retrieve)
                .put(recipe::update)
                .patch(recipe::partial_update)
                .delete(recipe::destroy),
        )
        .route("/recipes/{id}/upload-image", post(recipe::upload_image))
        .method_not_allowed_fallback(method_not_allowed)
}
