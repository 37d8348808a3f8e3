mod common;

use axum::http::StatusCode;
use cookbook_core::models::{recipe, recipe_tag};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

use common::setup;

const RECIPES_URL: &str = "/recipes";

fn detail_url(id: i64) -> String {
    format!("/recipes/{id}")
}

fn ids(body: &serde_json::Value) -> Vec<i64> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect()
}

// ---------- public ----------

#[tokio::test]
async fn auth_required() {
    let ctx = setup().await;
    let resp = ctx.client.get(RECIPES_URL, None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = ctx.client.post(RECIPES_URL, None, json!({})).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

// ---------- private ----------

#[tokio::test]
async fn retrieve_recipes_newest_first() {
    let ctx = setup().await;
    let first = ctx.recipe(&ctx.user, "Sample recipe").await;
    let second = ctx.recipe(&ctx.user, "Another recipe").await;

    let resp = ctx.client.get(RECIPES_URL, ctx.token()).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(ids(&resp.body), [second.id, first.id]);
    assert_eq!(resp.body[0]["price"], "5.00");
    assert_eq!(resp.body[0]["time_minutes"], 10);
    assert_eq!(resp.body[0]["tags"], json!([]));
}

#[tokio::test]
async fn recipes_limited_to_user() {
    let ctx = setup().await;
    let other = ctx.other_user().await;
    ctx.recipe(&other, "Not mine").await;
    let mine = ctx.recipe(&ctx.user, "Mine").await;

    let resp = ctx.client.get(RECIPES_URL, ctx.token()).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(ids(&resp.body), [mine.id]);
}

#[tokio::test]
async fn view_recipe_detail() {
    let ctx = setup().await;
    let r = ctx.recipe(&ctx.user, "Steak").await;
    let t = ctx.tag(&ctx.user, "Dinner").await;
    let i = ctx.ingredient(&ctx.user, "Beef").await;
    ctx.link_tag(&r, &t).await;
    ctx.link_ingredient(&r, &i).await;

    let resp = ctx.client.get(&detail_url(r.id), ctx.token()).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        resp.body,
        json!({
            "id": r.id,
            "title": "Steak",
            "ingredients": [{ "id": i.id, "title": "Beef" }],
            "tags": [{ "id": t.id, "title": "Dinner" }],
            "time_minutes": 10,
            "price": "5.00",
            "link": "",
            "image": null,
        })
    );
}

#[tokio::test]
async fn create_basic_recipe() {
    let app = cookbook_core::testing::TestApp::new().await;
    let client = app.client(cookbook_recipe::urls::router());
    let user = app.create_user("testuser@company.com", "Test1234").await;
    let token = app.token_for(&user).await;

    let resp = client
        .post(
            RECIPES_URL,
            Some(&token),
            json!({ "title": "Chocolate Cake", "time_minutes": 30, "price": 5.00 }),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let id = resp.body["id"].as_i64().unwrap();
    let stored = recipe::Entity::find_by_id(id)
        .one(&app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.title, "Chocolate Cake");
    assert_eq!(stored.time_minutes, 30);
    assert_eq!(stored.price, Decimal::new(500, 2));
    assert_eq!(stored.user_id, user.id);
    assert_eq!(resp.body["price"], "5.00");
}

#[tokio::test]
async fn create_recipe_with_tags_and_ingredients() {
    let ctx = setup().await;
    let vegan = ctx.tag(&ctx.user, "Vegan").await;
    let dessert = ctx.tag(&ctx.user, "Dessert").await;
    let prawns = ctx.ingredient(&ctx.user, "Prawns").await;
    let ginger = ctx.ingredient(&ctx.user, "Ginger").await;

    let resp = ctx
        .client
        .post(
            RECIPES_URL,
            ctx.token(),
            json!({
                "title": "Thai prawn red curry",
                "time_minutes": 20,
                "price": "7.00",
                "tags": [vegan.id, dessert.id],
                "ingredients": [prawns.id, ginger.id],
            }),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let mut tags: Vec<i64> = serde_json::from_value(resp.body["tags"].clone()).unwrap();
    tags.sort_unstable();
    let mut expected = vec![vegan.id, dessert.id];
    expected.sort_unstable();
    assert_eq!(tags, expected);
    assert_eq!(resp.body["ingredients"].as_array().unwrap().len(), 2);

    let id = resp.body["id"].as_i64().unwrap();
    let linked = recipe_tag::Entity::find()
        .filter(recipe_tag::Column::RecipeId.eq(id))
        .count(&ctx.app.state.db)
        .await
        .unwrap();
    assert_eq!(linked, 2);
}

#[tokio::test]
async fn create_recipe_missing_fields() {
    let ctx = setup().await;
    let resp = ctx
        .client
        .post(RECIPES_URL, ctx.token(), json!({ "title": "Soup" }))
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.body["time_minutes"].is_array());
    assert!(resp.body["price"].is_array());
    let count = recipe::Entity::find().count(&ctx.app.state.db).await.unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn create_recipe_wrong_type_is_a_field_error() {
    let ctx = setup().await;
    let resp = ctx
        .client
        .post(
            RECIPES_URL,
            ctx.token(),
            json!({ "title": "Soup", "time_minutes": "abc", "price": "5.00" }),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.body["time_minutes"].is_array(), "body: {}", resp.body);
    assert!(resp.body.get("detail").is_none());
}

#[tokio::test]
async fn create_recipe_price_out_of_shape() {
    let ctx = setup().await;
    let resp = ctx
        .client
        .post(
            RECIPES_URL,
            ctx.token(),
            json!({ "title": "Gold leaf cake", "time_minutes": 5, "price": "1234.56" }),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.body["price"].is_array());
}

#[tokio::test]
async fn create_recipe_with_foreign_tag_is_rejected() {
    let ctx = setup().await;
    let other = ctx.other_user().await;
    let theirs = ctx.tag(&other, "Secret").await;

    let resp = ctx
        .client
        .post(
            RECIPES_URL,
            ctx.token(),
            json!({ "title": "Borrowed", "time_minutes": 5, "price": 1, "tags": [theirs.id] }),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.body["tags"],
        json!([format!("Invalid pk \"{}\" - object does not exist.", theirs.id)])
    );
    let count = recipe::Entity::find().count(&ctx.app.state.db).await.unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn filter_recipes_by_tags() {
    let ctx = setup().await;
    let curry = ctx.recipe(&ctx.user, "Thai vegetable curry").await;
    let tahini = ctx.recipe(&ctx.user, "Aubergine with tahini").await;
    let fish = ctx.recipe(&ctx.user, "Fish and chips").await;
    let vegan = ctx.tag(&ctx.user, "Vegan").await;
    let vegetarian = ctx.tag(&ctx.user, "Vegetarian").await;
    ctx.link_tag(&curry, &vegan).await;
    ctx.link_tag(&tahini, &vegetarian).await;

    let url = format!("{RECIPES_URL}?tags={},{}", vegan.id, vegetarian.id);
    let resp = ctx.client.get(&url, ctx.token()).await;

    assert_eq!(resp.status, StatusCode::OK);
    let found = ids(&resp.body);
    assert!(found.contains(&curry.id));
    assert!(found.contains(&tahini.id));
    assert!(!found.contains(&fish.id));
}

#[tokio::test]
async fn filter_recipes_by_ingredients() {
    let ctx = setup().await;
    let beans = ctx.recipe(&ctx.user, "Posh beans on toast").await;
    let chicken = ctx.recipe(&ctx.user, "Chicken cacciatore").await;
    let steak = ctx.recipe(&ctx.user, "Steak and mushrooms").await;
    let feta = ctx.ingredient(&ctx.user, "Feta cheese").await;
    let thighs = ctx.ingredient(&ctx.user, "Chicken").await;
    ctx.link_ingredient(&beans, &feta).await;
    ctx.link_ingredient(&chicken, &thighs).await;

    let url = format!("{RECIPES_URL}?ingredients={},{}", feta.id, thighs.id);
    let resp = ctx.client.get(&url, ctx.token()).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(ids(&resp.body), [chicken.id, beans.id]);
    assert!(!ids(&resp.body).contains(&steak.id));
}

#[tokio::test]
async fn tag_and_ingredient_filters_combine() {
    let ctx = setup().await;
    let both = ctx.recipe(&ctx.user, "Vegan feta salad").await;
    let tag_only = ctx.recipe(&ctx.user, "Vegan soup").await;
    let vegan = ctx.tag(&ctx.user, "Vegan").await;
    let feta = ctx.ingredient(&ctx.user, "Feta").await;
    ctx.link_tag(&both, &vegan).await;
    ctx.link_tag(&tag_only, &vegan).await;
    ctx.link_ingredient(&both, &feta).await;

    let url = format!("{RECIPES_URL}?tags={}&ingredients={}", vegan.id, feta.id);
    let resp = ctx.client.get(&url, ctx.token()).await;

    assert_eq!(ids(&resp.body), [both.id]);
}

#[tokio::test]
async fn recipe_filter_rejects_non_numeric_ids() {
    let ctx = setup().await;
    let resp = ctx.client.get("/recipes?tags=1,abc", ctx.token()).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.body["tags"].is_array());
}

#[tokio::test]
async fn partial_update_recipe() {
    let ctx = setup().await;
    let r = ctx.recipe(&ctx.user, "Chicken tikka").await;
    let spicy = ctx.tag(&ctx.user, "Spicy").await;
    ctx.link_tag(&r, &spicy).await;
    let curry = ctx.tag(&ctx.user, "Curry").await;

    let resp = ctx
        .client
        .patch(
            &detail_url(r.id),
            ctx.token(),
            json!({ "title": "Chicken tikka masala", "tags": [curry.id] }),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["title"], "Chicken tikka masala");
    assert_eq!(resp.body["tags"], json!([curry.id]));
    // untouched fields keep their values
    assert_eq!(resp.body["time_minutes"], 10);
    assert_eq!(resp.body["price"], "5.00");
}

#[tokio::test]
async fn patch_without_tags_keeps_links() {
    let ctx = setup().await;
    let r = ctx.recipe(&ctx.user, "Ramen").await;
    let t = ctx.tag(&ctx.user, "Noodles").await;
    ctx.link_tag(&r, &t).await;

    let resp = ctx
        .client
        .patch(&detail_url(r.id), ctx.token(), json!({ "time_minutes": 45 }))
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["tags"], json!([t.id]));
    assert_eq!(resp.body["time_minutes"], 45);
}

#[tokio::test]
async fn full_update_recipe() {
    let ctx = setup().await;
    let r = ctx.recipe(&ctx.user, "Spaghetti carbonara").await;
    let t = ctx.tag(&ctx.user, "Pasta").await;
    ctx.link_tag(&r, &t).await;

    let resp = ctx
        .client
        .put(
            &detail_url(r.id),
            ctx.token(),
            json!({ "title": "Spaghetti", "time_minutes": 25, "price": 5.00, "tags": [] }),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let stored = recipe::Entity::find_by_id(r.id)
        .one(&ctx.app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.title, "Spaghetti");
    assert_eq!(stored.time_minutes, 25);
    assert_eq!(resp.body["tags"], json!([]));

    let resp = ctx
        .client
        .put(&detail_url(r.id), ctx.token(), json!({ "title": "Only title" }))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn other_users_recipe_is_untouchable() {
    let ctx = setup().await;
    let other = ctx.other_user().await;
    let theirs = ctx.recipe(&other, "Family secret").await;
    let url = detail_url(theirs.id);

    assert_eq!(ctx.client.get(&url, ctx.token()).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        ctx.client
            .patch(&url, ctx.token(), json!({ "title": "Leaked" }))
            .await
            .status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(ctx.client.delete(&url, ctx.token()).await.status, StatusCode::NOT_FOUND);

    let stored = recipe::Entity::find_by_id(theirs.id)
        .one(&ctx.app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.title, "Family secret");
}

#[tokio::test]
async fn delete_recipe() {
    let ctx = setup().await;
    let r = ctx.recipe(&ctx.user, "Toast").await;
    let t = ctx.tag(&ctx.user, "Breakfast").await;
    ctx.link_tag(&r, &t).await;

    let resp = ctx.client.delete(&detail_url(r.id), ctx.token()).await;

    assert_eq!(resp.status, StatusCode::NO_CONTENT);
    let left = recipe::Entity::find().count(&ctx.app.state.db).await.unwrap();
    assert_eq!(left, 0);
    let links = recipe_tag::Entity::find().count(&ctx.app.state.db).await.unwrap();
    assert_eq!(links, 0);
}

#[tokio::test]
async fn unsupported_method_is_json() {
    let ctx = setup().await;
    let resp = ctx.client.delete(RECIPES_URL, ctx.token()).await;
    assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.body["detail"], "Method \"DELETE\" not allowed.");
}
