mod common;

use std::io::Cursor;

use axum::http::StatusCode;
use cookbook_core::models::recipe;
use image::{DynamicImage, ImageFormat};
use sea_orm::EntityTrait;

use common::setup;

fn upload_url(id: i64) -> String {
    format!("/recipes/{id}/upload-image")
}

fn png_bytes() -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::new_rgb8(10, 10)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

#[tokio::test]
async fn upload_image_to_recipe() {
    let ctx = setup().await;
    let r = ctx.recipe(&ctx.user, "Sample recipe").await;

    let resp = ctx
        .client
        .upload(&upload_url(r.id), ctx.token(), "image", "photo.PNG", &png_bytes())
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["id"], r.id);
    let url = resp.body["image"].as_str().unwrap();
    assert!(url.starts_with("/media/uploads/recipe/"));
    assert!(url.ends_with(".png"));

    let stored = recipe::Entity::find_by_id(r.id)
        .one(&ctx.app.state.db)
        .await
        .unwrap()
        .unwrap();
    let path = stored.image.expect("image path saved");
    assert!(ctx.app.state.settings.media_root.join(&path).exists());

    // the detail view exposes the same URL
    let detail = ctx.client.get(&format!("/recipes/{}", r.id), ctx.token()).await;
    assert_eq!(detail.body["image"], url);
}

#[tokio::test]
async fn upload_keeps_only_image_extensions() {
    let ctx = setup().await;
    let r = ctx.recipe(&ctx.user, "Sample recipe").await;

    let resp = ctx
        .client
        .upload(&upload_url(r.id), ctx.token(), "image", "x.html", &png_bytes())
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let url = resp.body["image"].as_str().unwrap();
    assert!(url.ends_with(".png"), "stored as {url}");

    let stored = recipe::Entity::find_by_id(r.id)
        .one(&ctx.app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.image.unwrap().ends_with(".png"));
}

#[tokio::test]
async fn upload_image_bad_request() {
    let ctx = setup().await;
    let r = ctx.recipe(&ctx.user, "Sample recipe").await;

    let resp = ctx
        .client
        .upload(&upload_url(r.id), ctx.token(), "image", "notimage.png", b"notimage")
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.body["image"].is_array());
    let stored = recipe::Entity::find_by_id(r.id)
        .one(&ctx.app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.image.is_none());
}

#[tokio::test]
async fn upload_without_image_field() {
    let ctx = setup().await;
    let r = ctx.recipe(&ctx.user, "Sample recipe").await;

    let resp = ctx
        .client
        .upload(&upload_url(r.id), ctx.token(), "photo", "a.png", &png_bytes())
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["image"], serde_json::json!(["No file was submitted."]));
}

#[tokio::test]
async fn upload_to_other_users_recipe_is_not_found() {
    let ctx = setup().await;
    let other = ctx.other_user().await;
    let theirs = ctx.recipe(&other, "Not mine").await;

    let resp = ctx
        .client
        .upload(&upload_url(theirs.id), ctx.token(), "image", "a.png", &png_bytes())
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_requires_auth() {
    let ctx = setup().await;
    let r = ctx.recipe(&ctx.user, "Sample recipe").await;

    let resp = ctx
        .client
        .upload(&upload_url(r.id), None, "image", "a.png", &png_bytes())
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}
