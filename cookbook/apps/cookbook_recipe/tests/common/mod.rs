#![allow(dead_code)]

use cookbook_core::models::{ingredient, recipe, recipe_ingredient, recipe_tag, tag, user};
use cookbook_core::testing::{TestApp, TestClient};
use cookbook_recipe::urls::router;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

pub struct Ctx {
    pub app: TestApp,
    pub client: TestClient,
    pub user: user::Model,
    pub token: String,
}

pub async fn setup() -> Ctx {
    let app = TestApp::new().await;
    let client = app.client(router());
    let user = app.create_user("test@company.com", "testpass").await;
    let token = app.token_for(&user).await;
    Ctx {
        app,
        client,
        user,
        token,
    }
}

impl Ctx {
    pub fn token(&self) -> Option<&str> {
        Some(&self.token)
    }

    pub async fn other_user(&self) -> user::Model {
        self.app.create_user("other@company.com", "password123").await
    }

    pub async fn tag(&self, owner: &user::Model, title: &str) -> tag::Model {
        tag::ActiveModel {
            title: Set(title.to_owned()),
            user_id: Set(owner.id),
            ..Default::default()
        }
        .insert(&self.app.state.db)
        .await
        .unwrap()
    }

    pub async fn ingredient(&self, owner: &user::Model, title: &str) -> ingredient::Model {
        ingredient::ActiveModel {
            title: Set(title.to_owned()),
            user_id: Set(owner.id),
            ..Default::default()
        }
        .insert(&self.app.state.db)
        .await
        .unwrap()
    }

    pub async fn recipe(&self, owner: &user::Model, title: &str) -> recipe::Model {
        recipe::ActiveModel {
            title: Set(title.to_owned()),
            time_minutes: Set(10),
            price: Set(Decimal::new(500, 2)),
            link: Set(String::new()),
            image: Set(None),
            user_id: Set(owner.id),
            ..Default::default()
        }
        .insert(&self.app.state.db)
        .await
        .unwrap()
    }

    pub async fn link_tag(&self, r: &recipe::Model, t: &tag::Model) {
        recipe_tag::Entity::insert(recipe_tag::ActiveModel {
            recipe_id: Set(r.id),
            tag_id: Set(t.id),
        })
        .exec_without_returning(&self.app.state.db)
        .await
        .unwrap();
    }

    pub async fn link_ingredient(&self, r: &recipe::Model, i: &ingredient::Model) {
        recipe_ingredient::Entity::insert(recipe_ingredient::ActiveModel {
            recipe_id: Set(r.id),
            ingredient_id: Set(i.id),
        })
        .exec_without_returning(&self.app.state.db)
        .await
        .unwrap();
    }
}
