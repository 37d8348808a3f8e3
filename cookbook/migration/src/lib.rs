pub use sea_orm_migration::prelude::*;

mod m2026_10_18_000001_create_users;
mod m2026_10_18_000002_create_auth_tokens;
mod m2026_10_18_000003_create_tags_and_ingredients;
mod m2026_10_18_000004_create_recipes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        // older first: every later table carries a foreign key to `users`
        vec![
            Box::new(m2026_10_18_000001_create_users::Migration),
            Box::new(m2026_10_18_000002_create_auth_tokens::Migration),
            Box::new(m2026_10_18_000003_create_tags_and_ingredients::Migration),
            Box::new(m2026_10_18_000004_create_recipes::Migration),
        ]
    }
}
