pub mod error;
pub mod extract;
pub mod models;
pub mod password;
pub mod serializers;
pub mod settings;
pub mod tokens;
pub mod urls;
pub mod users;
pub mod views;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use std::sync::Arc;

use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use tracing::info;

pub use error::{AppError, FieldErrors};
pub use extract::{CurrentUser, RecordId, ValidJson};
pub use settings::Settings;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, settings: Settings) -> Self {
        Self {
            db,
            settings: Arc::new(settings),
        }
    }
}

/// Open the pool described by `settings.database_url`.
pub async fn connect(settings: &Settings) -> Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(settings.database_url.clone());
    opts.sqlx_logging(settings.log_sql);
    let db = Database::connect(opts).await?;
    info!(backend = ?db.get_database_backend(), "database connected");
    Ok(db)
}

/// Ensure DB schema is up-to-date (calls migration crate).
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<()> {
    use migration::{Migrator, MigratorTrait};
    Migrator::up(db, None).await?;
    Ok(())
}
