use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use clap::{Parser, Subcommand};
use cookbook_core::{connect, ensure_schema, users::create_superuser, AppState, Settings};
use dotenvy::dotenv;
use serde::Serialize;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gateway", about = "Recipe API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply migrations and serve the API (default).
    Serve,
    /// Apply pending migrations and exit.
    Migrate,
    /// Create an active staff + superuser account.
    CreateSuperuser {
        #[arg(long, env = "SUPERUSER_EMAIL")]
        email: String,
        #[arg(long, env = "SUPERUSER_PASSWORD")]
        password: String,
    },
}

#[derive(Serialize)]
struct Health {
    ok: bool,
    service: &'static str,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    let db = connect(&settings).await?;
    ensure_schema(&db).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => {
            info!("migrations applied");
        }
        Command::CreateSuperuser { email, password } => {
            let user = create_superuser(&db, &settings.password, &email, &password)
                .await
                .map_err(|e| anyhow::anyhow!("could not create superuser: {e}"))?;
            info!(user_id = user.id, email = %user.email, "superuser created");
        }
        Command::Serve => {
            let addr = settings.bind_addr;
            let state = AppState::new(db, settings);
            let app = routes(&state.settings).with_state(state);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("listening on http://{}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            info!("server stopped");
        }
    }
    Ok(())
}

fn routes(settings: &Settings) -> Router<AppState> {
    let media_mount = format!("/{}", settings.media_url.trim_matches('/'));
    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api/user", cookbook_core::urls::router())
        .nest("/api/recipe", cookbook_recipe::urls::router())
        .nest_service(&media_mount, ServeDir::new(&settings.media_root))
        .layer(DefaultBodyLimit::max(settings.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<Health>) {
    let ok = match state.db.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "database ping failed");
            false
        }
    };
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(Health {
            ok,
            service: "cookbook",
        }),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use cookbook_core::testing::TestApp;

    use super::routes;

    #[tokio::test]
    async fn health_reports_ok() {
        let app = TestApp::new().await;
        let client = app.client(routes(&app.state.settings));

        let resp = client.get("/healthz", None).await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["ok"], true);
    }

    #[tokio::test]
    async fn both_apps_are_mounted() {
        let app = TestApp::new().await;
        let client = app.client(routes(&app.state.settings));

        assert_eq!(client.get("/api/user/me", None).await.status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            client.get("/api/recipe/recipes", None).await.status,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(client.get("/nowhere", None).await.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn uploaded_files_are_served_under_media() {
        let app = TestApp::new().await;
        let dir = app.state.settings.media_root.join("uploads/recipe");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("x.txt"), "hello").unwrap();
        let client = app.client(routes(&app.state.settings));

        let resp = client.get("/media/uploads/recipe/x.txt", None).await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body, "hello");
    }
}
