//! Demo server: loads the project schema, migrates and seeds the store, mounts common and
//! entity routes under /api.

use axum::Router;
use scaffold_sdk::{common_routes_with_ready, entity_routes, AppState, Settings};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 1234;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scaffold_sdk=info")),
        )
        .init();

    let settings = Settings::from_env();
    tracing::info!(schema = %settings.schema_path.display(), db = %settings.database_path.display(), "starting");
    let state = AppState::bootstrap(&settings).await?;

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let app = Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .nest("/api", entity_routes(state));

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
