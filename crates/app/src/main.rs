mod auth;
mod dashboard;
mod directory;
mod error;
mod router;
mod seed;
mod telemetry;

use std::net::SocketAddr;

use chrono::Utc;
use tracing::info;

use alumni_portal_storage::Database;
use alumni_portal_util::{load_env_file, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;

    let guard = auth::SessionGuard::new(config.session_secret.as_bytes());
    if config.environment.is_development() {
        if let Some(token) = seed::seed_development_data(&database, &guard, Utc::now()).await? {
            info!(stage = "seed", user_id = seed::DEMO_USER_ID, %token, "demo session issued");
        }
    }

    let state = router::AppState::new(metrics, database, guard, config.dashboard_limit);

    let addr: SocketAddr = config.bind_addr;
    info!(stage = "app", %addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
