//! Butcher shop ledger server

use butcher_backend::{create_app, AppState, Config, Store};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "butcher_server=debug,butcher_backend=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting butcher shop ledger");
    tracing::info!("Environment: {}", config.environment);

    tracing::info!(path = %config.database.path, "Opening database...");
    let store = Store::connect(&config.database).await?;

    if store.seed(&config.bootstrap).await? {
        tracing::info!("Seeded admin account and starter catalogue");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(store, config);
    let app = create_app(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
