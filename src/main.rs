use social_server::{AppState, config::Config, create_router};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Inizializza il tracing (RUST_LOG, default info)
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,social_server=debug".into()),
        )
        .init();

    // Carica la configurazione
    let config = Config::from_env()?;
    config.print_info();

    // Crea il pool di connessioni e applica le migrazioni.
    // Le transazioni di scrittura aprono con BEGIN IMMEDIATE: chi arriva secondo attende il lock
    let connect_options = SqliteConnectOptions::from_str(&config.database_url)?
        .busy_timeout(Duration::from_secs(config.acquire_timeout_secs));
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(connect_options)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready, migrations applied");

    // Crea lo stato e il router
    let state = Arc::new(
        AppState::new(pool, config.jwt_secret.clone()).with_demotion(config.demotion_target),
    );
    let app = create_router(state).layer(CorsLayer::permissive());

    // Avvia il server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
