use skybook_api::{app, AppState};
use skybook_store::app_config::{Config, StoreBackend};
use skybook_store::{
    DbClient, PostgresCustomerRepository, PostgresFlightRepository, PostgresOrderRepository, RedisClient,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skybook_api=debug,skybook_order=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("Starting Skybook API on port {}", config.server.port);

    let app_state = match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; nothing survives a restart");
            AppState::in_memory(&config.booking)
        }
        StoreBackend::Postgres => {
            let db = DbClient::new(&config.database).await?;
            if config.database.migrate {
                db.migrate().await?;
            }

            let redis = RedisClient::new(&config.redis.url).await?;
            redis.ping().await?;

            AppState::new(
                Arc::new(redis),
                Arc::new(PostgresFlightRepository::new(db.pool.clone())),
                Arc::new(PostgresCustomerRepository::new(db.pool.clone())),
                Arc::new(PostgresOrderRepository::new(db.pool.clone())),
                &config.booking,
            )
        }
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
