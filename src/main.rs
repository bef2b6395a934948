use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::sync::watch;
use tracing::info;

use dentra::modules::notifications::QueueEmailDispatcher;
use dentra::modules::password_reset::PasswordResetService;
use dentra::router::init_router;
use dentra::shutdown::shutdown_signal;
use dentra::state::AppState;
use dentra::sweeper::spawn_expiry_sweeper;
use dentra_config::{CorsConfig, DatabaseConfig, JwtConfig, QueueConfig, ServerConfig};
use dentra_core::{Clock, SystemClock};
use dentra_db::{
    PgBlacklistStore, PgPasswordResetStore, PgTokenStore, PgUserRepository, init_db_pool,
};
use dentra_observability::{init_metrics, init_tracing};
use dentra_queue::RedisStreamPublisher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing("dentra")?;

    let database_config = DatabaseConfig::from_env()?;
    let jwt_config = JwtConfig::from_env()?;
    let queue_config = QueueConfig::from_env();
    let server_config = ServerConfig::from_env();
    let cors_config = CorsConfig::from_env();

    let pool = init_db_pool(&database_config)
        .await
        .context("Failed to connect to database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let reset_ttl = chrono::Duration::from_std(server_config.reset_token_ttl)
        .context("RESET_TOKEN_TTL_SECS is out of range")?;

    let users = Arc::new(PgUserRepository::new(pool.clone()));
    let reset_tokens = Arc::new(PgTokenStore::new(pool.clone(), clock.clone(), reset_ttl));
    let resets = Arc::new(PgPasswordResetStore::new(pool.clone(), clock.clone()));
    let blacklist = Arc::new(PgBlacklistStore::new(pool.clone(), clock));

    let publisher = RedisStreamPublisher::connect(&queue_config)
        .await
        .context("Failed to connect to queue")?;
    let dispatcher = Arc::new(QueueEmailDispatcher::new(Arc::new(publisher), &queue_config));

    let metrics_handle = init_metrics()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = spawn_expiry_sweeper(
        reset_tokens.clone(),
        blacklist.clone(),
        server_config.sweep_interval,
        shutdown_rx,
    );

    let password_reset =
        PasswordResetService::new(users.clone(), reset_tokens, resets, dispatcher.clone());

    let addr = server_config.addr.clone();
    let state = AppState::new(
        users,
        blacklist,
        dispatcher,
        password_reset,
        jwt_config,
        server_config,
        cors_config,
    );
    let app = init_router(state, metrics_handle);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(addr = %addr, "Server listening");
    info!("Scalar UI available at http://{}/scalar", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    sweeper.await?;

    info!("Server stopped");
    Ok(())
}
