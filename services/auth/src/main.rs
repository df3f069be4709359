use std::sync::Arc;

use anyhow::Result;
use common::{database, error::DatabaseError};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use auth::{
    AppState,
    config::{AuthConfig, StorageBackend},
    hashing::{Argon2Params, CredentialHasher},
    repositories::{
        MemoryStore, ResetTokenRepository, ResetTokenStore, TodoRepository, TodoStore,
        UserRepository, UserStore,
    },
    reset::LogNotifier,
    routes,
    sweeper::Sweeper,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting authentication service");

    let config = AuthConfig::from_env()?;

    let (users, tokens, todos): (
        Arc<dyn UserStore>,
        Arc<dyn ResetTokenStore>,
        Arc<dyn TodoStore>,
    ) = match config.storage_backend {
        StorageBackend::Postgres => {
            let db_config = database::DatabaseConfig::from_env()?;
            let pool = database::init_pool(&db_config).await?;

            // Check database connectivity
            if database::health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            info!("Database migrations applied");

            (
                Arc::new(UserRepository::new(pool.clone())),
                Arc::new(ResetTokenRepository::new(pool.clone())),
                Arc::new(TodoRepository::new(pool)),
            )
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on shutdown");
            let store = MemoryStore::new();
            (
                Arc::new(store.clone()),
                Arc::new(store.clone()),
                Arc::new(store),
            )
        }
    };

    let hasher = CredentialHasher::new(Argon2Params::default())?;
    let state = AppState::new(&config, users, tokens, todos, hasher, Arc::new(LogNotifier));

    let _scheduler = Sweeper::from_state(&state)
        .start(&config.sweep_schedule)
        .await?;

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("Authentication service listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
