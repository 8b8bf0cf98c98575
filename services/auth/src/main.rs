use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use auth::{
    AppState,
    config::{BootstrapAdminConfig, ServerConfig},
    database::run_migrations,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::UserRepository,
    routes,
    token::{TokenCodec, TokenConfig},
};
use common::database::{DatabaseConfig, health_check, init_pool};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting authentication service");

    // Load configuration before touching the database
    let server_config = ServerConfig::from_env()?;
    let token_config = TokenConfig::from_env()?;
    let codec = Arc::new(TokenCodec::new(&token_config)?);
    info!(
        "Session tokens expire after {} seconds",
        token_config.token_expiry
    );

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    let user_repository = Arc::new(UserRepository::new(pool));
    let rate_limiter = RateLimiter::new(RateLimiterConfig::from_env()?);
    info!(
        "Login throttled after {} attempts per {} seconds",
        rate_limiter.config().max_attempts,
        rate_limiter.config().window_seconds
    );
    // Sweep throttling entries that are neither banned nor inside their window
    let sweeper = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            sweeper.purge_expired().await;
        }
    });

    let app_state = AppState::new(user_repository, codec, rate_limiter);

    match BootstrapAdminConfig::from_env() {
        Some(admin) => {
            match app_state
                .accounts
                .bootstrap_admin(&admin.phone, &admin.password, &admin.name)
                .await?
            {
                Some(identity) => info!("Seeded administrator {}", identity.id),
                None => info!("Administrator phone already registered, skipping seed"),
            }
        }
        None => warn!("ADMIN_PHONE/ADMIN_PASSWORD not set, no administrator seeded"),
    }

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&server_config.bind_address).await?;
    info!(
        "Authentication service listening on {}",
        server_config.bind_address
    );

    axum::serve(listener, app).await?;

    Ok(())
}
