use std::sync::Arc;
use std::time::Duration;

use auth::Authenticator;
use auth::TokenPolicy;
use bookstore_api::config::Config;
use bookstore_api::domain::auth::service::AuthService;
use bookstore_api::inbound::http::router::create_router;
use bookstore_api::outbound::email::EmailDispatcher;
use bookstore_api::outbound::email::LogEmailSender;
use bookstore_api::outbound::federation::GoogleIdentityProvider;
use bookstore_api::outbound::repositories::PostgresTokenRepository;
use bookstore_api::outbound::repositories::PostgresUserRepository;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookstore_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "bookstore-api",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;
    config.validate()?;

    tracing::info!(
        environment = %config.environment,
        http_port = config.server.http_port,
        secure_cookies = config.cookie.secure,
        access_token_ttl_minutes = config.jwt.access_token_ttl_minutes,
        refresh_token_ttl_days = config.jwt.refresh_token_ttl_days,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_seconds))
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let authenticator = Arc::new(Authenticator::with_policy(
        config.jwt.secret.as_bytes(),
        TokenPolicy {
            access_token_ttl: chrono::Duration::minutes(config.jwt.access_token_ttl_minutes),
            refresh_token_ttl: chrono::Duration::days(config.jwt.refresh_token_ttl_days),
        },
    ));
    let user_repository = Arc::new(PostgresUserRepository::new(pg_pool.clone()));
    let token_repository = Arc::new(PostgresTokenRepository::new(pg_pool));
    let identity_provider = Arc::new(GoogleIdentityProvider::new(&config.oauth.google)?);

    let (email_dispatcher, email_worker) = EmailDispatcher::spawn(
        Arc::new(LogEmailSender::new(config.email.sender.clone())),
        (&config.email).into(),
    );

    let auth_service = Arc::new(AuthService::new(
        user_repository,
        token_repository,
        identity_provider,
        Arc::new(email_dispatcher),
        authenticator,
    ));

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(
        auth_service,
        config.cookie.secure,
        config.environment.clone(),
    );

    axum::serve(http_listener, http_application)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Http server stopped");

    // The router owned the last dispatcher handle, so the worker now drains
    // what is left in the queue and exits.
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    match tokio::time::timeout(grace, email_worker).await {
        Ok(Ok(())) => tracing::info!("Email worker drained"),
        Ok(Err(e)) => tracing::error!(error = %e, "Email worker failed"),
        Err(_) => tracing::warn!(
            grace_seconds = config.server.shutdown_grace_seconds,
            "Email worker still busy, abandoning queued messages"
        ),
    }

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
