use std::sync::Arc;

use account_service::account::ports::AccountServicePort;
use account_service::account::ports::AccountStore;
use account_service::account::service::AccountService;
use account_service::config::Config;
use account_service::config::StorageBackend;
use account_service::inbound::http::router::create_router;
use account_service::outbound::credentials::Argon2PasswordHasher;
use account_service::outbound::credentials::ShortIdProvider;
use account_service::repositories::InMemoryAccountStore;
use account_service::repositories::PostgresAccountStore;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn account_service<S: AccountStore>(
    store: S,
    password_hasher: Arc<Argon2PasswordHasher>,
    id_generator: Arc<ShortIdProvider>,
) -> Arc<dyn AccountServicePort> {
    Arc::new(AccountService::new(
        Arc::new(store),
        password_hasher,
        id_generator,
    ))
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "account-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        storage = ?config.storage.backend,
        hashing_memory_kib = config.hashing.memory_kib,
        hashing_iterations = config.hashing.iterations,
        id_length = config.identifiers.id_length,
        "Configuration loaded"
    );

    let password_hasher = Arc::new(Argon2PasswordHasher::new(
        auth::PasswordHasher::with_work_factor(
            config.hashing.memory_kib,
            config.hashing.iterations,
            config.hashing.parallelism,
        )?,
    ));
    let id_generator = Arc::new(ShortIdProvider::new(auth::ShortIdGenerator::new(
        config.identifiers.id_length,
    )?));

    let account_service = match config.storage.backend {
        StorageBackend::Postgres => {
            let pg_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(&config.database.url)
                .await?;
            tracing::info!(
                max_connections = config.database.max_connections,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            account_service(
                PostgresAccountStore::new(pg_pool),
                password_hasher,
                id_generator,
            )
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on shutdown");
            account_service(InMemoryAccountStore::new(), password_hasher, id_generator)
        }
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    if let Err(e) = axum::serve(http_listener, create_router(account_service)).await {
        tracing::error!(error = %e, "Server error");
        return Err(e.into());
    }

    tracing::info!("Server exited successfully");

    Ok(())
}
