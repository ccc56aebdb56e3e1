use rusty_library_loans::{
    adapters::{
        SystemClock,
        postgres::{PostgresInventoryLedger, PostgresLoanStore},
    },
    application::{catalog, loan::ServiceDependencies},
    config::Config,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rusty_library_loans=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Invalid configuration");
    tracing::info!(
        max_connections = config.max_connections,
        lock_timeout_ms = config.lock_timeout.as_millis() as u64,
        max_attempts = config.retry.max_attempts,
        date_policy = ?config.date_policy,
        "configuration loaded"
    );

    // Initialize database connection pool
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Initialize adapters
    let policy = config.date_policy.build();
    let inventory_ledger = Arc::new(PostgresInventoryLedger::new(
        pool.clone(),
        config.lock_timeout,
        config.retry,
    ));
    let loan_store = Arc::new(PostgresLoanStore::new(
        pool.clone(),
        policy,
        config.lock_timeout,
        config.retry,
    ));

    let deps = ServiceDependencies {
        inventory_ledger,
        loan_store,
        clock: Arc::new(SystemClock),
    };

    let books = catalog::list_books(&deps, "All")
        .await
        .expect("Failed to read catalog");
    let on_loan: u32 = books.iter().map(|book| book.stock.on_loan()).sum();

    tracing::info!(
        titles = books.len(),
        copies_on_loan = on_loan,
        "loan store ready"
    );
}
