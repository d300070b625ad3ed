pub mod contract_queries;
pub mod fetch_failure_queries;
pub mod ticker_queries;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS companies (
        ticker TEXT PRIMARY KEY,
        dividend_yield REAL,
        ex_dividend_date DATE,
        updated_at TIMESTAMP NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS options (
        contract_symbol TEXT PRIMARY KEY,
        ticker TEXT NOT NULL,
        expiration_date DATE NOT NULL,
        strike_price REAL NOT NULL,
        option_type TEXT NOT NULL CHECK (option_type IN ('call', 'put')),
        bid REAL,
        ask REAL,
        last_price REAL,
        volume INTEGER,
        open_interest INTEGER,
        implied_volatility REAL,
        delta REAL,
        gamma REAL,
        theta REAL,
        vega REAL,
        updated_at TIMESTAMP NOT NULL,
        FOREIGN KEY (ticker) REFERENCES companies(ticker) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_options_ticker ON options(ticker)",
    "CREATE INDEX IF NOT EXISTS idx_options_expiration_strike ON options(expiration_date, strike_price)",
    r#"
    CREATE TABLE IF NOT EXISTS ticker_fetch_failures (
        ticker TEXT PRIMARY KEY,
        failure_type TEXT NOT NULL,
        error_message TEXT,
        consecutive_failures INTEGER NOT NULL DEFAULT 1,
        last_attempt_at TIMESTAMP NOT NULL
    )
    "#,
];

/// Open (creating if needed) the SQLite store at `path` and apply the schema.
pub async fn connect(path: impl AsRef<Path>) -> Result<SqlitePool, sqlx::Error> {
    let path = path.as_ref();
    info!("🗄️ Opening options store at {}", path.display());

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(sqlx::Error::Io)?;
        }
    }

    // WAL lets dashboard readers see committed rows while the poller writes.
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

/// Private in-memory store on a single long-lived connection.
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
