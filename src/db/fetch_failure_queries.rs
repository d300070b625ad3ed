use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TickerFetchFailure {
    pub ticker: String,
    pub failure_type: String,
    pub error_message: Option<String>,
    pub consecutive_failures: i64,
    pub last_attempt_at: DateTime<Utc>,
}

/// Record a failed poll for a ticker. Repeated failures bump the streak counter.
///
/// This is a report only; the scheduler never skips a symbol because of it.
pub async fn record_fetch_failure(
    pool: &SqlitePool,
    ticker: &str,
    failure_type: &str,
    error_message: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO ticker_fetch_failures
         (ticker, failure_type, error_message, consecutive_failures, last_attempt_at)
         VALUES (?1, ?2, ?3, 1, ?4)
         ON CONFLICT(ticker) DO UPDATE SET
           failure_type = excluded.failure_type,
           error_message = excluded.error_message,
           consecutive_failures = ticker_fetch_failures.consecutive_failures + 1,
           last_attempt_at = excluded.last_attempt_at",
    )
    .bind(ticker)
    .bind(failure_type)
    .bind(error_message)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Clear the failure record for a ticker (called after a successful poll)
pub async fn clear_fetch_failure(pool: &SqlitePool, ticker: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM ticker_fetch_failures WHERE ticker = ?1")
        .bind(ticker)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn list_fetch_failures(pool: &SqlitePool) -> Result<Vec<TickerFetchFailure>, sqlx::Error> {
    sqlx::query_as::<_, TickerFetchFailure>(
        "SELECT ticker, failure_type, error_message, consecutive_failures, last_attempt_at
         FROM ticker_fetch_failures
         ORDER BY last_attempt_at DESC, ticker ASC",
    )
    .fetch_all(pool)
    .await
}
