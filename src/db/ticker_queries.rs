use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{DividendInfo, TickerRecord};

/// Insert or fully overwrite the row for `symbol`. `updated_at` is stamped here.
pub async fn upsert_ticker(
    pool: &SqlitePool,
    symbol: &str,
    info: &DividendInfo,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO companies (ticker, dividend_yield, ex_dividend_date, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(ticker) DO UPDATE SET
            dividend_yield = excluded.dividend_yield,
            ex_dividend_date = excluded.ex_dividend_date,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(symbol.to_uppercase())
    .bind(info.dividend_yield)
    .bind(info.ex_dividend_date)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Create a bare row for `symbol` if none exists; existing rows are left untouched.
pub async fn ensure_ticker(pool: &SqlitePool, symbol: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO companies (ticker, updated_at) VALUES (?1, ?2)
         ON CONFLICT(ticker) DO NOTHING",
    )
    .bind(symbol.to_uppercase())
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_ticker(pool: &SqlitePool, symbol: &str) -> Result<Option<TickerRecord>, sqlx::Error> {
    sqlx::query_as::<_, TickerRecord>(
        "SELECT ticker, dividend_yield, ex_dividend_date, updated_at
         FROM companies
         WHERE ticker = ?1",
    )
    .bind(symbol.to_uppercase())
    .fetch_optional(pool)
    .await
}

pub async fn fetch_all_tickers(pool: &SqlitePool) -> Result<Vec<TickerRecord>, sqlx::Error> {
    sqlx::query_as::<_, TickerRecord>(
        "SELECT ticker, dividend_yield, ex_dividend_date, updated_at
         FROM companies
         ORDER BY ticker ASC",
    )
    .fetch_all(pool)
    .await
}
