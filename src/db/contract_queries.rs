use chrono::{DateTime, Utc};
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::error;

use crate::models::{ContractFilter, ContractSnapshot};

const UPSERT_CONTRACT: &str = r#"
    INSERT INTO options (
        contract_symbol, ticker, expiration_date, strike_price, option_type,
        bid, ask, last_price, volume, open_interest,
        implied_volatility, delta, gamma, theta, vega, updated_at
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
    ON CONFLICT(contract_symbol) DO UPDATE SET
        ticker = excluded.ticker,
        expiration_date = excluded.expiration_date,
        strike_price = excluded.strike_price,
        option_type = excluded.option_type,
        bid = excluded.bid,
        ask = excluded.ask,
        last_price = excluded.last_price,
        volume = excluded.volume,
        open_interest = excluded.open_interest,
        implied_volatility = excluded.implied_volatility,
        delta = excluded.delta,
        gamma = excluded.gamma,
        theta = excluded.theta,
        vega = excluded.vega,
        updated_at = excluded.updated_at
"#;

const SELECT_COLUMNS: &str = "SELECT contract_symbol, ticker, expiration_date, strike_price, option_type, \
     bid, ask, last_price, volume, open_interest, \
     implied_volatility, delta, gamma, theta, vega, updated_at \
     FROM options";

// Every column is overwritten, NULLs included: the newest sighting wins outright.
fn upsert_query(c: &ContractSnapshot, now: DateTime<Utc>) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    sqlx::query(UPSERT_CONTRACT)
        .bind(c.contract_symbol.as_str())
        .bind(c.ticker.to_uppercase())
        .bind(c.expiration_date)
        .bind(c.strike_price)
        .bind(c.kind.as_str())
        .bind(c.bid)
        .bind(c.ask)
        .bind(c.last_price)
        .bind(c.volume)
        .bind(c.open_interest)
        .bind(c.implied_volatility)
        .bind(c.delta)
        .bind(c.gamma)
        .bind(c.theta)
        .bind(c.vega)
        .bind(now)
}

/// Insert or fully replace the row keyed by `contract_symbol`.
pub async fn upsert_contract(pool: &SqlitePool, contract: &ContractSnapshot) -> Result<(), sqlx::Error> {
    upsert_query(contract, Utc::now()).execute(pool).await?;
    Ok(())
}

/// Upsert a whole fetch batch in one transaction; readers see all of it or none.
pub async fn upsert_contracts(
    pool: &SqlitePool,
    ticker: &str,
    contracts: &[ContractSnapshot],
) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await.map_err(|e| {
        error!("Failed to begin transaction for ticker {}: {}", ticker, e);
        e
    })?;

    let now = Utc::now();
    for (i, c) in contracts.iter().enumerate() {
        if let Err(e) = upsert_query(c, now).execute(&mut *tx).await {
            error!(
                "Failed to upsert contract {} for ticker {} ({}): {}",
                i, ticker, c.contract_symbol, e
            );
            return Err(e);
        }
    }

    tx.commit().await.map_err(|e| {
        error!("Failed to commit transaction for ticker {}: {}", ticker, e);
        e
    })?;

    Ok(contracts.len())
}

/// Contracts matching every set field of `filter`, ordered by expiration then strike.
pub async fn query_contracts(
    pool: &SqlitePool,
    filter: &ContractFilter,
) -> Result<Vec<ContractSnapshot>, sqlx::Error> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
    qb.push(" WHERE 1 = 1");

    if let Some(ticker) = filter.ticker.as_deref().filter(|t| !t.trim().is_empty()) {
        qb.push(" AND ticker = ").push_bind(ticker.trim().to_uppercase());
    }
    if let Some(from) = filter.expiration_from {
        qb.push(" AND expiration_date >= ").push_bind(from);
    }
    if let Some(to) = filter.expiration_to {
        qb.push(" AND expiration_date <= ").push_bind(to);
    }
    if let Some(min) = filter.bid_min {
        qb.push(" AND bid >= ").push_bind(min);
    }
    if let Some(max) = filter.bid_max {
        qb.push(" AND bid <= ").push_bind(max);
    }
    if let Some(kind) = filter.kind {
        qb.push(" AND option_type = ").push_bind(kind.as_str());
    }

    qb.push(" ORDER BY expiration_date ASC, strike_price ASC, contract_symbol ASC");

    qb.build_query_as::<ContractSnapshot>().fetch_all(pool).await
}

pub async fn fetch_contract(
    pool: &SqlitePool,
    contract_symbol: &str,
) -> Result<Option<ContractSnapshot>, sqlx::Error> {
    sqlx::query_as::<_, ContractSnapshot>(&format!("{} WHERE contract_symbol = ?1", SELECT_COLUMNS))
        .bind(contract_symbol)
        .fetch_optional(pool)
        .await
}

pub async fn count_contracts(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM options")
        .fetch_one(pool)
        .await
}
