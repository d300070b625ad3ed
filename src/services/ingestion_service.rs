use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::{contract_queries, ticker_queries};
use crate::errors::AppError;
use crate::external::option_chain_provider::{OptionChainProvider, RawContract};
use crate::models::{ContractKind, ContractSnapshot};

/// Convert one upstream record. Returns `None` when the contract symbol,
/// expiration, strike or kind is missing or malformed.
pub fn to_snapshot(ticker: &str, raw: &RawContract, now: DateTime<Utc>) -> Option<ContractSnapshot> {
    let greeks = raw.greeks();

    Some(ContractSnapshot {
        contract_symbol: raw.contract_symbol()?.to_string(),
        ticker: ticker.to_uppercase(),
        expiration_date: raw.expiration_date()?,
        strike_price: raw.strike_price()?,
        kind: raw.kind()?,
        bid: raw.bid(),
        ask: raw.ask(),
        last_price: raw.last_price(),
        volume: raw.volume(),
        open_interest: raw.open_interest(),
        implied_volatility: raw.implied_volatility,
        delta: greeks.delta,
        gamma: greeks.gamma,
        theta: greeks.theta,
        vega: greeks.vega,
        updated_at: now,
    })
}

/// Fetch the chain for `symbol` and upsert every usable contract.
///
/// Returns the number of contracts written. Provider failures arrive here only
/// after the client's own retries are spent.
pub async fn fetch_and_store(
    pool: &SqlitePool,
    provider: &dyn OptionChainProvider,
    symbol: &str,
    kind: Option<ContractKind>,
) -> Result<usize, AppError> {
    let raw = provider.fetch_chain(symbol, kind).await?;

    let now = Utc::now();
    let snapshots: Vec<ContractSnapshot> = raw
        .iter()
        .filter_map(|r| to_snapshot(symbol, r, now))
        .collect();

    let skipped = raw.len() - snapshots.len();
    if skipped > 0 {
        warn!("Skipped {} incomplete contracts for {}", skipped, symbol);
    }

    if snapshots.is_empty() {
        info!("No contracts returned for {}", symbol);
        return Ok(0);
    }

    ticker_queries::ensure_ticker(pool, symbol).await?;
    let written = contract_queries::upsert_contracts(pool, symbol, &snapshots).await?;

    info!("✓ Stored {} contracts for {}", written, symbol);
    Ok(written)
}
