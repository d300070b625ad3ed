use std::collections::HashSet;

use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::db::ticker_queries;
use crate::external::ticker_universe::TickerUniverse;
use crate::external::yield_classifier::YieldClassifier;
use crate::models::normalize_symbol;

pub const DEFAULT_YIELD_THRESHOLD: f64 = 0.025;

/// Normalize and deduplicate, keeping the first occurrence of each symbol.
pub fn dedupe_symbols<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    symbols
        .into_iter()
        .filter_map(|s| normalize_symbol(s.as_ref()))
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Build the ordered qualifying set: every symbol from `universe` is classified,
/// its ticker record persisted, and kept if its yield meets `threshold`.
///
/// Never fails. A broken universe source yields an empty set, and a symbol whose
/// classification fails is skipped.
pub async fn build_universe(
    pool: &SqlitePool,
    universe: &dyn TickerUniverse,
    classifier: &dyn YieldClassifier,
    threshold: f64,
) -> Vec<String> {
    let tickers = match universe.tickers().await {
        Ok(tickers) => dedupe_symbols(tickers),
        Err(e) => {
            error!("Failed to load ticker universe: {}", e);
            return Vec::new();
        }
    };

    info!("🔎 Classifying {} tickers against yield threshold {:.4}", tickers.len(), threshold);

    let mut qualified = Vec::new();
    for symbol in tickers {
        let info = match classifier.dividend_info(&symbol).await {
            Ok(info) => info,
            Err(e) => {
                warn!("Failed to classify {}: {}", symbol, e);
                continue;
            }
        };

        if let Err(e) = ticker_queries::upsert_ticker(pool, &symbol, &info).await {
            error!("Failed to store ticker record for {}: {}", symbol, e);
        }

        if info.qualifies(threshold) {
            qualified.push(symbol);
        }
    }

    info!("✓ {} tickers qualified", qualified.len());
    qualified
}
