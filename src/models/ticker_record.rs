use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Dividend metadata for one underlying symbol.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TickerRecord {
    #[sqlx(rename = "ticker")]
    pub symbol: String,
    pub dividend_yield: Option<f64>,
    pub ex_dividend_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

// Output of the yield classification collaborator for a single symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DividendInfo {
    pub dividend_yield: Option<f64>,
    pub ex_dividend_date: Option<NaiveDate>,
}

impl DividendInfo {
    /// Missing yield never qualifies.
    pub fn qualifies(&self, threshold: f64) -> bool {
        self.dividend_yield.map(|y| y >= threshold).unwrap_or(false)
    }
}

/// Trim and upper-case a symbol; returns `None` for blank input.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        None
    } else {
        Some(symbol)
    }
}
