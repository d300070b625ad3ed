use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// Option contract kind. Only calls and puts exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    Call,
    Put,
}

impl ContractKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractKind::Call => "call",
            ContractKind::Put => "put",
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" => Ok(ContractKind::Call),
            "put" => Ok(ContractKind::Put),
            other => Err(format!("invalid contract kind: {}", other)),
        }
    }
}

// Latest known state of a single option contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSnapshot {
    pub contract_symbol: String,
    pub ticker: String,
    pub expiration_date: NaiveDate,
    pub strike_price: f64,
    pub kind: ContractKind,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last_price: Option<f64>,
    pub volume: Option<i64>,
    pub open_interest: Option<i64>,
    pub implied_volatility: Option<f64>,
    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for ContractSnapshot {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let kind: String = row.try_get("option_type")?;
        let kind = kind.parse::<ContractKind>().map_err(|e| sqlx::Error::ColumnDecode {
            index: "option_type".to_string(),
            source: e.into(),
        })?;

        Ok(Self {
            contract_symbol: row.try_get("contract_symbol")?,
            ticker: row.try_get("ticker")?,
            expiration_date: row.try_get("expiration_date")?,
            strike_price: row.try_get("strike_price")?,
            kind,
            bid: row.try_get("bid")?,
            ask: row.try_get("ask")?,
            last_price: row.try_get("last_price")?,
            volume: row.try_get("volume")?,
            open_interest: row.try_get("open_interest")?,
            implied_volatility: row.try_get("implied_volatility")?,
            delta: row.try_get("delta")?,
            gamma: row.try_get("gamma")?,
            theta: row.try_get("theta")?,
            vega: row.try_get("vega")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Conjunctive filter for contract queries. Unset fields impose no constraint;
/// range bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractFilter {
    pub ticker: Option<String>,
    pub expiration_from: Option<NaiveDate>,
    pub expiration_to: Option<NaiveDate>,
    pub bid_min: Option<f64>,
    pub bid_max: Option<f64>,
    pub kind: Option<ContractKind>,
}

impl ContractFilter {
    pub fn for_ticker(ticker: &str) -> Self {
        Self {
            ticker: Some(ticker.to_string()),
            ..Self::default()
        }
    }
}
