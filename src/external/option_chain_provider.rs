use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::models::ContractKind;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainProviderError {
    #[error("API credential is not set")]
    MissingCredential,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited")]
    RateLimited,

    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    ExhaustedRetries { attempts: u32, last_error: String },

    #[error("upstream error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("parse error: {0}")]
    Parse(String),
}

impl ChainProviderError {
    /// Transport failures and rate limiting share one retry budget.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChainProviderError::Transport(_) | ChainProviderError::RateLimited)
    }

    pub fn failure_type(&self) -> &'static str {
        match self {
            ChainProviderError::MissingCredential => "missing_credential",
            ChainProviderError::Transport(_) => "transport",
            ChainProviderError::RateLimited => "rate_limited",
            ChainProviderError::ExhaustedRetries { .. } => "exhausted_retries",
            ChainProviderError::Upstream { .. } => "upstream_error",
            ChainProviderError::Parse(_) => "parse_error",
        }
    }
}

/// One contract as reported by the upstream chain snapshot. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawContract {
    #[serde(default)]
    pub details: Option<RawDetails>,
    #[serde(default)]
    pub last_quote: Option<RawQuote>,
    #[serde(default)]
    pub last_trade: Option<RawTrade>,
    #[serde(default)]
    pub day: Option<RawDay>,
    #[serde(default)]
    pub open_interest: Option<f64>,
    #[serde(default)]
    pub implied_volatility: Option<f64>,
    #[serde(default)]
    pub greeks: Option<RawGreeks>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawDetails {
    pub ticker: Option<String>,
    pub expiration_date: Option<String>,
    pub strike_price: Option<f64>,
    pub contract_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawQuote {
    pub bid: Option<f64>,
    pub ask: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawTrade {
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawDay {
    pub volume: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawGreeks {
    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,
}

impl RawContract {
    pub fn contract_symbol(&self) -> Option<&str> {
        self.details.as_ref().and_then(|d| d.ticker.as_deref())
    }

    pub fn expiration_date(&self) -> Option<NaiveDate> {
        self.details
            .as_ref()
            .and_then(|d| d.expiration_date.as_deref())
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    }

    pub fn strike_price(&self) -> Option<f64> {
        self.details.as_ref().and_then(|d| d.strike_price)
    }

    pub fn kind(&self) -> Option<ContractKind> {
        self.details
            .as_ref()
            .and_then(|d| d.contract_type.as_deref())
            .and_then(|s| s.parse().ok())
    }

    pub fn bid(&self) -> Option<f64> {
        self.last_quote.as_ref().and_then(|q| q.bid)
    }

    pub fn ask(&self) -> Option<f64> {
        self.last_quote.as_ref().and_then(|q| q.ask)
    }

    pub fn last_price(&self) -> Option<f64> {
        self.last_trade.as_ref().and_then(|t| t.price)
    }

    // Polygon reports counts as JSON numbers that may carry a fractional part.
    pub fn volume(&self) -> Option<i64> {
        self.day.as_ref().and_then(|d| d.volume).map(|v| v as i64)
    }

    pub fn open_interest(&self) -> Option<i64> {
        self.open_interest.map(|v| v as i64)
    }

    pub fn greeks(&self) -> RawGreeks {
        self.greeks.clone().unwrap_or_default()
    }
}

#[async_trait]
pub trait OptionChainProvider: Send + Sync {
    /// One logical "chain snapshot" call for `symbol`, optionally limited to one kind.
    async fn fetch_chain(
        &self,
        symbol: &str,
        kind: Option<ContractKind>,
    ) -> Result<Vec<RawContract>, ChainProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_contract_deserializes_polygon_shape() {
        let json = r#"{
            "details": {
                "ticker": "O:AAA250117C00100000",
                "expiration_date": "2025-01-17",
                "strike_price": 100,
                "contract_type": "call"
            },
            "last_quote": {"bid": 1.5, "ask": 1.6},
            "day": {"volume": 12},
            "open_interest": 340,
            "greeks": {"delta": 0.52}
        }"#;
        let raw: RawContract = serde_json::from_str(json).unwrap();

        assert_eq!(raw.contract_symbol(), Some("O:AAA250117C00100000"));
        assert_eq!(raw.expiration_date(), NaiveDate::from_ymd_opt(2025, 1, 17));
        assert_eq!(raw.strike_price(), Some(100.0));
        assert_eq!(raw.kind(), Some(ContractKind::Call));
        assert_eq!(raw.bid(), Some(1.5));
        assert_eq!(raw.last_price(), None);
        assert_eq!(raw.volume(), Some(12));
        assert_eq!(raw.open_interest(), Some(340));
        assert_eq!(raw.greeks().delta, Some(0.52));
        assert_eq!(raw.greeks().vega, None);
    }

    #[test]
    fn test_retryable_classes() {
        assert!(ChainProviderError::RateLimited.is_retryable());
        assert!(ChainProviderError::Transport("timeout".into()).is_retryable());
        assert!(!ChainProviderError::MissingCredential.is_retryable());
        assert!(!ChainProviderError::Upstream { status: 500, body: String::new() }.is_retryable());
    }
}
