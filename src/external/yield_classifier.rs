use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::errors::AppError;
use crate::external::polygon::DEFAULT_REQUEST_TIMEOUT;
use crate::models::{normalize_symbol, DividendInfo};

pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifierError {
    #[error("dividend lookup request failed: {0}")]
    Transport(String),

    #[error("dividend source returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("unreadable dividend data: {0}")]
    Parse(String),
}

/// Per-symbol dividend yield and next ex-dividend date.
#[async_trait]
pub trait YieldClassifier: Send + Sync {
    async fn dividend_info(&self, symbol: &str) -> Result<DividendInfo, AppError>;
}

/// Fixed lookup table. Unknown symbols have no yield.
#[derive(Default)]
pub struct StaticYieldClassifier {
    entries: HashMap<String, DividendInfo>,
}

impl StaticYieldClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbol: &str, dividend_yield: Option<f64>, ex_dividend_date: Option<NaiveDate>) -> Self {
        if let Some(symbol) = normalize_symbol(symbol) {
            self.entries.insert(symbol, DividendInfo { dividend_yield, ex_dividend_date });
        }
        self
    }
}

#[async_trait]
impl YieldClassifier for StaticYieldClassifier {
    async fn dividend_info(&self, symbol: &str) -> Result<DividendInfo, AppError> {
        Ok(self.entries.get(symbol).copied().unwrap_or_default())
    }
}

/// Trailing yield from Yahoo Finance's chart endpoint with dividend events.
///
/// Yield is the sum of dividends paid over the last year divided by the
/// current market price. The next ex-dividend date is projected from the
/// spacing of the two most recent payments; it is `None` with fewer than two.
pub struct YahooDividendClassifier {
    client: reqwest::Client,
    base_url: String,
}

impl YahooDividendClassifier {
    pub fn new(request_timeout: std::time::Duration) -> Self {
        Self::with_base_url(YAHOO_BASE_URL, request_timeout)
    }

    /// A hung request would stall BUILD_UNIVERSE, so every call is bounded by `request_timeout`.
    pub fn with_base_url(base_url: &str, request_timeout: std::time::Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(request_timeout)
                .user_agent("Mozilla/5.0 (compatible; options-ingest/0.1)")
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for YahooDividendClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    meta: YahooMeta,
    #[serde(default)]
    events: Option<YahooEvents>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YahooEvents {
    #[serde(default)]
    dividends: BTreeMap<String, YahooDividend>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooDividend {
    amount: f64,
    date: i64,
}

/// Turn dividend events into yield + projected next ex-date.
fn summarize_dividends(price: Option<f64>, dividends: &[(NaiveDate, f64)], today: NaiveDate) -> DividendInfo {
    let one_year_ago = today - Duration::days(365);
    let trailing: f64 = dividends
        .iter()
        .filter(|(date, _)| *date > one_year_ago)
        .map(|(_, amount)| amount)
        .sum();

    let dividend_yield = match price {
        Some(p) if p > 0.0 => Some(trailing / p),
        _ => None,
    };

    let mut dates: Vec<NaiveDate> = dividends.iter().map(|(d, _)| *d).collect();
    dates.sort();

    let ex_dividend_date = match dates.as_slice() {
        [.., prev, last] if last > prev => {
            let step = *last - *prev;
            let mut next = *last + step;
            // Bounded: at most one projected year of missed payments.
            for _ in 0..12 {
                if next >= today {
                    break;
                }
                next += step;
            }
            Some(next)
        }
        _ => None,
    };

    DividendInfo { dividend_yield, ex_dividend_date }
}

#[async_trait]
impl YieldClassifier for YahooDividendClassifier {
    async fn dividend_info(&self, symbol: &str) -> Result<DividendInfo, AppError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let resp = self
            .client
            .get(&url)
            .query(&[("range", "1y"), ("interval", "1d"), ("events", "div")])
            .send()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClassifierError::Upstream { status, body }.into());
        }

        let body: YahooChartResponse = resp
            .json()
            .await
            .map_err(|e| ClassifierError::Parse(e.to_string()))?;

        if let Some(error) = body.chart.error {
            return Err(ClassifierError::Upstream { status: 200, body: error.description }.into());
        }

        let result = body
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| ClassifierError::Parse("missing chart result".into()))?;

        let dividends: Vec<(NaiveDate, f64)> = result
            .events
            .map(|e| e.dividends.into_values().collect::<Vec<_>>())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|d| DateTime::from_timestamp(d.date, 0).map(|dt| (dt.date_naive(), d.amount)))
            .collect();

        Ok(summarize_dividends(
            result.meta.regular_market_price,
            &dividends,
            Utc::now().date_naive(),
        ))
    }
}
