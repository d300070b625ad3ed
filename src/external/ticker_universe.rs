use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::normalize_symbol;

/// Dividend-paying large caps used when no ticker file is provided.
pub const DEFAULT_UNIVERSE: &[&str] = &[
    "KO", "PEP", "PG", "JNJ", "XOM", "CVX", "VZ", "T", "MO", "PM",
    "ABBV", "MRK", "PFE", "IBM", "O", "MMM", "KMB", "DUK", "SO", "D",
];

/// Source of the symbols to consider for polling, in polling order.
#[async_trait]
pub trait TickerUniverse: Send + Sync {
    async fn tickers(&self) -> Result<Vec<String>, AppError>;
}

pub struct StaticTickerUniverse {
    symbols: Vec<String>,
}

impl StaticTickerUniverse {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            symbols: symbols
                .into_iter()
                .filter_map(|s| normalize_symbol(s.as_ref()))
                .collect(),
        }
    }

    pub fn default_universe() -> Self {
        Self::new(DEFAULT_UNIVERSE.iter().copied())
    }
}

#[async_trait]
impl TickerUniverse for StaticTickerUniverse {
    async fn tickers(&self) -> Result<Vec<String>, AppError> {
        Ok(self.symbols.clone())
    }
}

/// Reads one symbol (or ISIN) per line; blank lines are skipped and values
/// upper-cased. A missing file falls back to the built-in list.
pub struct FileTickerUniverse {
    path: PathBuf,
    fallback: StaticTickerUniverse,
}

impl FileTickerUniverse {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fallback: StaticTickerUniverse::default_universe(),
        }
    }

    pub fn with_fallback(path: impl Into<PathBuf>, fallback: StaticTickerUniverse) -> Self {
        Self { path: path.into(), fallback }
    }
}

pub fn parse_ticker_lines(content: &str) -> Vec<String> {
    content.lines().filter_map(normalize_symbol).collect()
}

#[async_trait]
impl TickerUniverse for FileTickerUniverse {
    async fn tickers(&self) -> Result<Vec<String>, AppError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let tickers = parse_ticker_lines(&content);
                info!("📄 Loaded {} tickers from file {}", tickers.len(), self.path.display());
                Ok(tickers)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    "Tickers file not found: {}, using built-in universe",
                    self.path.display()
                );
                self.fallback.tickers().await
            }
            Err(e) => Err(AppError::Config(format!(
                "failed to read tickers file {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
