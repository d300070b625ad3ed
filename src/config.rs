use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use tokio::time::Duration;

use crate::errors::AppError;
use crate::external::polygon::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
use crate::external::retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES};
use crate::models::ContractKind;
use crate::services::scheduler::{SchedulerSettings, DEFAULT_EMPTY_UNIVERSE_COOLDOWN, DEFAULT_POLL_INTERVAL};
use crate::services::universe_service::DEFAULT_YIELD_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Poll round-robin until the process is stopped
    Continuous,
    /// Poll every qualifying ticker once, then exit
    SinglePass,
}

/// Runner configuration. Core components receive these values explicitly;
/// nothing below `main` reads the environment.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub db_path: PathBuf,
    pub interval: Duration,
    pub max_retries: u32,
    pub request_timeout: Duration,
    pub yield_threshold: f64,
    pub tickers_file: PathBuf,
    pub cooldown: Duration,
    pub contract_type: Option<ContractKind>,
    pub universe_refresh_passes: Option<u32>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            db_path: PathBuf::from("options_data.db"),
            interval: DEFAULT_POLL_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            yield_threshold: DEFAULT_YIELD_THRESHOLD,
            tickers_file: PathBuf::from("isins.txt"),
            cooldown: DEFAULT_EMPTY_UNIVERSE_COOLDOWN,
            contract_type: None,
            universe_refresh_passes: None,
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{} has invalid value '{}': {}", key, raw, e))),
        None => Ok(None),
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            api_key: lookup("POLYGON_API_KEY").filter(|k| !k.trim().is_empty()),
            base_url: parse_var(&lookup, "POLYGON_BASE_URL")?.unwrap_or(defaults.base_url),
            db_path: parse_var(&lookup, "OPTIONS_DB")?.unwrap_or(defaults.db_path),
            interval: parse_var::<u64, _>(&lookup, "POLL_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
            max_retries: parse_var(&lookup, "MAX_RETRIES")?.unwrap_or(defaults.max_retries),
            request_timeout: parse_var::<u64, _>(&lookup, "REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            yield_threshold: parse_var(&lookup, "DIVIDEND_YIELD_THRESHOLD")?
                .unwrap_or(defaults.yield_threshold),
            tickers_file: parse_var(&lookup, "ISINS_FILE")?.unwrap_or(defaults.tickers_file),
            cooldown: parse_var::<u64, _>(&lookup, "EMPTY_UNIVERSE_COOLDOWN_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cooldown),
            contract_type: parse_var(&lookup, "CONTRACT_TYPE")?,
            universe_refresh_passes: parse_var(&lookup, "UNIVERSE_REFRESH_PASSES")?,
        })
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.interval.is_zero() {
            return Err(AppError::Config("poll interval must be a positive number of seconds".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(AppError::Config("request timeout must be positive".into()));
        }
        if !self.yield_threshold.is_finite() || self.yield_threshold < 0.0 {
            return Err(AppError::Config(format!(
                "dividend yield threshold must be a non-negative number, got {}",
                self.yield_threshold
            )));
        }
        if self.universe_refresh_passes == Some(0) {
            return Err(AppError::Config("UNIVERSE_REFRESH_PASSES must be at least 1".into()));
        }
        Ok(())
    }

    /// Startup check for the ingest runner. The client itself checks again per call.
    pub fn require_credential(&self) -> Result<&str, AppError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("POLYGON_API_KEY is not set".into()))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, DEFAULT_BASE_DELAY)
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            interval: self.interval,
            cooldown: self.cooldown,
            yield_threshold: self.yield_threshold,
            kind_filter: self.contract_type,
            universe_refresh_passes: self.universe_refresh_passes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = IngestConfig::from_lookup(lookup(&[])).unwrap();

        assert!(config.api_key.is_none());
        assert_eq!(config.db_path, PathBuf::from("options_data.db"));
        assert_eq!(config.interval, Duration::from_secs(15));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.request_timeout, Duration::from_secs(20));
        assert_eq!(config.cooldown, Duration::from_secs(3600));
        assert_eq!(config.yield_threshold, 0.025);
        assert!(config.validate().is_ok());
        assert!(config.require_credential().is_err());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = IngestConfig::from_lookup(lookup(&[
            ("POLYGON_API_KEY", "abc"),
            ("OPTIONS_DB", "/tmp/x.db"),
            ("POLL_INTERVAL_SECS", "30"),
            ("MAX_RETRIES", "2"),
            ("DIVIDEND_YIELD_THRESHOLD", "0.04"),
            ("CONTRACT_TYPE", "PUT"),
            ("UNIVERSE_REFRESH_PASSES", "3"),
        ]))
        .unwrap();

        assert_eq!(config.require_credential().unwrap(), "abc");
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.retry_policy().max_retries, 2);

        let settings = config.scheduler_settings();
        assert_eq!(settings.interval, Duration::from_secs(30));
        assert_eq!(settings.yield_threshold, 0.04);
        assert_eq!(settings.kind_filter, Some(ContractKind::Put));
        assert_eq!(settings.universe_refresh_passes, Some(3));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = IngestConfig::from_lookup(lookup(&[("POLL_INTERVAL_SECS", "fast")])).unwrap_err();
        assert!(err.to_string().contains("POLL_INTERVAL_SECS"));

        let zero = IngestConfig::from_lookup(lookup(&[("POLL_INTERVAL_SECS", "0")])).unwrap();
        assert!(zero.validate().is_err());

        let negative = IngestConfig::from_lookup(lookup(&[("DIVIDEND_YIELD_THRESHOLD", "-1")])).unwrap();
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_blank_api_key_is_absent() {
        let config = IngestConfig::from_lookup(lookup(&[("POLYGON_API_KEY", "  ")])).unwrap();
        assert!(config.api_key.is_none());
    }
}
