//! Ingestion scheduler.
//!
//! Drives the polling loop as an explicit state machine:
//!
//! ```text
//! BUILD_UNIVERSE -> POLL_NEXT -> (SLEEP -> POLL_NEXT)*
//! ```
//!
//! Exactly one upstream call is in flight at any time; together with the
//! per-iteration interval this is what keeps the aggregate call rate under the
//! upstream quota. Per-symbol failures are logged and recorded, never fatal.
//! Only an empty qualifying set triggers the long cooldown.

use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::RunMode;
use crate::db::fetch_failure_queries;
use crate::external::option_chain_provider::OptionChainProvider;
use crate::external::ticker_universe::TickerUniverse;
use crate::external::yield_classifier::YieldClassifier;
use crate::models::ContractKind;
use crate::services::clock::{Clock, TokioClock};
use crate::services::shutdown::ShutdownSignal;
use crate::services::{ingestion_service, universe_service};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_EMPTY_UNIVERSE_COOLDOWN: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    /// Minimum wall-clock span of one continuous-mode iteration.
    pub interval: Duration,
    /// Sleep before retrying BUILD_UNIVERSE when nothing qualifies.
    pub cooldown: Duration,
    pub yield_threshold: f64,
    pub kind_filter: Option<ContractKind>,
    /// Return to BUILD_UNIVERSE after this many full round-robin passes.
    /// `None` keeps the qualifying set fixed for the life of the loop.
    pub universe_refresh_passes: Option<u32>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            cooldown: DEFAULT_EMPTY_UNIVERSE_COOLDOWN,
            yield_threshold: universe_service::DEFAULT_YIELD_THRESHOLD,
            kind_filter: None,
            universe_refresh_passes: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub items_processed: u32,
    pub items_failed: u32,
    pub contracts_written: usize,
}

/// Endless round-robin cursor over a fixed, non-empty symbol list.
#[derive(Debug, Clone)]
pub struct RoundRobin {
    symbols: Vec<String>,
    polled: u64,
}

impl RoundRobin {
    /// `None` for an empty list: there is nothing to cycle over.
    pub fn new(symbols: Vec<String>) -> Option<Self> {
        if symbols.is_empty() {
            None
        } else {
            Some(Self { symbols, polled: 0 })
        }
    }

    pub fn next_symbol(&mut self) -> &str {
        let idx = (self.polled % self.symbols.len() as u64) as usize;
        self.polled += 1;
        &self.symbols[idx]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn completed_passes(&self) -> u64 {
        self.polled / self.symbols.len() as u64
    }
}

pub struct IngestionScheduler {
    pool: SqlitePool,
    provider: Arc<dyn OptionChainProvider>,
    universe: Arc<dyn TickerUniverse>,
    classifier: Arc<dyn YieldClassifier>,
    clock: Arc<dyn Clock>,
    shutdown: ShutdownSignal,
    settings: SchedulerSettings,
}

impl IngestionScheduler {
    pub fn new(
        pool: SqlitePool,
        provider: Arc<dyn OptionChainProvider>,
        universe: Arc<dyn TickerUniverse>,
        classifier: Arc<dyn YieldClassifier>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            pool,
            provider,
            universe,
            classifier,
            clock: Arc::new(TokioClock),
            shutdown: ShutdownSignal::new(),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub async fn run(&self, mode: RunMode) -> PassSummary {
        match mode {
            RunMode::Continuous => self.run_continuous().await,
            RunMode::SinglePass => self.run_single_pass().await,
        }
    }

    /// BUILD_UNIVERSE once, poll each qualifying symbol once, then stop.
    ///
    /// No interval gating between symbols. Partial failures are reported in
    /// the summary; the pass itself always completes.
    pub async fn run_single_pass(&self) -> PassSummary {
        let mut summary = PassSummary::default();

        if self.shutdown.is_triggered() {
            return summary;
        }

        let qualified = self.build_universe().await;
        if qualified.is_empty() {
            warn!("No tickers qualified; nothing to poll in single-pass mode");
            return summary;
        }

        for symbol in &qualified {
            if self.shutdown.is_triggered() {
                info!("🛑 Shutdown requested, stopping single pass early");
                break;
            }
            self.poll_symbol(symbol, &mut summary).await;
        }

        info!(
            "✅ Single pass completed (processed: {}, failed: {}, contracts: {})",
            summary.items_processed, summary.items_failed, summary.contracts_written
        );
        summary
    }

    /// Poll forever, round-robin, until the shutdown signal fires.
    pub async fn run_continuous(&self) -> PassSummary {
        let mut summary = PassSummary::default();
        let refresh_after = self.settings.universe_refresh_passes.filter(|n| *n > 0);

        if refresh_after.is_none() {
            info!("Universe refresh disabled: the qualifying set stays fixed until restart");
        }

        'universe: loop {
            if self.shutdown.is_triggered() {
                break;
            }

            let Some(mut cursor) = RoundRobin::new(self.build_universe().await) else {
                warn!(
                    "No tickers qualified; sleeping for {}s before retrying",
                    self.settings.cooldown.as_secs()
                );
                self.sleep_unless_shutdown(self.settings.cooldown).await;
                continue;
            };

            info!(
                "🚀 Polling {} tickers every {}s",
                cursor.len(),
                self.settings.interval.as_secs_f64()
            );

            loop {
                if self.shutdown.is_triggered() {
                    break 'universe;
                }

                if let Some(passes) = refresh_after {
                    if cursor.completed_passes() >= u64::from(passes) {
                        info!("🔄 Completed {} passes, rebuilding universe", passes);
                        continue 'universe;
                    }
                }

                let started = self.clock.now();
                let symbol = cursor.next_symbol().to_string();
                self.poll_symbol(&symbol, &mut summary).await;

                // Iterations that overrun the interval proceed at once; lost time is not made up.
                let elapsed = self.clock.now().saturating_duration_since(started);
                if let Some(remaining) = self.settings.interval.checked_sub(elapsed) {
                    if !remaining.is_zero() {
                        self.sleep_unless_shutdown(remaining).await;
                    }
                }
            }
        }

        info!(
            "🛑 Ingestion stopped (processed: {}, failed: {}, contracts: {})",
            summary.items_processed, summary.items_failed, summary.contracts_written
        );
        summary
    }

    pub async fn build_universe(&self) -> Vec<String> {
        universe_service::build_universe(
            &self.pool,
            self.universe.as_ref(),
            self.classifier.as_ref(),
            self.settings.yield_threshold,
        )
        .await
    }

    /// POLL_NEXT for one symbol. Never propagates a failure.
    pub async fn poll_symbol(&self, symbol: &str, summary: &mut PassSummary) {
        match ingestion_service::fetch_and_store(
            &self.pool,
            self.provider.as_ref(),
            symbol,
            self.settings.kind_filter,
        )
        .await
        {
            Ok(written) => {
                summary.items_processed += 1;
                summary.contracts_written += written;

                if let Err(e) = fetch_failure_queries::clear_fetch_failure(&self.pool, symbol).await {
                    warn!("Failed to clear failure record for {}: {}", symbol, e);
                }
            }
            Err(e) => {
                summary.items_failed += 1;
                error!("✗ Failed to update {}: {}", symbol, e);

                if let Err(db_err) = fetch_failure_queries::record_fetch_failure(
                    &self.pool,
                    symbol,
                    e.failure_type(),
                    Some(&e.to_string()),
                )
                .await
                {
                    error!("Failed to record failure for {}: {}", symbol, db_err);
                }
            }
        }
    }

    async fn sleep_unless_shutdown(&self, duration: Duration) {
        if self.shutdown.is_triggered() {
            return;
        }

        tokio::select! {
            biased;
            _ = self.clock.sleep(duration) => {}
            _ = self.shutdown.triggered() => {
                debug!("Sleep interrupted by shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(symbols: &[&str]) -> RoundRobin {
        RoundRobin::new(symbols.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_round_robin_visits_each_once_then_wraps() {
        let mut rr = cursor(&["AAA", "BBB", "CCC"]);

        let first_pass: Vec<String> = (0..3).map(|_| rr.next_symbol().to_string()).collect();
        assert_eq!(first_pass, vec!["AAA", "BBB", "CCC"]);
        assert_eq!(rr.completed_passes(), 1);

        assert_eq!(rr.next_symbol(), "AAA");
        assert_eq!(rr.completed_passes(), 1);
    }

    #[test]
    fn test_round_robin_single_symbol() {
        let mut rr = cursor(&["ONLY"]);
        assert_eq!(rr.next_symbol(), "ONLY");
        assert_eq!(rr.next_symbol(), "ONLY");
        assert_eq!(rr.completed_passes(), 2);
    }

    #[test]
    fn test_round_robin_rejects_empty() {
        assert!(RoundRobin::new(Vec::new()).is_none());
    }

    #[test]
    fn test_default_settings() {
        let settings = SchedulerSettings::default();
        assert_eq!(settings.interval, Duration::from_secs(15));
        assert_eq!(settings.cooldown, Duration::from_secs(3600));
        assert_eq!(settings.yield_threshold, 0.025);
        assert!(settings.universe_refresh_passes.is_none());
    }
}
