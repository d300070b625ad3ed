#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{Duration, Instant};

use options_ingest::errors::AppError;
use options_ingest::external::option_chain_provider::{
    ChainProviderError, OptionChainProvider, RawContract, RawDetails, RawQuote,
};
use options_ingest::external::ticker_universe::TickerUniverse;
use options_ingest::external::yield_classifier::StaticYieldClassifier;
use options_ingest::models::ContractKind;
use options_ingest::services::clock::{Clock, ManualClock};
use options_ingest::services::shutdown::ShutdownSignal;

pub type ChainResult = Result<Vec<RawContract>, ChainProviderError>;

pub fn contract(symbol: &str, expiry: &str, strike: f64, kind: &str, bid: Option<f64>) -> RawContract {
    RawContract {
        details: Some(RawDetails {
            ticker: Some(symbol.to_string()),
            expiration_date: Some(expiry.to_string()),
            strike_price: Some(strike),
            contract_type: Some(kind.to_string()),
        }),
        last_quote: Some(RawQuote { bid, ask: bid.map(|b| b + 0.1) }),
        ..RawContract::default()
    }
}

/// Every listed symbol yields 5%, well above the default threshold.
pub fn high_yield(symbols: &[&str]) -> StaticYieldClassifier {
    symbols
        .iter()
        .fold(StaticYieldClassifier::new(), |c, s| c.with(s, Some(0.05), None))
}

/// Chain provider replaying a per-symbol script. The last response for a
/// symbol repeats once the script is down to one entry; unknown symbols get
/// an empty chain.
pub struct ScriptedProvider {
    script: Mutex<HashMap<String, VecDeque<ChainResult>>>,
    calls: Mutex<Vec<(String, Option<ContractKind>)>>,
    stop_after: Option<(usize, ShutdownSignal)>,
    work: Option<(ManualClock, Mutex<VecDeque<Duration>>)>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            stop_after: None,
            work: None,
        }
    }

    pub fn respond(self, symbol: &str, result: ChainResult) -> Self {
        self.script
            .lock()
            .entry(symbol.to_string())
            .or_default()
            .push_back(result);
        self
    }

    /// Trigger `shutdown` once the n-th call has been made.
    pub fn stop_after(mut self, calls: usize, shutdown: ShutdownSignal) -> Self {
        self.stop_after = Some((calls, shutdown));
        self
    }

    /// Advance `clock` by the next duration on every call, simulating work.
    pub fn with_work(mut self, clock: ManualClock, durations: &[Duration]) -> Self {
        self.work = Some((clock, Mutex::new(durations.iter().copied().collect())));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(s, _)| s.clone()).collect()
    }

    pub fn kinds(&self) -> Vec<Option<ContractKind>> {
        self.calls.lock().iter().map(|(_, k)| *k).collect()
    }
}

#[async_trait]
impl OptionChainProvider for ScriptedProvider {
    async fn fetch_chain(&self, symbol: &str, kind: Option<ContractKind>) -> ChainResult {
        let made = {
            let mut calls = self.calls.lock();
            calls.push((symbol.to_string(), kind));
            calls.len()
        };

        if let Some((clock, durations)) = &self.work {
            if let Some(d) = durations.lock().pop_front() {
                clock.advance(d);
            }
        }

        let result = {
            let mut script = self.script.lock();
            match script.get_mut(symbol) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Ok(Vec::new())),
                Some(queue) => queue.front().cloned().unwrap_or(Ok(Vec::new())),
                None => Ok(Vec::new()),
            }
        };

        if let Some((limit, shutdown)) = &self.stop_after {
            if made >= *limit {
                shutdown.trigger();
            }
        }

        result
    }
}

/// Static universe that counts how often it was asked for its symbols.
pub struct CountingUniverse {
    symbols: Vec<String>,
    calls: AtomicUsize,
}

impl CountingUniverse {
    pub fn new(symbols: &[&str]) -> Self {
        Self {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TickerUniverse for CountingUniverse {
    async fn tickers(&self) -> Result<Vec<String>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.symbols.clone())
    }
}

/// Manual clock that fires the shutdown signal after a number of sleeps.
pub struct StopAfterSleeps {
    pub inner: ManualClock,
    shutdown: ShutdownSignal,
    limit: usize,
}

impl StopAfterSleeps {
    pub fn new(inner: ManualClock, shutdown: ShutdownSignal, limit: usize) -> Self {
        Self { inner, shutdown, limit }
    }
}

#[async_trait]
impl Clock for StopAfterSleeps {
    fn now(&self) -> Instant {
        self.inner.now()
    }

    async fn sleep(&self, duration: Duration) {
        self.inner.sleep(duration).await;
        if self.inner.sleeps().len() >= self.limit {
            self.shutdown.trigger();
        }
    }
}
