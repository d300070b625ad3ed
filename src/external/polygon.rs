use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::Duration;
use tracing::debug;

use crate::external::option_chain_provider::{ChainProviderError, OptionChainProvider, RawContract};
use crate::external::retry::RetryPolicy;
use crate::models::ContractKind;
use crate::services::clock::Clock;

pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
/// Largest page the snapshot endpoint serves; one poll reads one page.
pub const SNAPSHOT_PAGE_LIMIT: &str = "250";

/// Polygon.io option-chain snapshot client.
///
/// The credential is checked on every call rather than at construction, so a
/// provider can be built before the key is known and given one later with
/// [`PolygonProvider::set_api_key`].
pub struct PolygonProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl PolygonProvider {
    pub fn new(
        api_key: Option<String>,
        base_url: &str,
        retry: RetryPolicy,
        request_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(request_timeout)
                .user_agent("options-ingest/0.1")
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
            clock,
        }
    }

    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.api_key = Some(api_key.into());
    }

    fn credential(&self) -> Result<&str, ChainProviderError> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ChainProviderError::MissingCredential),
        }
    }

    async fn request_once(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<PolygonChainResponse, ChainProviderError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ChainProviderError::Transport(e.to_string()))?;

        let status = resp.status();

        if status.as_u16() == 429 {
            return Err(ChainProviderError::RateLimited);
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChainProviderError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<PolygonChainResponse>().await.map_err(|e| {
            if e.is_decode() {
                ChainProviderError::Parse(e.to_string())
            } else {
                ChainProviderError::Transport(e.to_string())
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct PolygonChainResponse {
    #[serde(default)]
    results: Vec<RawContract>,
    #[serde(default)]
    status: Option<String>,
}

#[async_trait]
impl OptionChainProvider for PolygonProvider {
    async fn fetch_chain(
        &self,
        symbol: &str,
        kind: Option<ContractKind>,
    ) -> Result<Vec<RawContract>, ChainProviderError> {
        let api_key = self.credential()?;
        let symbol = symbol.to_uppercase();
        let url = format!("{}/v3/snapshot/options/{}", self.base_url, symbol);

        let mut query: Vec<(&str, &str)> = vec![("apiKey", api_key), ("limit", SNAPSHOT_PAGE_LIMIT)];
        if let Some(kind) = kind {
            query.push(("contract_type", kind.as_str()));
        }

        let body = self
            .retry
            .run(self.clock.as_ref(), &symbol, || self.request_once(&url, &query))
            .await?;

        debug!(
            "Polygon returned {} contracts for {} (status: {})",
            body.results.len(),
            symbol,
            body.status.as_deref().unwrap_or("n/a")
        );

        Ok(body.results)
    }
}
