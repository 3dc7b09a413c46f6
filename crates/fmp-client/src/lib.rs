use chrono::Utc;
use evaluation_core::{
    CompanyProfile, FetchError, FinancialRatios, FinancialStatements, IncomeStatement,
    InsiderTransaction, KeyMetrics, QuotaStatus, StockQuote,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::time::Instant;

pub mod config;
mod quota;
mod reconcile;
mod retry;
pub mod transport;


pub use config::FmpConfig;
pub use transport::{HttpTransport, Transport, TransportError, UpstreamResponse};

use quota::{credential_key, QuotaLedger};
use retry::{classify, AttemptOutcome, RetryPolicy};

/// Quota-aware client for the Financial Modeling Prep REST API.
///
/// Every call is paced per credential (60 / per-minute-limit seconds between
/// calls), counted against an in-memory daily budget, and retried with
/// backoff on transient upstream failures. Quota bookkeeping is keyed by a
/// hash of the credential and lives for the process lifetime only.
pub struct FmpClient {
    config: FmpConfig,
    transport: Arc<dyn Transport>,
    quotas: QuotaLedger,
    retry: RetryPolicy,
}

impl FmpClient {
    pub fn new(config: FmpConfig) -> Self {
        let transport = Arc::new(HttpTransport::new(config.request_timeout));
        Self::with_transport(config, transport)
    }

    /// Build a client from `FMP_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(FmpConfig::from_env())
    }

    /// Build a client over a caller-supplied transport. Tests use this to
    /// script the upstream without sockets.
    pub fn with_transport(config: FmpConfig, transport: Arc<dyn Transport>) -> Self {
        let quotas = QuotaLedger::new(config.daily_limit, config.per_minute_limit);
        let retry = RetryPolicy {
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        };
        Self {
            config,
            transport,
            quotas,
            retry,
        }
    }

    fn resolve_credential<'a>(&'a self, credential: Option<&'a str>) -> Result<&'a str, FetchError> {
        credential
            .or(self.config.api_key.as_deref())
            .ok_or_else(|| FetchError::InvalidCredential {
                message: "no API credential configured".to_string(),
            })
    }

    /// Fetch one upstream resource as raw JSON, under the credential's rate
    /// budget. The derived `fetch_*` operations all go through here.
    pub async fn fetch(
        &self,
        resource_path: &str,
        params: &[(&str, &str)],
        credential: Option<&str>,
    ) -> Result<serde_json::Value, FetchError> {
        let credential = self.resolve_credential(credential)?;
        let key = credential_key(credential);

        // Reserves a daily-quota slot; settled below on every outcome.
        let wait = self
            .quotas
            .admit(&key, Utc::now().date_naive(), Instant::now())?;
        if !wait.is_zero() {
            tracing::debug!(
                credential = %&key[..8],
                wait_secs = wait.as_secs_f64(),
                "pacing upstream call"
            );
            tokio::time::sleep(wait).await;
        }

        let url = format!("{}/{}", self.config.base_url, resource_path);
        let mut query: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        query.push(("apikey".to_string(), credential.to_string()));

        match self.run_attempts(&url, &query, resource_path).await {
            Ok(response) => {
                self.quotas
                    .record_success(&key, Utc::now().date_naive(), Instant::now());
                serde_json::from_str(&response.body).map_err(|e| FetchError::Parse(e.to_string()))
            }
            Err(err) => {
                self.quotas.release(&key);
                Err(err)
            }
        }
    }

    /// Bounded retry loop over the transport; classification of each attempt
    /// lives in `retry::classify`.
    async fn run_attempts(
        &self,
        url: &str,
        query: &[(String, String)],
        resource_path: &str,
    ) -> Result<UpstreamResponse, FetchError> {
        let mut attempt = 0u32;
        loop {
            let result = self.transport.get(url, query).await;
            match classify(attempt, result, &self.retry) {
                AttemptOutcome::Success(response) => return Ok(response),
                AttemptOutcome::Terminal(err) => {
                    tracing::error!(resource = resource_path, error = %err, "upstream call failed");
                    return Err(err);
                }
                AttemptOutcome::Retry { delay, exhausted } => {
                    if attempt >= self.retry.max_retries {
                        tracing::error!(
                            resource = resource_path,
                            attempts = attempt + 1,
                            error = %exhausted,
                            "retries exhausted"
                        );
                        return Err(exhausted);
                    }
                    tracing::warn!(
                        resource = resource_path,
                        attempt = attempt + 1,
                        delay_secs = delay.as_secs_f64(),
                        "transient upstream failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn fetch_list<T: DeserializeOwned>(
        &self,
        resource_path: &str,
        params: &[(&str, &str)],
        credential: Option<&str>,
    ) -> Result<Vec<T>, FetchError> {
        let value = self.fetch(resource_path, params, credential).await?;
        serde_json::from_value(value).map_err(|e| FetchError::Parse(e.to_string()))
    }

    /// Get the company profile, reconciled so that price, shares outstanding
    /// and market cap are mutually consistent. Missing fields are backfilled
    /// from the quote and key-metrics endpoints in a fixed order; the
    /// resulting provenance flags ride along on the profile.
    pub async fn fetch_profile(
        &self,
        ticker: &str,
        credential: Option<&str>,
    ) -> Result<CompanyProfile, FetchError> {
        let ticker = ticker.to_uppercase();
        let mut rows: Vec<CompanyProfile> = self
            .fetch_list(&format!("profile/{ticker}"), &[], credential)
            .await?;

        // Unknown tickers come back as an empty array, not a 404.
        let mut profile = if rows.is_empty() {
            CompanyProfile {
                symbol: ticker.clone(),
                ..Default::default()
            }
        } else {
            rows.remove(0)
        };

        reconcile::derive_shares(&mut profile);
        reconcile::correct_market_cap(&mut profile);

        if reconcile::needs_quote_backfill(&profile) {
            match self.fetch_quote(&ticker, credential).await {
                Ok(quote) => reconcile::backfill_from_quote(&mut profile, &quote),
                Err(err) => {
                    tracing::warn!(ticker = %ticker, error = %err, "quote backfill failed")
                }
            }
        }

        if reconcile::needs_metrics_backfill(&profile) {
            match self.fetch_key_metrics(&ticker, 1, credential).await {
                Ok(metrics) => {
                    if let Some(latest) = metrics.first() {
                        reconcile::backfill_from_metrics(&mut profile, latest);
                    }
                }
                Err(err) => {
                    tracing::warn!(ticker = %ticker, error = %err, "key-metrics backfill failed")
                }
            }
        }

        profile.freshness = reconcile::profile_freshness(&profile);
        Ok(profile)
    }

    /// Get income statement, balance sheet and cash flow histories.
    pub async fn fetch_statements(
        &self,
        ticker: &str,
        years: u32,
        credential: Option<&str>,
    ) -> Result<FinancialStatements, FetchError> {
        let ticker = ticker.to_uppercase();
        let limit = years.to_string();
        let params = [("limit", limit.as_str())];

        let income: Vec<IncomeStatement> = self
            .fetch_list(&format!("income-statement/{ticker}"), &params, credential)
            .await?;
        let balance = self
            .fetch_list(
                &format!("balance-sheet-statement/{ticker}"),
                &params,
                credential,
            )
            .await?;
        let cashflow = self
            .fetch_list(
                &format!("cash-flow-statement/{ticker}"),
                &params,
                credential,
            )
            .await?;

        Ok(FinancialStatements {
            income,
            balance,
            cashflow,
        })
    }

    /// Get key metrics, most recent first, with the latest entry tagged for
    /// freshness.
    pub async fn fetch_key_metrics(
        &self,
        ticker: &str,
        years: u32,
        credential: Option<&str>,
    ) -> Result<Vec<KeyMetrics>, FetchError> {
        let ticker = ticker.to_uppercase();
        let limit = years.to_string();
        let mut metrics: Vec<KeyMetrics> = self
            .fetch_list(
                &format!("key-metrics/{ticker}"),
                &[("limit", limit.as_str())],
                credential,
            )
            .await?;

        match metrics.first_mut() {
            Some(latest) => latest.freshness = reconcile::metrics_freshness(latest),
            // Empty history still yields one entry so consumers see the tag.
            None => metrics.push(KeyMetrics::default()),
        }
        Ok(metrics)
    }

    /// Get financial ratio history.
    pub async fn fetch_ratios(
        &self,
        ticker: &str,
        years: u32,
        credential: Option<&str>,
    ) -> Result<Vec<FinancialRatios>, FetchError> {
        let ticker = ticker.to_uppercase();
        let limit = years.to_string();
        self.fetch_list(
            &format!("ratios/{ticker}"),
            &[("limit", limit.as_str())],
            credential,
        )
        .await
    }

    /// Get recent insider transactions.
    pub async fn fetch_insider_trading(
        &self,
        ticker: &str,
        credential: Option<&str>,
    ) -> Result<Vec<InsiderTransaction>, FetchError> {
        let ticker = ticker.to_uppercase();
        self.fetch_list(
            "insider-trading",
            &[("symbol", ticker.as_str()), ("limit", "50")],
            credential,
        )
        .await
    }

    /// Get the real-time quote. Also used internally to backfill incomplete
    /// profiles.
    pub async fn fetch_quote(
        &self,
        ticker: &str,
        credential: Option<&str>,
    ) -> Result<StockQuote, FetchError> {
        let ticker = ticker.to_uppercase();
        let mut rows: Vec<StockQuote> = self
            .fetch_list(&format!("quote/{ticker}"), &[], credential)
            .await?;
        if rows.is_empty() {
            return Err(FetchError::ResourceNotFound {
                message: format!("no quote data for {ticker}"),
            });
        }
        Ok(rows.remove(0))
    }

    /// Snapshot of the credential's quota bookkeeping. Applies the same
    /// daily-reset check as `fetch`, without touching the network.
    pub fn quota_status(&self, credential: Option<&str>) -> Result<QuotaStatus, FetchError> {
        let credential = self.resolve_credential(credential)?;
        let key = credential_key(credential);
        Ok(self.quotas.status(&key, Utc::now().date_naive()))
    }
}
