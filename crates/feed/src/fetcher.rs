//! Retry, backoff and fallback around a [`ChainSource`].
//!
//! Per request the fetcher runs a small state machine:
//!
//! - success: normalize the payload (`Live`, or `Empty` if it lists nothing);
//!   a payload where every contract is unusable counts as malformed
//! - rate limited: sleep `base_delay * attempt` and try again, up to
//!   `max_retries` attempts; exhaustion yields an empty `Unavailable` result
//! - unauthorized: load the fallback snapshot without retrying
//! - anything else: load the fallback snapshot without retrying
//!
//! No error escapes [`ChainFetcher::fetch`]. Callers always get a
//! [`ChainSnapshot`] whose [`FetchSource`] and notices explain where the
//! records came from.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use futures::future::join_all;
use options_screener_core::{
    ContractRecord, FallbackConfig, RetryConfig, ScreenerConfig,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::SnapshotCache;
use crate::client::{ChainSource, HttpChainSource, UnconfiguredSource};
use crate::error::{ErrorClass, FeedError, Result};
use crate::normalize::Normalizer;

/// Where the records in a [`ChainSnapshot`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchSource {
    /// Fresh data from the vendor.
    Live,
    /// Vendor unavailable or unauthorized; records come from the static
    /// snapshot.
    Fallback,
    /// Vendor answered and lists no contracts for the symbol.
    Empty,
    /// Nothing could be retrieved (rate limit exhausted or fallback missing).
    Unavailable,
}

impl std::fmt::Display for FetchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Fallback => write!(f, "fallback"),
            Self::Empty => write!(f, "empty"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Informational signal for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchNotice {
    RateLimitExhausted { attempts: u32 },
    LiveFailed { reason: String },
    MissingFallback { path: String, reason: String },
}

impl std::fmt::Display for FetchNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimitExhausted { attempts } => {
                write!(f, "still rate limited after {attempts} attempts")
            }
            Self::LiveFailed { reason } => {
                write!(f, "live data unavailable ({reason}), showing cached snapshot")
            }
            Self::MissingFallback { path, reason } => {
                write!(f, "fallback snapshot {path} unavailable: {reason}")
            }
        }
    }
}

/// Result of one fetch for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSnapshot {
    pub symbol: String,
    /// Evaluation date DTE was computed against.
    pub as_of: NaiveDate,
    pub source: FetchSource,
    pub records: Vec<ContractRecord>,
    pub notices: Vec<FetchNotice>,
}

impl ChainSnapshot {
    fn empty(symbol: &str, as_of: NaiveDate, source: FetchSource, notices: Vec<FetchNotice>) -> Self {
        Self {
            symbol: symbol.to_string(),
            as_of,
            source,
            records: Vec::new(),
            notices,
        }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.source == FetchSource::Live
    }

    /// Live and empty answers reflect the vendor's current state and may be
    /// cached; the other outcomes should be retried on the next request.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        matches!(self.source, FetchSource::Live | FetchSource::Empty)
    }
}

/// Fetches and normalizes option chains with retry and fallback.
pub struct ChainFetcher {
    source: Arc<dyn ChainSource>,
    retry: RetryConfig,
    fallback: Option<FallbackConfig>,
}

impl std::fmt::Debug for ChainFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainFetcher")
            .field("schema", &self.source.schema())
            .field("retry", &self.retry)
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl ChainFetcher {
    pub fn new(
        source: Arc<dyn ChainSource>,
        retry: RetryConfig,
        fallback: Option<FallbackConfig>,
    ) -> Self {
        Self {
            source,
            retry,
            fallback,
        }
    }

    /// Builds an HTTP-backed fetcher from the screener config.
    ///
    /// Missing credentials do not fail construction. Every fetch then reports
    /// a configuration error and is served from the fallback snapshot.
    pub fn from_config(config: &ScreenerConfig) -> Self {
        let source: Arc<dyn ChainSource> = match HttpChainSource::from_config(config) {
            Ok(source) => Arc::new(source),
            Err(err) => {
                warn!(error = %err, "Chain source not configured, only the fallback snapshot is available");
                Arc::new(UnconfiguredSource::new(config.feed.schema, err))
            }
        };
        Self::new(source, config.retry.clone(), config.fallback.clone())
    }

    /// Fetches `symbol`, measuring DTE from today's local date.
    pub async fn fetch(&self, symbol: &str) -> ChainSnapshot {
        self.fetch_as_of(symbol, Local::now().date_naive()).await
    }

    /// Fetches `symbol`, measuring DTE from `as_of`.
    pub async fn fetch_as_of(&self, symbol: &str, as_of: NaiveDate) -> ChainSnapshot {
        let max_attempts = self.retry.max_retries.max(1);
        let mut attempt: u32 = 1;

        loop {
            debug!(symbol, attempt, "Requesting options chain");

            let err = match self.source.fetch_chain(symbol).await {
                Ok(payload) => match self.live(symbol, as_of, &payload) {
                    Ok(snapshot) => return snapshot,
                    Err(err) => err,
                },
                Err(err) => err,
            };

            match err.class() {
                ErrorClass::RateLimited if attempt < max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        symbol,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                ErrorClass::RateLimited => {
                    warn!(symbol, attempts = attempt, "Rate limit retries exhausted");
                    return ChainSnapshot::empty(
                        symbol,
                        as_of,
                        FetchSource::Unavailable,
                        vec![FetchNotice::RateLimitExhausted { attempts: attempt }],
                    );
                }
                ErrorClass::Unauthorized => {
                    warn!(symbol, error = %err, "Unauthorized, using fallback snapshot");
                    return self.fallback(symbol, as_of, &err).await;
                }
                ErrorClass::Transient => {
                    warn!(symbol, error = %err, "Fetch failed, using fallback snapshot");
                    return self.fallback(symbol, as_of, &err).await;
                }
            }
        }
    }

    /// Fetches several symbols concurrently. Each symbol retries and falls
    /// back on its own; results are in input order.
    pub async fn fetch_many<S: AsRef<str>>(&self, symbols: &[S]) -> Vec<ChainSnapshot> {
        self.fetch_many_as_of(symbols, Local::now().date_naive()).await
    }

    /// [`Self::fetch_many`] with an explicit evaluation date.
    pub async fn fetch_many_as_of<S: AsRef<str>>(
        &self,
        symbols: &[S],
        as_of: NaiveDate,
    ) -> Vec<ChainSnapshot> {
        join_all(
            symbols
                .iter()
                .map(|symbol| self.fetch_as_of(symbol.as_ref(), as_of)),
        )
        .await
    }

    /// Returns an unexpired cached snapshot, or fetches and caches a fresh
    /// one when the result is cacheable.
    ///
    /// Concurrent misses for the same symbol are serialized: one caller
    /// fetches, the others wait and read what it cached.
    pub async fn fetch_cached(&self, symbol: &str, cache: &SnapshotCache) -> Arc<ChainSnapshot> {
        self.fetch_cached_as_of(symbol, Local::now().date_naive(), cache)
            .await
    }

    /// [`Self::fetch_cached`] with an explicit evaluation date for misses.
    pub async fn fetch_cached_as_of(
        &self,
        symbol: &str,
        as_of: NaiveDate,
        cache: &SnapshotCache,
    ) -> Arc<ChainSnapshot> {
        if let Some(hit) = cache.get(symbol) {
            debug!(symbol, "Snapshot cache hit");
            return hit;
        }

        let fill = cache.fill_lock(symbol);
        let _guard = fill.lock().await;
        if let Some(hit) = cache.get(symbol) {
            debug!(symbol, "Snapshot cached by a concurrent fetch");
            return hit;
        }

        let snapshot = self.fetch_as_of(symbol, as_of).await;
        if snapshot.is_cacheable() {
            cache.insert(snapshot)
        } else {
            Arc::new(snapshot)
        }
    }

    /// Normalizes a successful payload. A payload whose every contract was
    /// skipped is malformed rather than empty.
    fn live(&self, symbol: &str, as_of: NaiveDate, payload: &serde_json::Value) -> Result<ChainSnapshot> {
        let batch = Normalizer::new(self.source.schema(), as_of).normalize(payload, Some(symbol));

        if batch.records.is_empty() {
            if let Some(first) = batch.skipped.first() {
                return Err(FeedError::Malformed(format!(
                    "all {} contracts unusable, first: {first}",
                    batch.skipped.len()
                )));
            }
        }

        let source = if batch.records.is_empty() {
            FetchSource::Empty
        } else {
            FetchSource::Live
        };

        info!(
            symbol,
            source = %source,
            records = batch.records.len(),
            skipped = batch.skipped.len(),
            "Fetched options chain"
        );

        Ok(ChainSnapshot {
            symbol: symbol.to_string(),
            as_of,
            source,
            records: batch.records,
            notices: Vec::new(),
        })
    }

    async fn fallback(&self, symbol: &str, as_of: NaiveDate, cause: &FeedError) -> ChainSnapshot {
        let mut notices = vec![FetchNotice::LiveFailed {
            reason: cause.to_string(),
        }];

        match self.load_fallback(as_of).await {
            Ok(records) => {
                info!(symbol, records = records.len(), "Loaded fallback snapshot");
                ChainSnapshot {
                    symbol: symbol.to_string(),
                    as_of,
                    source: FetchSource::Fallback,
                    records,
                    notices,
                }
            }
            Err(FeedError::MissingFallback { path, reason }) => {
                warn!(symbol, path = %path, reason = %reason, "Fallback snapshot unavailable");
                notices.push(FetchNotice::MissingFallback { path, reason });
                ChainSnapshot::empty(symbol, as_of, FetchSource::Unavailable, notices)
            }
            Err(other) => {
                warn!(symbol, error = %other, "Fallback snapshot unavailable");
                notices.push(FetchNotice::MissingFallback {
                    path: String::new(),
                    reason: other.to_string(),
                });
                ChainSnapshot::empty(symbol, as_of, FetchSource::Unavailable, notices)
            }
        }
    }

    async fn load_fallback(&self, as_of: NaiveDate) -> Result<Vec<ContractRecord>> {
        let Some(config) = &self.fallback else {
            return Err(FeedError::missing_fallback("<none>", "no fallback snapshot configured"));
        };
        let path = config.path.display().to_string();

        let raw = tokio::fs::read_to_string(&config.path)
            .await
            .map_err(|e| FeedError::missing_fallback(&path, e.to_string()))?;
        let payload: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| FeedError::missing_fallback(&path, format!("invalid JSON: {e}")))?;

        Ok(Normalizer::new(config.schema, as_of)
            .normalize(&payload, None)
            .records)
    }
}
