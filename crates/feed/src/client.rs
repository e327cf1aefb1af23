//! HTTP chain source with client-side rate limiting.
//!
//! One call to [`ChainSource::fetch_chain`] is one attempt. Responses are
//! classified into typed [`FeedError`]s here, at the network boundary, so the
//! fetcher never has to inspect raw HTTP.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use options_screener_core::{ChainSchema, FeedConfig, ScreenerConfig};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::auth::{Credentials, API_KEY_PARAM};
use crate::error::{FeedError, Result};

/// A single-attempt source of raw chain payloads.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Schema of the payloads this source returns.
    fn schema(&self) -> ChainSchema;

    /// Performs one request for `symbol`.
    async fn fetch_chain(&self, symbol: &str) -> Result<Value>;
}

/// Stands in for a vendor source that could not be configured. Every
/// attempt fails with [`FeedError::Configuration`].
#[derive(Debug, Clone)]
pub struct UnconfiguredSource {
    schema: ChainSchema,
    reason: String,
}

impl UnconfiguredSource {
    #[must_use]
    pub fn new(schema: ChainSchema, err: FeedError) -> Self {
        let reason = match err {
            FeedError::Configuration(msg) => msg,
            other => other.to_string(),
        };
        Self { schema, reason }
    }
}

#[async_trait]
impl ChainSource for UnconfiguredSource {
    fn schema(&self) -> ChainSchema {
        self.schema
    }

    async fn fetch_chain(&self, _symbol: &str) -> Result<Value> {
        Err(FeedError::Configuration(self.reason.clone()))
    }
}

/// Options chain source backed by a vendor REST API.
pub struct HttpChainSource {
    base_url: String,
    schema: ChainSchema,
    http: Client,
    rate_limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
    credentials: Credentials,
}

impl std::fmt::Debug for HttpChainSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChainSource")
            .field("base_url", &self.base_url)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl HttpChainSource {
    /// Creates a source from feed settings and explicit credentials.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &FeedConfig, credentials: Credentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FeedError::Network(format!("failed to build HTTP client: {e}")))?;

        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(nonzero!(60u32));
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            schema: config.schema,
            http,
            rate_limiter,
            credentials,
        })
    }

    /// Creates a source from the full screener config, reading credentials
    /// from the environment.
    ///
    /// # Errors
    /// Returns error if credentials are missing or the client cannot be built.
    pub fn from_config(config: &ScreenerConfig) -> Result<Self> {
        let credentials = Credentials::from_env(&config.credentials)?;
        Self::new(&config.feed, credentials)
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Validates a symbol before it is placed in a URL path.
    fn validate_symbol(symbol: &str) -> Result<&str> {
        if symbol.is_empty() {
            return Err(FeedError::InvalidSymbol("symbol cannot be empty".to_string()));
        }

        if !symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
            || symbol.contains("..")
        {
            return Err(FeedError::InvalidSymbol(format!(
                "must contain only alphanumeric, dot, or hyphen: {symbol}"
            )));
        }

        if symbol.len() > 16 {
            return Err(FeedError::InvalidSymbol(format!(
                "exceeds maximum length of 16: {}",
                symbol.len()
            )));
        }

        Ok(symbol)
    }

    /// Endpoint URL and query parameters for a symbol.
    fn request_target(&self, symbol: &str) -> (String, Vec<(&'static str, String)>) {
        match self.schema {
            ChainSchema::PairedChain => (
                format!("{}/optionchains.json", self.base_url),
                vec![
                    ("symbol", symbol.to_string()),
                    ("chainType", "CALLPUT".to_string()),
                    ("includeGreeks", "true".to_string()),
                ],
            ),
            ChainSchema::SnapshotList => (
                format!("{}/v3/snapshot/options/{}", self.base_url, symbol),
                vec![("limit", "250".to_string())],
            ),
        }
    }

    /// Converts a response into a payload or a classified error.
    async fn handle_response(response: reqwest::Response) -> Result<Value> {
        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok());
            return Err(FeedError::rate_limited(retry_after));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(FeedError::from_status(status.as_u16(), text));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(FeedError::Malformed("empty response body".to_string()));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ChainSource for HttpChainSource {
    fn schema(&self) -> ChainSchema {
        self.schema
    }

    async fn fetch_chain(&self, symbol: &str) -> Result<Value> {
        let symbol = Self::validate_symbol(symbol)?;
        self.rate_limiter.until_ready().await;

        let (url, mut params) = self.request_target(symbol);
        let mut request = self.http.get(&url).header("Accept", "application/json");

        match &self.credentials {
            Credentials::None => {}
            Credentials::ApiKey(key) => {
                params.push((API_KEY_PARAM, key.expose_secret().to_string()));
            }
            Credentials::OAuth1(keys) => {
                let signed: Vec<(&str, &str)> =
                    params.iter().map(|(k, v)| (*k, v.as_str())).collect();
                let header = keys.authorization("GET", &url, &signed)?;
                request = request.header("Authorization", header);
            }
        }

        tracing::debug!(url = %url, symbol, "GET options chain");

        let response = request.query(&params).send().await?;
        Self::handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::OAuth1Keys;
    use crate::error::ErrorClass;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn feed_config(base_url: &str, schema: ChainSchema) -> FeedConfig {
        FeedConfig {
            schema,
            base_url: base_url.to_string(),
            timeout_secs: 5,
            requests_per_minute: 600,
        }
    }

    async fn snapshot_source(server: &MockServer) -> HttpChainSource {
        HttpChainSource::new(
            &feed_config(&server.uri(), ChainSchema::SnapshotList),
            Credentials::api_key("test-key"),
        )
        .unwrap()
    }

    async fn mount_status(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/v3/snapshot/options/AAPL"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    // ==================== Classification Tests ====================

    #[tokio::test]
    async fn test_success_returns_payload_with_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/snapshot/options/AAPL"))
            .and(query_param("apiKey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
            .mount(&server)
            .await;

        let source = snapshot_source(&server).await;
        let payload = source.fetch_chain("AAPL").await.unwrap();
        assert_eq!(payload, json!({ "results": [] }));
    }

    #[tokio::test]
    async fn test_429_is_rate_limited_with_retry_after() {
        let server = MockServer::start().await;
        mount_status(&server, ResponseTemplate::new(429).insert_header("Retry-After", "7")).await;

        let err = snapshot_source(&server).await.fetch_chain("AAPL").await.unwrap_err();
        assert!(matches!(
            err,
            FeedError::RateLimited {
                retry_after_secs: Some(7)
            }
        ));
    }

    #[tokio::test]
    async fn test_401_and_403_are_unauthorized() {
        for code in [401u16, 403] {
            let server = MockServer::start().await;
            mount_status(&server, ResponseTemplate::new(code).set_body_string("bad key")).await;

            let err = snapshot_source(&server).await.fetch_chain("AAPL").await.unwrap_err();
            assert!(matches!(err, FeedError::Unauthorized { .. }), "{code}: {err}");
        }
    }

    #[tokio::test]
    async fn test_server_error_is_api_error() {
        let server = MockServer::start().await;
        mount_status(&server, ResponseTemplate::new(502)).await;

        let err = snapshot_source(&server).await.fetch_chain("AAPL").await.unwrap_err();
        assert!(matches!(err, FeedError::Api { status_code: 502, .. }));
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let server = MockServer::start().await;
        mount_status(&server, ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;

        let err = snapshot_source(&server).await.fetch_chain("AAPL").await.unwrap_err();
        assert!(matches!(err, FeedError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_empty_body_is_malformed() {
        let server = MockServer::start().await;
        mount_status(&server, ResponseTemplate::new(200)).await;

        let err = snapshot_source(&server).await.fetch_chain("AAPL").await.unwrap_err();
        assert!(matches!(err, FeedError::Malformed(ref m) if m.contains("empty")));
        assert_eq!(err.class(), ErrorClass::Transient);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let source = HttpChainSource::new(
            &feed_config("http://127.0.0.1:1", ChainSchema::SnapshotList),
            Credentials::None,
        )
        .unwrap();

        let err = source.fetch_chain("AAPL").await.unwrap_err();
        assert!(matches!(err, FeedError::Network(_) | FeedError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_paired_chain_request_is_oauth_signed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/optionchains.json"))
            .and(query_param("symbol", "AAPL"))
            .and(query_param("chainType", "CALLPUT"))
            .and(query_param("includeGreeks", "true"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "optionChainResponse": { "optionPairs": [] }
            })))
            .mount(&server)
            .await;

        let keys = OAuth1Keys::new(
            "ck",
            SecretString::from("cs".to_string()),
            "tk",
            SecretString::from("ts".to_string()),
        );
        let source = HttpChainSource::new(
            &feed_config(&server.uri(), ChainSchema::PairedChain),
            Credentials::OAuth1(keys),
        )
        .unwrap();

        let payload = source.fetch_chain("AAPL").await.unwrap();
        assert!(payload.pointer("/optionChainResponse/optionPairs").is_some());
    }

    // ==================== Input Validation Tests ====================

    #[test]
    fn test_validate_symbol() {
        assert!(HttpChainSource::validate_symbol("AAPL").is_ok());
        assert!(HttpChainSource::validate_symbol("BRK.B").is_ok());
        assert!(HttpChainSource::validate_symbol("").is_err());
        assert!(HttpChainSource::validate_symbol("../etc").is_err());
        assert!(HttpChainSource::validate_symbol("A/B").is_err());
        assert!(HttpChainSource::validate_symbol("A B").is_err());
        assert!(HttpChainSource::validate_symbol(&"A".repeat(17)).is_err());
    }

    #[tokio::test]
    async fn test_invalid_symbol_never_hits_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = snapshot_source(&server).await.fetch_chain("../x").await.unwrap_err();
        assert!(matches!(err, FeedError::InvalidSymbol(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let source = HttpChainSource::new(
            &feed_config("https://api.polygon.io/", ChainSchema::SnapshotList),
            Credentials::None,
        )
        .unwrap();
        assert_eq!(source.base_url(), "https://api.polygon.io");
        let (url, _) = source.request_target("SPY");
        assert_eq!(url, "https://api.polygon.io/v3/snapshot/options/SPY");
    }
}
