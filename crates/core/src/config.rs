use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upstream payload shape a feed or fallback file is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainSchema {
    /// Call/put paired chain (`optionChainResponse.optionPairs`).
    #[serde(alias = "etrade")]
    PairedChain,
    /// Flat snapshot list (`results[]`).
    #[serde(alias = "polygon")]
    SnapshotList,
}

impl std::fmt::Display for ChainSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PairedChain => write!(f, "paired_chain"),
            Self::SnapshotList => write!(f, "snapshot_list"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    pub feed: FeedConfig,
    pub retry: RetryConfig,
    pub fallback: Option<FallbackConfig>,
    pub cache: CacheConfig,
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub schema: ChainSchema,
    pub base_url: String,
    pub timeout_secs: u64,
    pub requests_per_minute: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            schema: ChainSchema::SnapshotList,
            base_url: "https://api.polygon.io".to_string(),
            timeout_secs: 30,
            requests_per_minute: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts allowed while the upstream keeps rate limiting.
    pub max_retries: u32,
    /// Backoff unit; attempt `n` waits `n * base_delay_ms`.
    pub base_delay_ms: u64,
}

impl RetryConfig {
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Wait after the `attempt`-th rate-limited attempt. Saturates at
    /// `Duration::MAX` instead of overflowing.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay()
            .checked_mul(attempt)
            .unwrap_or(Duration::MAX)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    pub path: PathBuf,
    #[serde(default = "default_fallback_schema")]
    pub schema: ChainSchema,
}

fn default_fallback_schema() -> ChainSchema {
    ChainSchema::SnapshotList
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl CacheConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 60 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    None,
    ApiKey,
    #[serde(rename = "oauth1")]
    OAuth1,
}

/// Names of the environment variables holding credential material. The
/// secrets themselves never live in config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub kind: CredentialKind,
    pub api_key_env: String,
    pub consumer_key_env: String,
    pub consumer_secret_env: String,
    pub token_env: String,
    pub token_secret_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            kind: CredentialKind::ApiKey,
            api_key_env: "POLYGON_API_KEY".to_string(),
            consumer_key_env: "ETRADE_CONSUMER_KEY".to_string(),
            consumer_secret_env: "ETRADE_CONSUMER_SECRET".to_string(),
            token_env: "ETRADE_OAUTH_TOKEN".to_string(),
            token_secret_env: "ETRADE_OAUTH_TOKEN_SECRET".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_linear_in_attempt() {
        let retry = RetryConfig {
            max_retries: 3,
            base_delay_ms: 250,
        };
        assert_eq!(retry.backoff(1), Duration::from_millis(250));
        assert_eq!(retry.backoff(3), Duration::from_millis(750));
    }

    #[test]
    fn backoff_saturates_on_huge_delay() {
        let retry = RetryConfig {
            max_retries: 5,
            base_delay_ms: u64::MAX,
        };
        assert_eq!(retry.backoff(3), Duration::MAX);
    }
}
