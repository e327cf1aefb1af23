//! Core types for the options chain screener.
//!
//! - [`types`]: the normalized [`ContractRecord`] every vendor payload maps to
//! - [`ranking`]: closest-match scoring and threshold filtering
//! - [`config`] / [`config_loader`]: screener configuration via figment

pub mod config;
pub mod config_loader;
pub mod ranking;
pub mod types;

pub use config::{
    CacheConfig, ChainSchema, CredentialKind, CredentialsConfig, FallbackConfig, FeedConfig,
    RetryConfig, ScreenerConfig,
};
pub use config_loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
pub use ranking::{
    deviation_score, filter_by_threshold, only_type, rank_by_target, RankTarget, ScoredContract,
    ThresholdFilter,
};
pub use types::{days_between, ContractRecord, ContractType, Greeks};
