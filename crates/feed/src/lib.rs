//! Options chain retrieval for the screener.
//!
//! This crate provides:
//! - HTTP client for the two supported chain vendors, with rate limiting
//! - API key and OAuth 1.0a request signing
//! - Normalization of vendor payloads into [`ContractRecord`]s
//! - Retry with linear backoff on rate limits, and a static fallback snapshot
//! - A TTL cache of fetched snapshots
//!
//! # Example
//!
//! ```ignore
//! use options_screener_core::{rank_by_target, ConfigLoader, RankTarget};
//! use options_screener_feed::ChainFetcher;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let fetcher = ChainFetcher::from_config(&config);
//!
//!     let snapshot = fetcher.fetch("AAPL").await;
//!     println!("{} records ({})", snapshot.records.len(), snapshot.source);
//!
//!     let ranked = rank_by_target(&snapshot.records, &RankTarget { dte: 30, delta: 0.30 });
//!     for scored in ranked.iter().take(10) {
//!         println!("{} score={:.2}", scored.record.display_name(), scored.score);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Failure handling
//!
//! [`ChainFetcher::fetch`] never returns an error. Rate limits are retried;
//! authorization failures, missing credentials and transport failures switch
//! to the configured fallback snapshot. The returned [`ChainSnapshot`] carries a [`FetchSource`] tag and
//! [`FetchNotice`]s describing what happened.
//!
//! [`ContractRecord`]: options_screener_core::ContractRecord

pub mod auth;
pub mod cache;
pub mod client;
pub mod error;
pub mod fetcher;
pub mod normalize;
pub mod schema;

pub use auth::{Credentials, OAuth1Keys};
pub use cache::SnapshotCache;
pub use client::{ChainSource, HttpChainSource, UnconfiguredSource};
pub use error::{ErrorClass, FeedError, Result};
pub use fetcher::{ChainFetcher, ChainSnapshot, FetchNotice, FetchSource};
pub use normalize::{normalize, NormalizedBatch, Normalizer, SkipReason};
pub use schema::FieldMap;
