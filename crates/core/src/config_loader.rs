use crate::config::ScreenerConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

/// Default location of the screener configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/Screener.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Builds the provider stack: built-in defaults, then the TOML file, then
    /// `SCREENER_`-prefixed environment variables (`__` separates nested keys).
    #[must_use]
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(ScreenerConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SCREENER_").split("__"))
    }

    /// Loads configuration from [`DEFAULT_CONFIG_PATH`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be parsed.
    pub fn load() -> Result<ScreenerConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration from a specific TOML file. A missing file falls
    /// back to defaults plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<ScreenerConfig> {
        let path = path.as_ref();
        let config: ScreenerConfig = Self::figment(path)
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        tracing::debug!(
            path = %path.display(),
            schema = %config.feed.schema,
            max_retries = config.retry.max_retries,
            "Loaded screener config"
        );

        Ok(config)
    }
}
