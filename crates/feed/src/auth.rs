//! Credentials and request signing for chain vendors.
//!
//! Two schemes are supported:
//!
//! - API key sent as the `apiKey` query parameter (snapshot vendor)
//! - OAuth 1.0a with HMAC-SHA1 signatures in the `Authorization` header
//!   (paired-chain vendor)
//!
//! # Security
//!
//! - Secrets are read from environment variables named in config
//! - Secrets are held in [`SecretString`] and never logged

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use options_screener_core::{CredentialKind, CredentialsConfig};
use rand::{distributions::Alphanumeric, Rng};
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{FeedError, Result};

/// Query parameter carrying the API key.
pub const API_KEY_PARAM: &str = "apiKey";

/// OAuth 1.0a consumer and access token pair.
pub struct OAuth1Keys {
    consumer_key: String,
    consumer_secret: SecretString,
    token: String,
    token_secret: SecretString,
}

impl std::fmt::Debug for OAuth1Keys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth1Keys")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("token", &self.token)
            .field("token_secret", &"[REDACTED]")
            .finish()
    }
}

impl OAuth1Keys {
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: SecretString,
        token: impl Into<String>,
        token_secret: SecretString,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret,
            token: token.into(),
            token_secret,
        }
    }

    /// Builds the `Authorization` header value for a request with a fresh
    /// nonce and the current timestamp.
    ///
    /// # Errors
    /// Returns error if the system clock is before the Unix epoch.
    pub fn authorization(&self, method: &str, url: &str, params: &[(&str, &str)]) -> Result<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| FeedError::Configuration(format!("failed to get timestamp: {e}")))?
            .as_secs();

        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        self.authorization_with(method, url, params, &nonce, timestamp)
    }

    /// Builds the `Authorization` header value with a fixed nonce and
    /// timestamp (useful for testing).
    ///
    /// # Errors
    /// Returns error if the HMAC key cannot be initialized.
    pub fn authorization_with(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: u64,
    ) -> Result<String> {
        let timestamp = timestamp.to_string();
        let oauth_params = [
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_token", self.token.as_str()),
            ("oauth_version", "1.0"),
        ];

        let signature = self.signature(method, url, params, &oauth_params)?;

        let mut header: Vec<(&str, &str)> = oauth_params.to_vec();
        header.push(("oauth_signature", signature.as_str()));
        header.sort_unstable();

        let fields: Vec<String> = header
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();

        Ok(format!("OAuth {}", fields.join(", ")))
    }

    /// RFC 5849 HMAC-SHA1 signature over method, URL and all parameters.
    fn signature(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        oauth_params: &[(&str, &str)],
    ) -> Result<String> {
        let mut encoded: Vec<(String, String)> = params
            .iter()
            .chain(oauth_params.iter())
            .map(|(k, v)| (encode(k), encode(v)))
            .collect();
        encoded.sort();

        let param_string = encoded
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.to_ascii_uppercase(),
            encode(url),
            encode(&param_string)
        );

        let signing_key = format!(
            "{}&{}",
            encode(self.consumer_secret.expose_secret()),
            encode(self.token_secret.expose_secret())
        );

        let mut mac = Hmac::<Sha1>::new_from_slice(signing_key.as_bytes())
            .map_err(|e| FeedError::Configuration(format!("invalid signing key: {e}")))?;
        mac.update(base_string.as_bytes());

        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

fn encode(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

/// Credential material for one vendor.
#[derive(Debug)]
pub enum Credentials {
    /// Anonymous requests (test endpoints, local mirrors).
    None,
    ApiKey(SecretString),
    OAuth1(OAuth1Keys),
}

impl Credentials {
    /// Reads credential material from the environment variables named in
    /// `config`.
    ///
    /// # Errors
    /// Returns error if a required variable is missing.
    pub fn from_env(config: &CredentialsConfig) -> Result<Self> {
        match config.kind {
            CredentialKind::None => Ok(Self::None),
            CredentialKind::ApiKey => Ok(Self::ApiKey(env_secret(&config.api_key_env)?)),
            CredentialKind::OAuth1 => Ok(Self::OAuth1(OAuth1Keys::new(
                env_var(&config.consumer_key_env)?,
                env_secret(&config.consumer_secret_env)?,
                env_var(&config.token_env)?,
                env_secret(&config.token_secret_env)?,
            ))),
        }
    }

    /// API key credentials from a literal value.
    pub fn api_key(key: impl Into<String>) -> Self {
        Self::ApiKey(SecretString::from(key.into()))
    }
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| FeedError::Configuration(format!("missing environment variable: {name}")))
}

fn env_secret(name: &str) -> Result<SecretString> {
    env_var(name).map(SecretString::from)
}
