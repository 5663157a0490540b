//! Backend base-URL configuration, resolved once at process start. The base
//! URL is validated up front so every later request can assume a usable
//! `http(s)` endpoint; trailing slashes are stripped so path joining stays
//! predictable.

use thiserror::Error;
use url::Url;

/// Environment variable holding the wallet backend base URL.
pub const BACKEND_URL_ENV: &str = "WALLET_BACKEND_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{BACKEND_URL_ENV} is not set")]
    MissingBackendUrl,
    #[error("invalid backend URL: {0}")]
    InvalidBackendUrl(String),
}

/// Configuration for the wallet backend connection.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backend_url: String,
}

impl AppConfig {
    /// Build a configuration from an explicit base URL.
    ///
    /// # Errors
    /// Returns an error if the URL cannot be parsed, has no host, or uses a
    /// scheme other than http(s).
    pub fn new(backend_url: &str) -> Result<Self, ConfigError> {
        let trimmed = backend_url.trim();
        let url = Url::parse(trimmed)
            .map_err(|err| ConfigError::InvalidBackendUrl(err.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ConfigError::InvalidBackendUrl(format!(
                    "unsupported scheme {scheme}"
                )))
            }
        }

        if url.host().is_none() {
            return Err(ConfigError::InvalidBackendUrl(
                "no host specified".to_string(),
            ));
        }

        Ok(Self {
            backend_url: trimmed.trim_end_matches('/').to_string(),
        })
    }

    /// Read the backend URL from `WALLET_BACKEND_URL`.
    ///
    /// # Errors
    /// Returns an error if the variable is unset, empty, or not a valid
    /// http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var(BACKEND_URL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingBackendUrl)?;
        Self::new(&raw)
    }
}
