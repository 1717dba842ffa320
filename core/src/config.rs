//! Connection settings for a `PromptPilot` client.

use std::fmt;
use std::time::Duration;

use crate::error::{PromptPilotError, Result};

/// Production endpoint used when no base URL is supplied.
pub const DEFAULT_BASE_URL: &str = "https://your-domain.com";

/// Per-call timeout used when none is supplied.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Value of the `User-Agent` header sent with every request.
pub const USER_AGENT: &str = concat!("promptpilot-rust/", env!("CARGO_PKG_VERSION"));

pub const API_KEY_ENV: &str = "PROMPTPILOT_API_KEY";
pub const BASE_URL_ENV: &str = "PROMPTPILOT_BASE_URL";
pub const TIMEOUT_ENV: &str = "PROMPTPILOT_TIMEOUT_SECS";

/// Immutable client settings. The base URL never ends with `/`.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read settings from `PROMPTPILOT_API_KEY`, `PROMPTPILOT_BASE_URL` and
    /// `PROMPTPILOT_TIMEOUT_SECS`. Only the key is required.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(API_KEY_ENV)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| PromptPilotError::Validation(format!("{API_KEY_ENV} is not set")))?;

        let mut config = Self::new(api_key);
        if let Some(base_url) = lookup(BASE_URL_ENV) {
            config = config.with_base_url(&base_url);
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                PromptPilotError::Validation(format!(
                    "{TIMEOUT_ENV} must be a whole number of seconds, got {raw:?}"
                ))
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
