//! Client configuration.
//!
//! Defaults target the public Freesound API. `ClientConfig::from_env` layers
//! environment overrides on top of the defaults; any value that fails to
//! parse is a `Config` error rather than a silent fallback.

use std::fmt;
use std::time::Duration;

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://freesound.org/apiv2";

/// Default `page_size` sent with paged requests. Matches the server default.
pub const DEFAULT_PAGE_SIZE: u32 = 15;

/// Upper bound the server accepts for `page_size`.
pub const MAX_PAGE_SIZE: u32 = 150;

pub const ENV_BASE_URL: &str = "FREESOUND_API_BASE";
pub const ENV_CLIENT_ID: &str = "FREESOUND_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "FREESOUND_CLIENT_SECRET";
pub const ENV_PAGE_SIZE: &str = "FREESOUND_PAGE_SIZE";
pub const ENV_TIMEOUT_SECS: &str = "FREESOUND_TIMEOUT_SECS";

/// Client credential pair issued by Freesound.
///
/// The secret doubles as the API token for token authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Needed by every endpoint flagged as auth-required.
    pub credentials: Option<Credentials>,
    pub page_size: u32,
    /// Whole-request timeout applied by the async transport.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials: None,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Clamped to `1..=MAX_PAGE_SIZE`.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Defaults overridden by `FREESOUND_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_BASE_URL) {
            Some(base) => Self::new(&base),
            None => Self::default(),
        };

        match (lookup(ENV_CLIENT_ID), lookup(ENV_CLIENT_SECRET)) {
            (Some(id), Some(secret)) => config.credentials = Some(Credentials::new(id, secret)),
            (None, None) => {}
            (Some(_), None) => {
                return Err(ApiError::config(format!("{ENV_CLIENT_ID} is set but {ENV_CLIENT_SECRET} is not")));
            }
            (None, Some(_)) => {
                return Err(ApiError::config(format!("{ENV_CLIENT_SECRET} is set but {ENV_CLIENT_ID} is not")));
            }
        }

        if let Some(raw) = lookup(ENV_PAGE_SIZE) {
            let size: u32 = raw
                .trim()
                .parse()
                .map_err(|_| ApiError::config(format!("{ENV_PAGE_SIZE}={raw:?} is not a number")))?;
            if size == 0 || size > MAX_PAGE_SIZE {
                return Err(ApiError::config(format!(
                    "{ENV_PAGE_SIZE}={size} is outside 1..={MAX_PAGE_SIZE}"
                )));
            }
            config.page_size = size;
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ApiError::config(format!("{ENV_TIMEOUT_SECS}={raw:?} is not a number")))?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}
