//! Engine tunables and the client configuration file.
//!
//! [`EngineConfig`] is what [`crate::SyncEngine`] reads at runtime.
//! [`ClientConfig`] is the user-editable JSON file the CLI loads, layered with
//! `POSTSYNC_*` environment overrides, and converted into an `EngineConfig`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option, parse_flag};

/// Posts requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Distance from the end of the content at which the next page is requested
pub const DEFAULT_LOOKAHEAD: f64 = 50.0;
/// Upper bound on a single remote page fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Public demo API serving the post collection
pub const DEFAULT_API_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// What happens to the page cursor when a pagination fetch fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFailurePolicy {
    /// Keep the advanced cursor; the failed page is skipped
    #[default]
    Advance,
    /// Roll the cursor back so the next request retries the same page
    Retry,
}

/// Runtime settings for the sync engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Posts per remote page
    pub page_size: u32,
    /// Lookahead subtracted from the scroll threshold
    pub lookahead: f64,
    /// Timeout applied to each remote fetch
    pub fetch_timeout: Duration,
    /// Cursor behaviour after a failed pagination fetch
    pub page_failure_policy: PageFailurePolicy,
    /// Insert a stored row when liking a post the store has never seen
    pub persist_unsynced_likes: bool,
}

impl EngineConfig {
    /// Set the page size
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the scroll lookahead
    #[must_use]
    pub const fn with_lookahead(mut self, lookahead: f64) -> Self {
        self.lookahead = lookahead;
        self
    }

    /// Set the remote fetch timeout
    #[must_use]
    pub const fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the pagination failure policy
    #[must_use]
    pub const fn with_page_failure_policy(mut self, policy: PageFailurePolicy) -> Self {
        self.page_failure_policy = policy;
        self
    }

    /// Persist likes on posts that have no stored row yet
    #[must_use]
    pub const fn with_persist_unsynced_likes(mut self, enabled: bool) -> Self {
        self.persist_unsynced_likes = enabled;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            lookahead: DEFAULT_LOOKAHEAD,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            page_failure_policy: PageFailurePolicy::default(),
            persist_unsynced_likes: false,
        }
    }
}

/// User-editable client configuration (JSON)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// `host:port` used for connectivity checks; derived from the API URL when unset
    #[serde(default)]
    pub probe_address: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_lookahead")]
    pub lookahead: f64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default)]
    pub page_failure_policy: PageFailurePolicy,
    #[serde(default)]
    pub persist_unsynced_likes: bool,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

const fn default_lookahead() -> f64 {
    DEFAULT_LOOKAHEAD
}

const fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT.as_secs()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            probe_address: None,
            page_size: DEFAULT_PAGE_SIZE,
            lookahead: DEFAULT_LOOKAHEAD,
            fetch_timeout_secs: default_fetch_timeout_secs(),
            page_failure_policy: PageFailurePolicy::default(),
            persist_unsynced_likes: false,
        }
    }
}

impl ClientConfig {
    /// Parse and validate a JSON payload.
    pub fn parse(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)?;
        config.validate()
    }

    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No client config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw).map_err(|error| match error {
            Error::Serialization(error) => Error::InvalidConfig(format!(
                "failed to parse {}: {error}",
                path.display()
            )),
            other => other,
        })
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Apply `POSTSYNC_*` overrides from the process environment.
    pub fn with_process_env(self) -> Result<Self> {
        self.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `POSTSYNC_*` overrides read through `lookup`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = normalize_text_option(lookup("POSTSYNC_API_URL")) {
            self.api_base_url = url;
        }
        if let Some(address) = normalize_text_option(lookup("POSTSYNC_PROBE_ADDR")) {
            self.probe_address = Some(address);
        }
        if let Some(raw) = normalize_text_option(lookup("POSTSYNC_PAGE_SIZE")) {
            self.page_size = raw
                .parse()
                .map_err(|_| Error::InvalidConfig(format!("POSTSYNC_PAGE_SIZE={raw}")))?;
        }
        if let Some(raw) = normalize_text_option(lookup("POSTSYNC_PERSIST_UNSYNCED_LIKES")) {
            self.persist_unsynced_likes = parse_flag(&raw).ok_or_else(|| {
                Error::InvalidConfig(format!("POSTSYNC_PERSIST_UNSYNCED_LIKES={raw}"))
            })?;
        }
        self.validate()
    }

    fn validate(mut self) -> Result<Self> {
        self.api_base_url = normalize_text_option(Some(self.api_base_url))
            .ok_or_else(|| Error::InvalidConfig("api_base_url must not be empty".to_string()))?;
        if !is_http_url(&self.api_base_url) {
            return Err(Error::InvalidConfig(format!(
                "api_base_url must include http:// or https:// (got {})",
                self.api_base_url
            )));
        }
        if self.page_size == 0 {
            return Err(Error::InvalidConfig("page_size must be positive".to_string()));
        }
        if !self.lookahead.is_finite() || self.lookahead < 0.0 {
            return Err(Error::InvalidConfig(
                "lookahead must be a non-negative number".to_string(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "fetch_timeout_secs must be positive".to_string(),
            ));
        }
        self.probe_address = normalize_text_option(self.probe_address);
        Ok(self)
    }

    /// Engine settings described by this config.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_page_size(self.page_size)
            .with_lookahead(self.lookahead)
            .with_fetch_timeout(Duration::from_secs(self.fetch_timeout_secs))
            .with_page_failure_policy(self.page_failure_policy)
            .with_persist_unsynced_likes(self.persist_unsynced_likes)
    }
}
