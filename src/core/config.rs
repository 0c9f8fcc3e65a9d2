//! Configuration management

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::core::client::ApiClientConfig;
use crate::core::errors::{Result, SyncError};
use crate::core::models::LocaleCode;
use crate::core::poller::PollerConfig;
use crate::sync::locales::resolve_target_locales;

/// Prefix for environment overrides, e.g. `DOCS_TRANSLATOR_API_TOKEN`
pub const ENV_PREFIX: &str = "DOCS_TRANSLATOR";

/// Config file looked up when no path is given (any supported extension)
pub const DEFAULT_CONFIG_NAME: &str = "docs-translator";

/// Secret API token. Never printed in full.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

fn default_api_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_i18n_dir() -> PathBuf {
    PathBuf::from("i18n")
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_poll_duration_secs() -> u64 {
    3600
}

/// Project configuration for one documentation site
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub project_id: String,
    #[serde(default)]
    pub api_token: Option<ApiToken>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    pub default_locale: LocaleCode,
    #[serde(default)]
    pub locales: Vec<LocaleCode>,
    #[serde(default)]
    pub source_files: Vec<PathBuf>,
    #[serde(default)]
    pub string_files: Vec<PathBuf>,
    #[serde(default)]
    pub content_dirs: Vec<PathBuf>,
    #[serde(default = "default_i18n_dir")]
    pub i18n_dir: PathBuf,
    #[serde(default = "default_i18n_dir")]
    pub translations_save_path: PathBuf,
    #[serde(default)]
    pub translations_load_path: Option<PathBuf>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub max_poll_attempts: Option<u32>,
    #[serde(default = "default_max_poll_duration_secs")]
    pub max_poll_duration_secs: u64,
}

impl SyncConfig {
    /// Load from a config file layered under `DOCS_TRANSLATOR_*` environment variables.
    ///
    /// Without an explicit path, `docs-translator.{toml,yaml,json}` in the
    /// working directory is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        info!(
            "Loaded configuration for project {} ({} locales)",
            config.project_id,
            config.locales.len()
        );
        Ok(config)
    }

    /// Load from a file only, ignoring the environment
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Apply command-line overrides
    pub fn with_overrides(
        mut self,
        api_token: Option<String>,
        api_base_url: Option<String>,
    ) -> Self {
        if let Some(token) = api_token {
            self.api_token = Some(ApiToken::new(token));
        }
        if let Some(url) = api_base_url {
            self.api_base_url = url;
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(SyncError::validation("project_id is required"));
        }

        let url = &self.api_base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SyncError::validation(format!(
                "api_base_url must be an http(s) URL, got {:?}",
                self.api_base_url
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(SyncError::validation("request_timeout_secs must be greater than 0"));
        }

        if self.poll_interval_ms == 0 {
            return Err(SyncError::validation("poll_interval_ms must be greater than 0"));
        }

        if self.max_poll_attempts == Some(0) {
            return Err(SyncError::validation("max_poll_attempts must be greater than 0"));
        }

        if self.api_token.as_ref().map_or(true, ApiToken::is_empty) {
            warn!("No API token configured; requests will be reported as unauthorized");
        }

        if self.target_locales().is_empty() {
            warn!("No target locales besides {}", self.default_locale);
        }

        Ok(())
    }

    /// Locales to translate into: configured locales minus the default
    pub fn target_locales(&self) -> Vec<LocaleCode> {
        resolve_target_locales(&self.locales, &self.default_locale)
    }

    /// Settings for the HTTP client
    pub fn api_client_config(&self) -> ApiClientConfig {
        ApiClientConfig {
            base_url: self.api_base_url.clone(),
            api_token: self.api_token.clone().filter(|token| !token.is_empty()),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// Settings for the progress poller
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_poll_attempts,
            max_duration: Some(Duration::from_secs(self.max_poll_duration_secs)),
        }
    }
}
