//! Application configuration.

use crate::domain::keybinding::Action;
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub(crate) const APP_NAME: &str = "taskflow";
pub(crate) const APP_QUALIFIER: &str = "app";
pub(crate) const APP_ORGANIZATION: &str = "taskflow";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, read from `config.toml` and overridden by CLI.
#[derive(Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Base URL of the task API; the push channel lives on the same host.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Expected `aud` of Google ID tokens. Unchecked when absent.
    #[serde(default)]
    pub google_client_id: Option<String>,

    /// Remember the token in the system keyring after signing in.
    #[serde(default = "default_true")]
    pub persist_token: bool,

    /// Subscribe to pushed task deletions.
    #[serde(default = "default_true")]
    pub live_updates: bool,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Custom keybindings.
    #[serde(default)]
    pub keybindings: HashMap<String, Action>,

    /// UI configuration.
    #[serde(default)]
    pub ui: UiConfig,
}

/// UI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Notification duration in seconds.
    #[serde(default = "default_notification_duration")]
    pub notification_duration: u64,

    /// Deadline format on task cards (chrono format).
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Highlight overdue tasks.
    #[serde(default = "default_true")]
    pub highlight_overdue: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            notification_duration: default_notification_duration(),
            date_format: default_date_format(),
            highlight_overdue: true,
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_date_format() -> String {
    "%b %d, %Y".to_string()
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_notification_duration() -> u64 {
    4
}

use super::args::CliArgs;
use super::storage::ConfigError;

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    ///
    /// The token is not part of the configuration; take it out of `args`
    /// before merging.
    pub fn merge_with_args(&mut self, args: CliArgs) {
        if let Some(config_path) = args.config {
            self.config = Some(config_path);
        }
        if let Some(log_path) = args.log_path {
            self.log_path = Some(log_path);
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(api_url) = args.api_url.filter(|url| !url.trim().is_empty()) {
            self.api_url = api_url;
        }
        if let Some(client_id) = args.google_client_id {
            self.google_client_id = Some(client_id);
        }
        if let Some(persist) = args.persist_token {
            self.persist_token = persist;
        }
        if let Some(live_updates) = args.live_updates {
            self.live_updates = live_updates;
        }
        if let Some(timeout) = args.request_timeout {
            self.request_timeout = timeout;
        }
        if let Some(notification_duration) = args.notification_duration {
            self.ui.notification_duration = notification_duration;
        }
    }

    /// Parses the configured API base URL.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidApiUrl` for unparsable or non-http(s) URLs.
    pub fn api_base_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidApiUrl {
            url: self.api_url.clone(),
            reason,
        };
        let url = Url::parse(self.api_url.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()));
        }
        Ok(url)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    #[must_use]
    pub const fn notification_duration(&self) -> Duration {
        Duration::from_secs(self.ui.notification_duration)
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("taskflow.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            api_url: default_api_url(),
            google_client_id: None,
            persist_token: true,
            live_updates: true,
            request_timeout: default_request_timeout(),
            keybindings: HashMap::new(),
            ui: UiConfig::default(),
        }
    }
}
