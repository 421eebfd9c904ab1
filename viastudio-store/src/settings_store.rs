//! User preferences store.
//!
//! Manages user settings with persistence and change notification.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};
use url::Url;
use viastudio_core::{AspectRatio, DurationTag, GenerationSettings, Resolution, VideoStyle};
use viastudio_fetch::{DEFAULT_POLL_INTERVAL_SECS, FetchSettings};
use viastudio_providers::veo::{DEFAULT_API_BASE, DEFAULT_MODEL};

use crate::error::StoreError;
use crate::persistence::{default_settings_path, load_json, save_json};

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Keys accepted by [`Settings::set_value`], in display order.
pub const SETTING_KEYS: &[&str] = &[
    "ratio",
    "resolution",
    "style",
    "duration",
    "fps",
    "model",
    "api_base_url",
    "poll_interval_secs",
    "request_timeout_secs",
    "history_limit",
    "log_level",
    "strict_credentials",
];

// ============================================================================
// Settings Types
// ============================================================================

/// User settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Form defaults for new generations.
    pub generation: GenerationSettings,

    /// Veo model name.
    pub model: String,

    /// Generative Language API base URL.
    pub api_base_url: String,

    /// Seconds between operation polls.
    pub poll_interval_secs: u64,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum history entries kept in a session. `None` keeps everything.
    pub history_limit: Option<usize>,

    /// Log level when `--verbose` is not given.
    pub log_level: LogLevel,

    /// Re-check the key after selection instead of assuming it worked.
    pub strict_credentials: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            generation: GenerationSettings::default(),
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            history_limit: None,
            log_level: LogLevel::default(),
            strict_credentials: false,
        }
    }
}

impl Settings {
    /// Delay between operation polls (at least one second).
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Per-request timeout (at least one second).
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Timing settings for the fetch context.
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings::default()
            .with_timeout(self.request_timeout())
            .with_poll_interval(self.poll_interval())
    }

    /// Returns one setting formatted for display.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownSetting`] for keys not in [`SETTING_KEYS`].
    pub fn get_value(&self, key: &str) -> Result<String, StoreError> {
        let g = &self.generation;
        let value = match key {
            "ratio" => g.ratio.to_string(),
            "resolution" => g.resolution.to_string(),
            "style" => g.style.to_string(),
            "duration" => g.duration.to_string(),
            "fps" => g.fps.to_string(),
            "model" => self.model.clone(),
            "api_base_url" => self.api_base_url.clone(),
            "poll_interval_secs" => self.poll_interval_secs.to_string(),
            "request_timeout_secs" => self.request_timeout_secs.to_string(),
            "history_limit" => self
                .history_limit
                .map_or_else(|| "none".to_string(), |n| n.to_string()),
            "log_level" => self.log_level.to_string(),
            "strict_credentials" => self.strict_credentials.to_string(),
            other => return Err(StoreError::UnknownSetting(other.to_string())),
        };
        Ok(value)
    }

    /// Parses and applies one setting.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys or values that do not parse.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let value = value.trim();
        match key {
            "ratio" => self.generation.ratio = parse::<AspectRatio>(key, value)?,
            "resolution" => self.generation.resolution = parse::<Resolution>(key, value)?,
            "style" => self.generation.style = parse::<VideoStyle>(key, value)?,
            "duration" => self.generation.duration = parse::<DurationTag>(key, value)?,
            "fps" => self.generation.fps = positive(key, value)?,
            "model" => self.model = non_empty(key, value)?,
            "api_base_url" => {
                let url = non_empty(key, value)?;
                let parsed = Url::parse(&url).map_err(|e| invalid(key, e.to_string()))?;
                if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
                    return Err(invalid(key, "must be an http:// or https:// URL with a host"));
                }
                self.api_base_url = url.trim_end_matches('/').to_string();
            }
            "poll_interval_secs" => self.poll_interval_secs = positive(key, value)?,
            "request_timeout_secs" => self.request_timeout_secs = positive(key, value)?,
            "history_limit" => {
                self.history_limit = match value.to_ascii_lowercase().as_str() {
                    "none" | "off" | "unlimited" => None,
                    _ => Some(positive(key, value)?),
                };
            }
            "log_level" => self.log_level = parse::<LogLevel>(key, value)?,
            "strict_credentials" => {
                self.strict_credentials = value
                    .parse()
                    .map_err(|_| invalid(key, "expected true or false"))?;
            }
            other => return Err(StoreError::UnknownSetting(other.to_string())),
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> StoreError {
    StoreError::InvalidSetting {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| invalid(key, e.to_string()))
}

fn positive<T>(key: &str, value: &str) -> Result<T, StoreError>
where
    T: FromStr + Default + PartialOrd,
{
    match value.parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(invalid(key, "expected a positive number")),
    }
}

fn non_empty(key: &str, value: &str) -> Result<String, StoreError> {
    if value.is_empty() {
        Err(invalid(key, "must not be empty"))
    } else {
        Ok(value.to_string())
    }
}

/// Logging verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and errors.
    #[default]
    Warn,
    /// Informational messages.
    Info,
    /// Debug output.
    Debug,
    /// Everything.
    Trace,
}

impl LogLevel {
    /// Returns the level as a filter directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Settings with persistence and change notification.
#[derive(Debug)]
pub struct SettingsStore {
    settings: Arc<RwLock<Settings>>,
    path: PathBuf,
    notify: watch::Sender<u64>,
    version: Arc<RwLock<u64>>,
}

impl SettingsStore {
    /// Creates a store with default settings, saved to `path`.
    pub fn new(path: PathBuf) -> Self {
        Self::with_settings(path, Settings::default())
    }

    fn with_settings(path: PathBuf, settings: Settings) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            settings: Arc::new(RwLock::new(settings)),
            path,
            notify,
            version: Arc::new(RwLock::new(0)),
        }
    }

    /// Loads settings from the default location.
    ///
    /// # Errors
    ///
    /// Currently infallible; a missing or corrupt file yields defaults.
    pub async fn load_default() -> Result<Self, StoreError> {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from `path`.
    ///
    /// # Errors
    ///
    /// Currently infallible; a missing or corrupt file yields defaults.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let settings = if path.exists() {
            info!(path = %path.display(), "Loading settings");
            load_json(&path).await.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to load settings, using defaults");
                Settings::default()
            })
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            Settings::default()
        };

        Ok(Self::with_settings(path, settings))
    }

    /// Returns where settings are saved.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Applies a change and notifies subscribers.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        {
            let mut settings = self.settings.write().await;
            f(&mut settings);
        }
        self.notify_change().await;
    }

    /// Parses and applies one setting by key.
    ///
    /// # Errors
    ///
    /// See [`Settings::set_value`]. Nothing changes on error.
    pub async fn set_value(&self, key: &str, value: &str) -> Result<(), StoreError> {
        {
            let mut settings = self.settings.write().await;
            let mut next = settings.clone();
            next.set_value(key, value)?;
            *settings = next;
        }
        self.notify_change().await;
        Ok(())
    }

    /// Restores defaults.
    pub async fn reset(&self) {
        self.update(|s| *s = Settings::default()).await;
    }

    /// Saves settings to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().await;
        save_json(&self.path, &*settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }

    /// Subscribes to change notifications.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    async fn notify_change(&self) {
        let mut version = self.version.write().await;
        *version += 1;
        let _ = self.notify.send(*version);
    }

    // ========================================================================
    // Convenience Methods
    // ========================================================================

    /// Returns the form defaults.
    pub async fn generation(&self) -> GenerationSettings {
        self.settings.read().await.generation.clone()
    }

    /// Replaces the form defaults.
    pub async fn set_generation(&self, generation: GenerationSettings) {
        self.update(|s| s.generation = generation).await;
    }

    /// Returns the history cap.
    pub async fn history_limit(&self) -> Option<usize> {
        self.settings.read().await.history_limit
    }
}

// ============================================================================
// Tests
// ============================================================================
