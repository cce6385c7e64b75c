//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/vortex/config.toml`, or from the
//! path in `VORTEX_CONFIG` when set.
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/vortex/` (~/.config/vortex/)
//! - Data: `$XDG_DATA_HOME/vortex/` (~/.local/share/vortex/), holds the identity file
//! - State/Logs: `$XDG_STATE_HOME/vortex/` (~/.local/state/vortex/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "VORTEX_CONFIG";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Event tracker configuration
    #[serde(default)]
    pub tracker: TrackerConfig,
}

/// On-disk layout of `config.toml`
#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    logging: LoggingConfig,
    tracker: Option<TrackerConfig>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Vortex tracker configuration
///
/// ```toml
/// [tracker]
/// tenant_id = "alpha"
/// base_url = "https://in.vortexanalytics.io"
/// platform = "linux"
/// auto_batching = true
/// flush_interval_secs = 10
/// ```
#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    /// Master switch; a disabled tracker is never constructed
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Tenant the events are scoped to on the collector
    pub tenant_id: Option<String>,

    /// Collector base URL (e.g., `https://in.vortexanalytics.io`)
    pub base_url: Option<String>,

    /// Platform label attached to every event
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Application version attached to every event
    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// Queue every track call and send only on flush
    #[serde(default)]
    pub auto_batching: bool,

    /// Seconds between automatic flushes when auto-batching
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,

    /// Upper bound on the startup health probe
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Upper bound on the final send during shutdown
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_ms: u64,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Record an `app_started` event as soon as the tracker is up
    #[serde(default = "default_track_app_started")]
    pub track_app_started: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            tenant_id: None,
            base_url: None,
            platform: default_platform(),
            app_version: default_app_version(),
            auto_batching: false,
            flush_interval_secs: default_flush_interval(),
            probe_timeout_secs: default_probe_timeout(),
            shutdown_timeout_ms: default_shutdown_timeout(),
            request_timeout_secs: default_request_timeout(),
            track_app_started: default_track_app_started(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_platform() -> String {
    std::env::consts::OS.to_string()
}

fn default_app_version() -> String {
    "1.0.0".to_string()
}

fn default_flush_interval() -> u64 {
    10
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_shutdown_timeout() -> u64 {
    2000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_track_app_started() -> bool {
    true
}

impl TrackerConfig {
    /// Convenience constructor for the two required fields
    pub fn new(tenant_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            base_url: Some(base_url.into()),
            ..Default::default()
        }
    }

    /// Check if the tracker is enabled and has everything it needs
    pub fn is_ready(&self) -> bool {
        self.enabled && self.validate().is_ok()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        match self.tenant_id.as_deref() {
            Some(id) if !id.trim().is_empty() => {}
            _ => {
                return Err(Error::Config(
                    "tracker.tenant_id is required when tracker is enabled".to_string(),
                ))
            }
        }

        let url = self.base_url.as_deref().ok_or_else(|| {
            Error::Config("tracker.base_url is required when tracker is enabled".to_string())
        })?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::Config(
                "tracker.base_url must start with http:// or https://".to_string(),
            ));
        }

        if self.flush_interval_secs == 0 {
            return Err(Error::Config(
                "tracker.flush_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.probe_timeout_secs == 0 {
            return Err(Error::Config(
                "tracker.probe_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL with any trailing slashes removed
    pub fn normalized_base_url(&self) -> Option<String> {
        self.base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load configuration from `VORTEX_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let config_path = std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(Self::config_path);

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let file: ConfigFile = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        // only a [tracker] section present in the file is validated
        if let Some(tracker) = &file.tracker {
            tracker.validate()?;
        }

        Ok(Config {
            logging: file.logging,
            tracker: file.tracker.unwrap_or_default(),
        })
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/vortex/config.toml` (~/.config/vortex/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("vortex").join("config.toml")
    }

    /// Returns the data directory path
    ///
    /// `$XDG_DATA_HOME/vortex/` (~/.local/share/vortex/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("vortex")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/vortex/` (~/.local/state/vortex/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("vortex")
    }

    /// Returns the persisted identity file path
    ///
    /// `$XDG_DATA_HOME/vortex/identity` (~/.local/share/vortex/identity)
    pub fn identity_path() -> PathBuf {
        Self::data_dir().join("identity")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert!(config.tracker.enabled);
        assert!(config.tracker.tenant_id.is_none());
    }

    #[test]
    fn test_tracker_config_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.app_version, "1.0.0");
        assert!(!config.auto_batching);
        assert_eq!(config.flush_interval(), Duration::from_secs(10));
        assert_eq!(config.probe_timeout(), Duration::from_secs(5));
        assert_eq!(config.shutdown_timeout(), Duration::from_millis(2000));
        assert!(config.track_app_started);
        assert!(!config.is_ready());
    }

    #[test]
    fn test_tracker_config_validation() {
        // Disabled config is always valid
        let config = TrackerConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert!(!config.is_ready());

        // Enabled without tenant should fail
        let config = TrackerConfig {
            base_url: Some("https://in.example.com".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        // Bad scheme
        let config = TrackerConfig::new("alpha", "in.example.com");
        assert!(config.validate().is_err());

        // Zero interval
        let config = TrackerConfig {
            flush_interval_secs: 0,
            ..TrackerConfig::new("alpha", "https://in.example.com")
        };
        assert!(config.validate().is_err());

        // Zero probe timeout
        let config = TrackerConfig {
            probe_timeout_secs: 0,
            ..TrackerConfig::new("alpha", "https://in.example.com")
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("probe_timeout_secs"));

        let config = TrackerConfig::new("alpha", "https://in.example.com");
        assert!(config.validate().is_ok());
        assert!(config.is_ready());
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let config = TrackerConfig::new("alpha", "https://in.example.com//");
        assert_eq!(
            config.normalized_base_url().as_deref(),
            Some("https://in.example.com")
        );
    }

    #[test]
    fn test_parse_tracker_config() {
        let toml = r#"
[logging]
level = "debug"

[tracker]
tenant_id = "alpha"
base_url = "http://localhost:9876/"
platform = "steamdeck"
app_version = "2.3.1"
auto_batching = true
flush_interval_secs = 30
shutdown_timeout_ms = 500
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.tracker.tenant_id.as_deref(), Some("alpha"));
        assert_eq!(config.tracker.platform, "steamdeck");
        assert_eq!(config.tracker.app_version, "2.3.1");
        assert!(config.tracker.auto_batching);
        assert_eq!(config.tracker.flush_interval_secs, 30);
        assert_eq!(config.tracker.probe_timeout_secs, 5);
        assert_eq!(config.tracker.shutdown_timeout_ms, 500);
        assert!(config.tracker.is_ready());
    }

    #[test]
    fn test_load_from_rejects_invalid_tracker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tracker]\nbase_url = \"ftp://nope\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_accepts_logging_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.tracker.enabled);
        assert!(!config.tracker.is_ready());
    }

    #[test]
    fn test_load_from_rejects_zero_probe_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[tracker]\ntenant_id = \"alpha\"\nbase_url = \"http://localhost:9876\"\nprobe_timeout_secs = 0\n",
        )
        .unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_identity_path_under_data_dir() {
        assert!(Config::identity_path().starts_with(Config::data_dir()));
        assert!(Config::identity_path().ends_with("vortex/identity"));
    }
}
