use std::path::PathBuf;
use std::time::Duration;

use domain::services::Locale;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub session: SessionConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Usernames refused before any backend call
    #[serde(default = "default_reserved_usernames")]
    pub reserved_usernames: Vec<String>,

    /// Refresh once fewer than this many seconds remain on the token
    #[serde(default = "default_refresh_threshold")]
    pub refresh_threshold_secs: i64,

    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_countdown_tick")]
    pub countdown_tick_secs: u64,

    /// Idle window granted by operator activity
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: i64,

    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Re-arm an identical code after this many seconds; 0 keeps it
    /// suppressed until explicitly reset.
    #[serde(default)]
    pub rearm_after_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_locale")]
    pub locale: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            rearm_after_secs: 0,
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reserved_usernames: default_reserved_usernames(),
            refresh_threshold_secs: default_refresh_threshold(),
            refresh_interval_secs: default_refresh_interval(),
            countdown_tick_secs: default_countdown_tick(),
            idle_timeout_secs: default_idle_timeout(),
            token_path: default_token_path(),
        }
    }
}

// Default value functions
fn default_request_timeout() -> u64 {
    15
}
fn default_reserved_usernames() -> Vec<String> {
    vec!["admin".to_string()]
}
fn default_refresh_threshold() -> i64 {
    300
}
fn default_refresh_interval() -> u64 {
    60
}
fn default_countdown_tick() -> u64 {
    1
}
fn default_idle_timeout() -> i64 {
    3600
}
fn default_token_path() -> PathBuf {
    PathBuf::from(".event-console/token")
}
fn default_locale() -> String {
    "tr".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "compact".to_string()
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with EC__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("EC").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration from embedded defaults plus overrides.
    ///
    /// Does not touch the file system, so integration tests can point the
    /// console at a stub backend.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [backend]
            base_url = "http://127.0.0.1:5000"
            request_timeout_secs = 5

            [session]
            reserved_usernames = ["admin"]
            refresh_threshold_secs = 300
            refresh_interval_secs = 60
            countdown_tick_secs = 1
            idle_timeout_secs = 3600
            token_path = "target/test-token"

            [scanner]
            rearm_after_secs = 0

            [console]
            locale = "en"

            [logging]
            level = "debug"
            format = "pretty"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let url = self.backend.base_url.trim();
        if url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "EC__BACKEND__BASE_URL must be set".to_string(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigValidationError::InvalidValue(format!(
                "backend.base_url must be an http(s) URL, got {}",
                url
            )));
        }

        if self.backend.request_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "backend.request_timeout_secs cannot be 0".to_string(),
            ));
        }

        if self.session.refresh_interval_secs == 0 || self.session.countdown_tick_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "session timer intervals cannot be 0".to_string(),
            ));
        }

        if self.session.idle_timeout_secs <= 0 {
            return Err(ConfigValidationError::InvalidValue(
                "session.idle_timeout_secs must be positive".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "compact" | "pretty" | "json") {
            return Err(ConfigValidationError::InvalidValue(format!(
                "logging.format must be compact, pretty or json, got {}",
                self.logging.format
            )));
        }

        if self.console.locale.parse::<Locale>().is_err() {
            return Err(ConfigValidationError::InvalidValue(format!(
                "console.locale must be one of tr, en, fr, got {}",
                self.console.locale
            )));
        }

        Ok(())
    }

    /// Operator locale; validated on load, Turkish otherwise.
    pub fn locale(&self) -> Locale {
        self.console.locale.parse().unwrap_or_default()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.request_timeout_secs)
    }

    pub fn rearm_after(&self) -> Option<Duration> {
        match self.scanner.rearm_after_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> String {
        self.backend.base_url.trim().trim_end_matches('/').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_load_with_defaults() {
        let config = Config::load_for_test(&[]).expect("Failed to load config");

        assert_eq!(config.backend.request_timeout_secs, 5);
        assert_eq!(config.session.reserved_usernames, vec!["admin".to_string()]);
        assert_eq!(config.session.refresh_threshold_secs, 300);
        assert_eq!(config.session.idle_timeout_secs, 3600);
        assert_eq!(config.scanner.rearm_after_secs, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_override() {
        let config = Config::load_for_test(&[
            ("backend.base_url", "https://backend.example.org/"),
            ("console.locale", "fr"),
            ("scanner.rearm_after_secs", "30"),
        ])
        .expect("Failed to load config");

        assert_eq!(config.base_url(), "https://backend.example.org");
        assert_eq!(config.locale(), Locale::Fr);
        assert_eq!(config.rearm_after(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_rearm_disabled_by_default() {
        let config = Config::load_for_test(&[]).unwrap();
        assert_eq!(config.rearm_after(), None);
    }

    #[test]
    fn test_config_validation_missing_url() {
        let config = Config::load_for_test(&[("backend.base_url", "")]).unwrap();
        let result = config.validate();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("EC__BACKEND__BASE_URL"));
    }

    #[test]
    fn test_config_validation_bad_scheme() {
        let config = Config::load_for_test(&[("backend.base_url", "ftp://host")]).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let config = Config::load_for_test(&[("backend.request_timeout_secs", "0")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_unknown_locale() {
        let config = Config::load_for_test(&[("console.locale", "de")]).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("console.locale"));
    }
}
