use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::retry::RetryPolicy;

/// Runtime settings of the handler. Everything about the managed resources
/// comes from the event itself; this only tunes how the engine talks to the
/// outside world.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HandlerConfig {
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrySettings {
    /// Total create attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_delay_ms() -> u64 {
    5000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpSettings {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl HandlerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be > 0".into());
        }
        if self.http.timeout_ms == 0 || self.http.connect_timeout_ms == 0 {
            return Err("http timeouts must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    /// Load from an optional TOML file (default `ctcfn.toml` when present),
    /// then environment overrides such as `CTCFN__RETRY__MAX_ATTEMPTS=3`.
    pub fn load(path: Option<&str>) -> EngineResult<Self> {
        let mut builder = Config::builder();
        let path = PathBuf::from(path.unwrap_or("ctcfn.toml"));
        if path.exists() {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("CTCFN")
                .try_parsing(true)
                .separator("__"),
        );
        Self::from_config(builder.build())
    }

    fn from_config(built: Result<Config, config::ConfigError>) -> EngineResult<Self> {
        let cfg = built.map_err(|e| EngineError::Configuration(format!("config build error: {e}")))?;
        let merged: HandlerConfig = cfg
            .try_deserialize()
            .map_err(|e| EngineError::Configuration(format!("config deserialize error: {e}")))?;
        merged.validate().map_err(EngineError::Configuration)?;
        Ok(merged)
    }
}
