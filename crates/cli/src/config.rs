//! `laminate.toml` loading, environment overrides, and validation.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine::OrchestratorConfig;
use serde::Deserialize;
use thiserror::Error;
use transform_api::{RemoteConfig, DEFAULT_TIMEOUT};

/// Read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "laminate.toml";

pub const ENV_REMOTE_URL: &str = "LAMINATE_REMOTE_URL";
pub const ENV_BIND: &str = "LAMINATE_BIND";
pub const ENV_OTLP_ENDPOINT: &str = "LAMINATE_OTLP_ENDPOINT";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} in {var}: {message}")]
    Env {
        var: &'static str,
        value: String,
        message: String,
    },

    /// A value parsed but is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LaminateConfig {
    pub server: ServerConfig,
    pub engine: OrchestratorConfig,
    pub remote: RemoteSection,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8787)),
        }
    }
}

/// The remote transformation service. Absent `base_url` means local only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteSection {
    pub base_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
        }
    }
}

impl RemoteSection {
    pub fn client_config(&self) -> Option<RemoteConfig> {
        self.base_url.as_ref().map(|url| {
            RemoteConfig::new(url.clone()).with_timeout(Duration::from_millis(self.timeout_ms))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Emit JSON log lines instead of human-readable ones.
    pub json: bool,
    /// OTLP gRPC collector; spans are exported only when set.
    pub otlp_endpoint: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl LaminateConfig {
    /// Loads `path`, or [`DEFAULT_CONFIG_FILE`] when present, or defaults;
    /// then applies process environment overrides and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Applies `LAMINATE_*` overrides, reading variables through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_REMOTE_URL) {
            self.remote.base_url = Some(url);
        }
        if let Some(value) = lookup(ENV_BIND) {
            self.server.bind = value.parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::Env {
                    var: ENV_BIND,
                    value: value.clone(),
                    message: e.to_string(),
                }
            })?;
        }
        if let Some(endpoint) = lookup(ENV_OTLP_ENDPOINT) {
            self.telemetry.otlp_endpoint = Some(endpoint);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.remote.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "remote.timeout_ms must be greater than zero".into(),
            ));
        }
        if let Some(url) = &self.remote.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "remote.base_url must be an http(s) URL, got {url:?}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn empty_file_gives_defaults() {
        let config = LaminateConfig::from_toml("").unwrap();
        assert_eq!(config, LaminateConfig::default());
        assert_eq!(config.server.bind.port(), 8787);
        assert_eq!(config.engine.run_cache_capacity, 100);
        assert_eq!(config.remote.timeout_ms, 10_000);
        assert!(config.remote.client_config().is_none());
    }

    #[test]
    fn full_file_is_parsed() {
        let config = LaminateConfig::from_toml(
            r#"
            [server]
            bind = "0.0.0.0:9090"

            [engine]
            run_cache_capacity = 10
            layer_cache_capacity = 5
            history_capacity = 20

            [remote]
            base_url = "http://transform:9000"
            timeout_ms = 2500

            [telemetry]
            json = true
            otlp_endpoint = "http://collector:4317"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind.port(), 9090);
        assert_eq!(config.engine.history_capacity, 20);
        let remote = config.remote.client_config().unwrap();
        assert_eq!(remote.base_url, "http://transform:9000");
        assert_eq!(remote.timeout, Duration::from_millis(2500));
        assert!(config.telemetry.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(LaminateConfig::from_toml("[server]\nport = 1\n").is_err());
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = LaminateConfig::default();
        config
            .apply_overrides(|var| match var {
                ENV_REMOTE_URL => Some("https://remote.example".into()),
                ENV_BIND => Some("127.0.0.1:1234".into()),
                ENV_OTLP_ENDPOINT => Some("http://otel:4317".into()),
                _ => None,
            })
            .unwrap();

        assert_eq!(
            config.remote.base_url.as_deref(),
            Some("https://remote.example")
        );
        assert_eq!(config.server.bind.port(), 1234);
        assert_eq!(
            config.telemetry.otlp_endpoint.as_deref(),
            Some("http://otel:4317")
        );
    }

    #[test]
    fn unparsable_bind_override_names_the_variable() {
        let mut config = LaminateConfig::default();
        let err = config
            .apply_overrides(|var| (var == ENV_BIND).then(|| "nowhere".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_BIND));
    }

    #[rstest]
    #[case("[engine]\nrun_cache_capacity = 0\n", "run_cache_capacity")]
    #[case("[engine]\nhistory_capacity = 0\n", "history_capacity")]
    #[case("[remote]\ntimeout_ms = 0\n", "timeout_ms")]
    #[case("[remote]\nbase_url = \"ftp://x\"\n", "base_url")]
    fn out_of_range_values_are_rejected(#[case] text: &str, #[case] field: &str) {
        let config = LaminateConfig::from_toml(text).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains(field), "{err}");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = LaminateConfig::load(Some(Path::new("/nonexistent/laminate.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
