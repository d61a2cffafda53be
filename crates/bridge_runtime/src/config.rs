//! Bridge Configuration
//!
//! Services carry compiled-in defaults. An optional TOML file, named by the
//! `SERVICE_BRIDGE_CONFIG` environment variable, can override them:
//!
//! ```toml
//! [logging]
//! filter = "bridge_runtime=debug"
//!
//! [services.color]
//! interval_ms = 250
//! thread_name = "color-producer"
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{BridgeError, BridgeResult};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "SERVICE_BRIDGE_CONFIG";

/// Production interval used when a service does not pick one.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

// ─────────────────────────────────────────────────────────────────────────────
// File format
// ─────────────────────────────────────────────────────────────────────────────

/// Contents of the configuration file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Per-service overrides keyed by service name
    #[serde(default)]
    pub services: HashMap<String, ServiceOverrides>,
}

/// `[logging]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: Option<String>,
}

/// `[services.<name>]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceOverrides {
    pub interval_ms: Option<u64>,
    pub thread_name: Option<String>,
}

struct Loaded {
    config: BridgeConfig,
    error: Option<BridgeError>,
}

static GLOBAL: OnceLock<Loaded> = OnceLock::new();

fn load_global() -> &'static Loaded {
    GLOBAL.get_or_init(|| match BridgeConfig::from_env() {
        Ok(config) => Loaded {
            config: config.unwrap_or_default(),
            error: None,
        },
        Err(e) => Loaded {
            config: BridgeConfig::default(),
            error: Some(e),
        },
    })
}

impl BridgeConfig {
    /// Parse a configuration document.
    pub fn from_toml_str(text: &str) -> BridgeResult<Self> {
        toml::from_str(text).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Read and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Load the file named by [`CONFIG_ENV`], if set.
    pub fn from_env() -> BridgeResult<Option<Self>> {
        match env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(path).map(Some),
            None => Ok(None),
        }
    }

    /// Process-wide configuration, loaded once.
    ///
    /// A missing or broken file yields the defaults; the failure is
    /// available from [`load_error`](Self::load_error).
    pub fn global() -> &'static BridgeConfig {
        &load_global().config
    }

    /// Why the process-wide configuration fell back to defaults, if it did.
    pub fn load_error() -> Option<&'static BridgeError> {
        load_global().error.as_ref()
    }

    /// Apply this file's overrides for `config.name`.
    pub fn apply(&self, config: ServiceConfig) -> ServiceConfig {
        match self.services.get(&config.name) {
            Some(overrides) => config.with_overrides(overrides),
            None => config,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Settings of one service instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Service name, used in logs and as the override key
    pub name: String,
    /// Time between two productions
    pub interval: Duration,
    /// Producer thread name (defaults to `<name>-producer`)
    pub thread_name: Option<String>,
}

impl ServiceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interval: DEFAULT_INTERVAL,
            thread_name: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = Some(thread_name.into());
        self
    }

    pub fn with_overrides(mut self, overrides: &ServiceOverrides) -> Self {
        if let Some(ms) = overrides.interval_ms {
            self.interval = Duration::from_millis(ms);
        }
        match &overrides.thread_name {
            Some(thread_name) if thread_name.contains('\0') => {
                tracing::warn!(
                    service = %self.name,
                    "Ignoring thread_name override containing a NUL byte"
                );
            }
            Some(thread_name) => self.thread_name = Some(thread_name.clone()),
            None => {}
        }
        self
    }

    /// Apply the process-wide configuration file to these defaults.
    pub fn resolve(self) -> Self {
        BridgeConfig::global().apply(self)
    }

    pub fn thread_name(&self) -> String {
        self.thread_name
            .clone()
            .unwrap_or_else(|| format!("{}-producer", self.name))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [logging]
        filter = "bridge_runtime=debug"

        [services.color]
        interval_ms = 250
        thread_name = "color-worker"

        [services.word]
        interval_ms = 10
    "#;

    #[test]
    fn test_parse_config() {
        let config = BridgeConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.logging.filter.as_deref(), Some("bridge_runtime=debug"));
        assert_eq!(config.services.len(), 2);
        assert_eq!(
            config.services["color"],
            ServiceOverrides {
                interval_ms: Some(250),
                thread_name: Some("color-worker".to_string()),
            }
        );
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = BridgeConfig::from_toml_str("").unwrap();
        assert!(config.logging.filter.is_none());
        assert!(config.services.is_empty());
    }

    #[test]
    fn test_malformed_config_rejected() {
        assert!(matches!(
            BridgeConfig::from_toml_str("[services.color"),
            Err(BridgeError::Config(_))
        ));
        assert!(matches!(
            BridgeConfig::from_toml_str("[services.color]\ninterval = 5"),
            Err(BridgeError::Config(_))
        ));
    }

    #[test]
    fn test_apply_overrides() {
        let config = BridgeConfig::from_toml_str(SAMPLE).unwrap();

        let color = config.apply(ServiceConfig::new("color"));
        assert_eq!(color.interval, Duration::from_millis(250));
        assert_eq!(color.thread_name(), "color-worker");

        let word = config.apply(ServiceConfig::new("word").with_thread_name("words"));
        assert_eq!(word.interval, Duration::from_millis(10));
        assert_eq!(word.thread_name(), "words");

        let other = config.apply(ServiceConfig::new("other").with_interval(Duration::from_secs(7)));
        assert_eq!(other.interval, Duration::from_secs(7));
        assert_eq!(other.thread_name(), "other-producer");
    }

    #[test]
    fn test_nul_thread_name_override_ignored() {
        let config = BridgeConfig::from_toml_str(
            r#"
            [services.nul]
            interval_ms = 5
            thread_name = "a\u0000b"
            "#,
        )
        .unwrap();

        let nul = config.apply(ServiceConfig::new("nul"));
        assert_eq!(nul.interval, Duration::from_millis(5));
        assert_eq!(nul.thread_name(), "nul-producer");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = BridgeConfig::load(file.path()).unwrap();
        assert!(config.services.contains_key("word"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = BridgeConfig::load(dir.path().join("missing.toml"));
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_service_config_defaults() {
        let config = ServiceConfig::new("svc");
        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert_eq!(config.thread_name(), "svc-producer");
    }
}
