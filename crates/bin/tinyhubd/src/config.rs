//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `tinyhub.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use serde::Deserialize;
use tinyhub_adapter_mqtt::MqttConfig;
use tinyhub_domain::error::ValidationError;
use tinyhub_domain::rule::{RuleTable, RulesConfig};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// MQTT broker settings.
    pub mqtt: MqttConfig,
    /// Window state persistence.
    pub state: StateConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Device rules and presets.
    pub rules: RulesConfig,
}

/// Window state file configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Path of the file holding the window bitmask.
    pub path: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `tinyhub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("tinyhub.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TINYHUB_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Ok(val) = std::env::var("TINYHUB_MQTT_PORT")
            && let Ok(port) = val.parse()
        {
            self.mqtt.broker_port = port;
        }
        if let Ok(val) = std::env::var("TINYHUB_STATE_PATH") {
            self.state.path = val;
        }
        if let Ok(val) = std::env::var("TINYHUB_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.broker_port == 0 {
            return Err(ConfigError::Validation(
                "mqtt broker port must be non-zero".to_string(),
            ));
        }
        if self.state.path.is_empty() {
            return Err(ConfigError::Validation(
                "state path must not be empty".to_string(),
            ));
        }
        self.rule_table()?;
        Ok(())
    }

    /// Build the immutable rule table from the `[rules]` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Rules`] if the rules are inconsistent.
    pub fn rule_table(&self) -> Result<RuleTable, ConfigError> {
        Ok(RuleTable::build(self.rules.clone())?)
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: "window_state".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "tinyhubd=info,tinyhub_app=info,tinyhub_adapter_mqtt=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
    /// The rule table cannot be built.
    #[error("invalid rules")]
    Rules(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.mqtt.broker_host, "::1");
        assert_eq!(config.mqtt.broker_port, 1883);
        assert_eq!(config.state.path, "window_state");
        assert_eq!(config.rules.namespace.as_str(), "zigbee2mqtt");
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.mqtt.broker_port, 1883);
        assert_eq!(config.rules, RulesConfig::default());
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [mqtt]
            broker_host = 'broker.lan'
            broker_port = 1884

            [state]
            path = '/var/lib/tinyhub/windows'

            [logging]
            filter = 'debug'

            [rules]
            namespace = 'z2m'
            filters = ['Air filter']

            [rules.presets]
            double_press_brightness = 40

            [[rules.devices]]
            kind = 'switch'
            source = 'Desk switch'
            targets = ['Desk lamp']

            [[rules.devices]]
            kind = 'contact'
            source = 'Office window'
            bit = 7
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.mqtt.broker_host, "broker.lan");
        assert_eq!(config.mqtt.broker_port, 1884);
        assert_eq!(config.state.path, "/var/lib/tinyhub/windows");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.rules.namespace.as_str(), "z2m");
        assert_eq!(config.rules.presets.double_press_brightness, 40);
        assert_eq!(config.rules.devices.len(), 2);

        let table = config.rule_table().unwrap();
        assert_eq!(
            table.subscriptions(),
            vec!["z2m/Desk switch".to_string(), "z2m/Office window".to_string()]
        );
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.mqtt.broker_port, 1883);
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.mqtt.broker_port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_empty_state_path() {
        let mut config = Config::default();
        config.state.path = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_accept_default_configuration() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_reject_inconsistent_rules() {
        let toml = "
            [rules]
            filters = ['Air filter']

            [[rules.devices]]
            kind = 'contact'
            source = 'Left window'
            bit = 1

            [[rules.devices]]
            kind = 'contact'
            source = 'Right window'
            bit = 1
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Rules(ValidationError::DuplicateBit(1)))
        ));
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
